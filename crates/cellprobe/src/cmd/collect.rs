use cellprobe_codec::decode_snapshot;
use cellprobe_frame::TELEMETRY;
use cellprobe_session::CollectorListener;
use tracing::{debug, info, warn};

use crate::cmd::CollectArgs;
use crate::exit::{collector_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_snapshot, OutputFormat};

pub fn run(args: CollectArgs, format: OutputFormat) -> CliResult<i32> {
    let listener =
        CollectorListener::bind(&args.bind).map_err(|err| collector_error("bind failed", err))?;
    install_ctrlc_handler()?;
    info!(addr = %listener.local_addr(), "collector listening");

    let mut received = 0usize;

    loop {
        let mut peer = listener
            .accept()
            .map_err(|err| collector_error("accept failed", err))?;
        info!(peer = %peer.id(), addr = %peer.peer_addr(), "agent connected");

        loop {
            let request = match peer.recv() {
                Ok(frame) => frame,
                Err(err) if err.is_closed() => {
                    info!(peer = %peer.id(), "agent disconnected");
                    break;
                }
                Err(err) => {
                    warn!(peer = %peer.id(), error = %err, "receive failed, dropping agent");
                    break;
                }
            };

            if let Err(err) = peer.reply(&request, args.reply.as_bytes()) {
                warn!(peer = %peer.id(), error = %err, "reply failed, dropping agent");
                break;
            }

            if request.channel != TELEMETRY {
                debug!(peer = %peer.id(), channel = request.channel, "control request answered");
                continue;
            }

            match decode_snapshot(&request.payload) {
                Ok(snapshot) => print_snapshot(&snapshot, peer.id(), format),
                Err(err) => {
                    warn!(peer = %peer.id(), error = %err, "undecodable snapshot");
                    continue;
                }
            }

            received = received.saturating_add(1);
            if args.count.is_some_and(|count| received >= count) {
                if let Err(err) = peer.close() {
                    debug!(error = %err, "close after last snapshot failed");
                }
                return Ok(SUCCESS);
            }
        }
    }
}

/// `accept` blocks, so Ctrl-C leaves from the handler itself.
fn install_ctrlc_handler() -> CliResult<()> {
    ctrlc::set_handler(|| std::process::exit(SUCCESS))
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
