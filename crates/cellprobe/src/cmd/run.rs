use std::sync::Arc;

use cellprobe_agent::{
    AgentConfig, FileSource, ScheduleConfig, Scheduler, StaticSource, TelemetryAgent,
    TelemetrySource, TelemetryStatus,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd::RunArgs;
use crate::exit::{io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_status, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = AgentConfig {
        session: args.connect.session_config()?,
        schedule: args.schedule_config()?,
        device: args.device.clone(),
    };

    let source: Arc<dyn TelemetrySource> = match &args.fixture {
        Some(path) => Arc::new(FileSource::new(path)),
        None => {
            warn!("no fixture given, radio is unavailable and nothing will be sent");
            Arc::new(StaticSource::unavailable())
        }
    };
    let agent = Arc::new(TelemetryAgent::from_config(&config, source));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    let token = CancellationToken::new();
    install_ctrlc_handler(token.clone())?;

    let status = runtime.block_on(drive(agent, config.schedule, token, args.cycles, format));
    print_status(&status, format);
    Ok(SUCCESS)
}

/// Print every finished cycle until cancelled or `limit` cycles have run,
/// then shut the scheduler down and return the final status.
async fn drive(
    agent: Arc<TelemetryAgent>,
    schedule: ScheduleConfig,
    token: CancellationToken,
    limit: Option<u64>,
    format: OutputFormat,
) -> TelemetryStatus {
    let scheduler = Scheduler::spawn(agent, schedule);
    let state = scheduler.state().clone();
    let mut updates = state.subscribe();
    let mut seen_cycles = 0u64;

    info!(device = %scheduler.agent().device(), "agent running");

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = updates.borrow_and_update().clone();
                if status.cycles == seen_cycles {
                    continue;
                }
                seen_cycles = status.cycles;
                print_status(&status, format);

                if limit.is_some_and(|limit| seen_cycles >= limit) {
                    break;
                }
            }
        }
    }

    scheduler.shutdown().await;
    state.snapshot()
}

fn install_ctrlc_handler(token: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || token.cancel())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
