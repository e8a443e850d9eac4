use std::time::Instant;

use cellprobe_session::Session;
use comfy_table::Cell;
use serde::Serialize;

use crate::cmd::ProbeArgs;
use crate::exit::{connect_error, CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct ProbeOutput {
    addr: String,
    peer: Option<String>,
    state: String,
    connected: bool,
    latency_ms: u64,
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.connect.session_config()?;
    let addr = config.addr.clone();
    let mut session = Session::new(config);

    let started = Instant::now();
    session
        .connect()
        .map_err(|err| connect_error("probe failed", err))?;
    let latency = started.elapsed();

    let output = ProbeOutput {
        addr,
        peer: session.peer_addr().map(|peer| peer.to_string()),
        state: session.state().to_string(),
        connected: session.is_connected(),
        latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
    };
    session.disconnect();

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ADDR", "PEER", "STATE", "LATENCY"]);
            table.add_row(vec![
                Cell::new(&output.addr),
                Cell::new(output.peer.as_deref().unwrap_or("-")),
                Cell::new(&output.state),
                Cell::new(format!("{}ms", output.latency_ms)),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} {} in {}ms",
                output.addr, output.state, output.latency_ms
            );
        }
    }

    Ok(SUCCESS)
}
