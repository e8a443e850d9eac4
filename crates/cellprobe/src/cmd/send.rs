use std::sync::Arc;

use cellprobe_agent::{CycleOutcome, FileSource, TelemetryAgent, Trigger};
use cellprobe_session::Session;
use comfy_table::Cell;
use serde::Serialize;

use crate::cmd::SendArgs;
use crate::exit::{cycle_error, CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct SendOutput<'a> {
    addr: &'a str,
    device: &'a str,
    cells: usize,
    ack: &'a str,
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let session = args.connect.session_config()?;
    let addr = session.addr.clone();
    let agent = TelemetryAgent::new(
        Session::new(session),
        Arc::new(FileSource::new(&args.fixture)),
        args.device.clone(),
    );

    let result = agent
        .connect()
        .and_then(|()| agent.run_cycle(Trigger::SendNow));
    agent.disconnect();

    let (cells, ack) = match result.map_err(|err| cycle_error("send failed", err))? {
        CycleOutcome::Sent { cells, ack } => (cells, ack),
        // SendNow reports an empty source as an error.
        CycleOutcome::Empty => (0, String::new()),
    };

    let output = SendOutput {
        addr: &addr,
        device: agent.device(),
        cells,
        ack: &ack,
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ADDR", "DEVICE", "CELLS", "ACK"]);
            table.add_row(vec![
                Cell::new(output.addr),
                Cell::new(output.device),
                Cell::new(output.cells),
                Cell::new(output.ack),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("sent {} cells to {}: {}", output.cells, output.addr, output.ack);
        }
    }

    Ok(SUCCESS)
}
