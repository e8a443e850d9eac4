use std::io::IsTerminal;

use cellprobe_agent::TelemetryStatus;
use cellprobe_codec::SnapshotSummary;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One JSON document per line.
pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_status(status: &TelemetryStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(status),
        OutputFormat::Table => {
            let mut table = new_table(vec![
                "CONNECTION",
                "NETWORK",
                "CELLS",
                "CYCLES",
                "SENT",
                "LAST ERROR",
            ]);
            table.add_row(vec![
                status.connection.to_string(),
                status.network_label.clone(),
                status.last_cell_count.to_string(),
                status.cycles.to_string(),
                status.exchanges.to_string(),
                status.last_error.clone().unwrap_or_else(|| "-".to_string()),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "connection={} network=\"{}\" cells={} cycles={} sent={} error={}",
                status.connection,
                status.network_label,
                status.last_cell_count,
                status.cycles,
                status.exchanges,
                status.last_error.as_deref().unwrap_or("none")
            );
        }
    }
}

#[derive(Serialize)]
struct SnapshotOutput<'a> {
    peer_id: &'a str,
    #[serde(flatten)]
    snapshot: &'a SnapshotSummary,
}

pub fn print_snapshot(snapshot: &SnapshotSummary, peer_id: &str, format: OutputFormat) {
    let operator = snapshot.operator.as_deref().unwrap_or("-");
    let network_type = snapshot.network_type.as_deref().unwrap_or("-");
    match format {
        OutputFormat::Json => print_json(&SnapshotOutput { peer_id, snapshot }),
        OutputFormat::Table => {
            let mut table = new_table(vec![
                "PEER", "DEVICE", "OPERATOR", "TYPE", "TECH", "MAIN", "DBM",
            ]);
            for cell in &snapshot.cells {
                table.add_row(vec![
                    peer_id.to_string(),
                    snapshot.device.clone(),
                    operator.to_string(),
                    network_type.to_string(),
                    cell.tech.clone(),
                    cell.is_main.to_string(),
                    cell.signal.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "peer={} device={} operator={} type={} cells={} time={}",
                peer_id,
                snapshot.device,
                operator,
                network_type,
                snapshot.cells_count,
                snapshot.time
            );
        }
    }
}
