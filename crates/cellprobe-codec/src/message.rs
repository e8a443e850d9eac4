use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::model::{LteRadio, NrRadio, RadioAccess, TelemetrySnapshot};

/// `message` field of the liveness probe.
pub const PROBE_MESSAGE: &str = "connection_test";

#[derive(Serialize)]
struct ProbeRecord<'a> {
    test: bool,
    message: &'a str,
    time: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRecord<'a> {
    time: u64,
    operator: Option<&'a str>,
    network_type: Option<&'a str>,
    cells_count: usize,
    device: &'a str,
    cells: Vec<CellRecord<'a>>,
}

#[derive(Serialize)]
struct CellRecord<'a> {
    tech: &'static str,
    #[serde(rename = "isMain")]
    is_main: bool,
    signal: i32,
    asu: i32,
    level: u8,
    #[serde(flatten)]
    radio: Option<RadioFields<'a>>,
    mcc: Option<&'a str>,
    mnc: Option<&'a str>,
    ci: Option<u64>,
    pci: Option<u16>,
    tac: Option<u32>,
}

/// Exactly one technology's metric set, spliced into the cell record.
#[derive(Serialize)]
#[serde(untagged)]
enum RadioFields<'a> {
    Lte(&'a LteRadio),
    Nr(&'a NrRadio),
}

/// Encode the liveness probe sent once per connect.
///
/// `{"test":true,"message":"connection_test","time":<time_ms>}`
pub fn encode_test_probe(time_ms: u64) -> Result<Vec<u8>> {
    let record = ProbeRecord {
        test: true,
        message: PROBE_MESSAGE,
        time: time_ms,
    };
    Ok(serde_json::to_vec(&record)?)
}

/// Encode one telemetry snapshot.
///
/// Each cell carries only the metric set of its own technology. Absent
/// values are written as `null`. Labels are sent as given, except that an
/// empty operator or network type is written as `null`.
pub fn encode_snapshot(snapshot: &TelemetrySnapshot, device: &str) -> Result<Vec<u8>> {
    let network = snapshot.network();
    let cells = snapshot
        .cells()
        .iter()
        .map(|cell| {
            let identity = cell.identity();
            let level = cell.level();
            CellRecord {
                tech: cell.technology().as_str(),
                is_main: cell.is_registered(),
                signal: level.dbm,
                asu: level.asu,
                level: level.bars.get(),
                radio: match cell.radio() {
                    RadioAccess::Lte(lte) => Some(RadioFields::Lte(lte)),
                    RadioAccess::Nr(nr) => Some(RadioFields::Nr(nr)),
                    RadioAccess::Unknown => None,
                },
                mcc: identity.mcc.as_deref(),
                mnc: identity.mnc.as_deref(),
                ci: identity.cell_id,
                pci: identity.pci,
                tac: identity.tac,
            }
        })
        .collect::<Vec<_>>();

    let record = SnapshotRecord {
        time: snapshot.timestamp(),
        operator: non_empty(&network.operator_name),
        network_type: non_empty(&network.network_type),
        cells_count: cells.len(),
        device,
        cells,
    };
    Ok(serde_json::to_vec(&record)?)
}

fn non_empty(label: &str) -> Option<&str> {
    (!label.is_empty()).then_some(label)
}

/// Structural view of an encoded snapshot, as a collector sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub time: u64,
    pub operator: Option<String>,
    pub network_type: Option<String>,
    pub cells_count: usize,
    pub device: String,
    #[serde(default)]
    pub cells: Vec<CellSummary>,
}

/// Per-cell fields every record carries regardless of technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSummary {
    pub tech: String,
    #[serde(rename = "isMain")]
    pub is_main: bool,
    pub signal: i32,
}

/// Decode the structural fields of an encoded snapshot.
pub fn decode_snapshot(payload: &[u8]) -> Result<SnapshotSummary> {
    Ok(serde_json::from_slice(payload)?)
}

/// A collector's reply. Its content is opaque; only presence matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement(String);

impl Acknowledgement {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Acknowledgement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accept any non-empty UTF-8 reply as an acknowledgement, kept verbatim.
pub fn decode_ack(payload: &[u8]) -> Result<Acknowledgement> {
    let text = std::str::from_utf8(payload).map_err(|_| CodecError::InvalidUtf8)?;
    if text.is_empty() {
        return Err(CodecError::EmptyAck);
    }
    Ok(Acknowledgement(text.to_string()))
}
