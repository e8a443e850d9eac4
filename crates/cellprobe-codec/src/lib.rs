//! Cellular telemetry model and the JSON wire codec.
//!
//! The model is what a telemetry source hands to the agent; the codec turns
//! it into the messages a collector expects:
//! - [`encode_test_probe`]: liveness probe sent while connecting
//! - [`encode_snapshot`]: one telemetry snapshot
//! - [`decode_ack`]: the collector's acknowledgement (any non-empty text)
//!
//! Nothing here does I/O.

pub mod error;
pub mod message;
pub mod model;

pub use error::{CodecError, Result};
pub use message::{
    decode_ack, decode_snapshot, encode_snapshot, encode_test_probe, Acknowledgement, CellSummary,
    SnapshotSummary, PROBE_MESSAGE,
};
pub use model::{
    epoch_millis, CellIdentity, CellMeasurement, LteRadio, NetworkState, NrRadio, RadioAccess,
    SignalBars, SignalLevel, Technology, TelemetrySnapshot,
};
