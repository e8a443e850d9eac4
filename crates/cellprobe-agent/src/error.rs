use cellprobe_codec::CodecError;
use cellprobe_session::{ConnectError, ExchangeError};

/// Failure reported by a [`TelemetrySource`](crate::TelemetrySource).
///
/// Opaque on purpose: the agent only records it and backs off.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct DataSourceError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl DataSourceError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self(err.into())
    }
}

/// Why a telemetry cycle did not deliver a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// Another cycle holds the session.
    #[error("busy")]
    Busy,

    #[error("no connection")]
    NotConnected,

    #[error("no data")]
    NoData,

    #[error("telemetry source failed: {0}")]
    Source(#[from] DataSourceError),

    #[error("connect failed: {0}")]
    Connect(#[from] ConnectError),

    #[error("exchange failed: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("encode failed: {0}")]
    Encode(#[from] CodecError),

    #[error("invalid acknowledgement: {0}")]
    Ack(CodecError),

    /// The cycle panicked before it finished.
    #[error("telemetry cycle panicked")]
    Panicked,
}

impl CycleError {
    /// Errors the agent does not expect during normal operation.
    ///
    /// These, and only these, make the scheduler back off. Busy, missing
    /// data and network failures are ordinary outcomes.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, CycleError::Source(_) | CycleError::Panicked)
    }
}
