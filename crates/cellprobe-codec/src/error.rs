/// Errors produced while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The acknowledgement was not valid UTF-8.
    #[error("acknowledgement is not valid utf-8")]
    InvalidUtf8,

    /// The acknowledgement had no bytes at all.
    #[error("empty acknowledgement")]
    EmptyAck,

    /// A signal bar count outside 0..=4.
    #[error("signal bars out of range: {0} (max {max})", max = crate::model::SignalBars::MAX)]
    BarsOutOfRange(u8),
}

pub type Result<T> = std::result::Result<T, CodecError>;
