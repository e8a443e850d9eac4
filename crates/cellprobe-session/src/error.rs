use std::time::Duration;

use cellprobe_codec::CodecError;
use cellprobe_frame::FrameError;
use cellprobe_transport::TransportError;

/// Why a [`Session::connect`](crate::Session::connect) failed.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Nothing is listening at the collector address.
    #[error("connection to {addr} refused: {source}")]
    Refused {
        addr: String,
        source: std::io::Error,
    },

    /// Connecting, sending the probe, or waiting for its reply took too long.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// The collector did not answer the probe with a usable reply.
    #[error("no probe reply: {0}")]
    NoProbeReply(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ConnectError {
    /// Classify a failed TCP connect.
    pub(crate) fn from_transport(err: TransportError, timeout: Duration) -> Self {
        match err {
            TransportError::Connect { addr, source }
                if source.kind() == std::io::ErrorKind::ConnectionRefused =>
            {
                ConnectError::Refused { addr, source }
            }
            TransportError::Connect { source, .. }
                if matches!(
                    source.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                ) =>
            {
                ConnectError::Timeout(timeout)
            }
            other => ConnectError::Transport(other),
        }
    }
}

/// Why a [`Session::exchange`](crate::Session::exchange) failed.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The session has no live connection. Nothing was sent.
    #[error("not connected")]
    NotConnected,

    /// Another caller holds the session. A lone `Session` never returns
    /// this, since `exchange` borrows it mutably; it is for wrappers that
    /// share one behind a lock.
    #[error("a request is already in flight")]
    Busy,

    #[error("send timed out after {0:?}")]
    SendTimeout(Duration),

    #[error("no reply within {0:?}")]
    ReceiveTimeout(Duration),

    /// The collector closed the connection.
    #[error("transport closed: {0}")]
    TransportClosed(String),

    /// The reply came back on a channel other than the request's.
    #[error("reply on channel {got}, expected {expected}")]
    UnexpectedChannel { expected: u16, got: u16 },

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

impl ExchangeError {
    /// True when the connection was torn down because of this error.
    pub fn drops_connection(&self) -> bool {
        !matches!(self, ExchangeError::NotConnected | ExchangeError::Busy)
    }
}

/// Errors on the collector side of the channel.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

impl CollectorError {
    /// True when the agent on the other end hung up.
    pub fn is_closed(&self) -> bool {
        matches!(self, CollectorError::Frame(FrameError::ConnectionClosed))
    }
}
