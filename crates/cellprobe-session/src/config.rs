use std::time::Duration;

use cellprobe_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};

/// Collector address used when none is configured.
pub const DEFAULT_ADDR: &str = "127.0.0.1:5555";

/// Default bound on every blocking send, receive and connect.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Settings for one [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Collector address, `host:port`.
    pub addr: String,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub recv_timeout: Duration,
    /// Largest payload accepted in either direction.
    pub max_payload_size: usize,
}

impl SessionConfig {
    /// Default settings against `addr`.
    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    /// Use `timeout` for connect, send and receive alike.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.send_timeout = timeout;
        self.recv_timeout = timeout;
        self
    }

    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            read_timeout: Some(self.recv_timeout),
            write_timeout: Some(self.send_timeout),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            connect_timeout: DEFAULT_TIMEOUT,
            send_timeout: DEFAULT_TIMEOUT,
            recv_timeout: DEFAULT_TIMEOUT,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
