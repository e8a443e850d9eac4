use std::fmt;

/// Lifecycle of a [`Session`](crate::Session).
///
/// `Disconnected` and `Failed` both mean not connected; `Failed` also keeps
/// the reason of the connect or exchange that dropped the link.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last connect or exchange failed; the connection is gone.
    Failed(String),
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }

    /// Failure reason, if the session is in the failed state.
    pub fn failure(&self) -> Option<&str> {
        match self {
            SessionState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => f.write_str("disconnected"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::Connected => f.write_str("connected"),
            SessionState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
