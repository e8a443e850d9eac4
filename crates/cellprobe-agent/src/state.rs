use std::sync::Arc;

use cellprobe_session::SessionState;
use serde::Serialize;
use tokio::sync::watch;

/// Connection status as observers see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Failed => "failed",
        }
    }
}

impl From<&SessionState> for ConnectionStatus {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Disconnected => ConnectionStatus::Disconnected,
            SessionState::Connecting => ConnectionStatus::Connecting,
            SessionState::Connected => ConnectionStatus::Connected,
            SessionState::Failed(_) => ConnectionStatus::Failed,
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an observer can know about the agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TelemetryStatus {
    pub connection: ConnectionStatus,
    /// A cycle or connect attempt is running.
    pub busy: bool,
    pub last_error: Option<String>,
    /// Cells seen by the most recent cycle that reached the source.
    pub last_cell_count: usize,
    /// `"<operator> - <network type>"` from the most recent sample.
    pub network_label: String,
    /// Cycles that ran to an outcome, successful or not.
    pub cycles: u64,
    /// Snapshots acknowledged by the collector.
    pub exchanges: u64,
    pub last_ack: Option<String>,
}

impl TelemetryStatus {
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}

/// Status shared between the agent and its observers.
///
/// Only the agent writes, and each cycle writes at most twice: once when it
/// starts and once, with every field, when it ends. Readers never block it.
#[derive(Clone)]
pub struct SharedState {
    tx: Arc<watch::Sender<TelemetryStatus>>,
}

impl SharedState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TelemetryStatus::default());
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current status.
    pub fn snapshot(&self) -> TelemetryStatus {
        self.tx.borrow().clone()
    }

    /// Receiver that is notified on every update.
    pub fn subscribe(&self) -> watch::Receiver<TelemetryStatus> {
        self.tx.subscribe()
    }

    pub(crate) fn update<F>(&self, modify: F)
    where
        F: FnOnce(&mut TelemetryStatus),
    {
        self.tx.send_modify(modify);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedState").field(&*self.tx.borrow()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_status_mirrors_session() {
        assert_eq!(
            ConnectionStatus::from(&SessionState::Connected),
            ConnectionStatus::Connected
        );
        assert_eq!(
            ConnectionStatus::from(&SessionState::Failed("timeout".into())),
            ConnectionStatus::Failed
        );
        assert!(!ConnectionStatus::Failed.is_connected());
    }

    #[test]
    fn update_is_visible_to_snapshot_and_subscribers() {
        let state = SharedState::new();
        let mut rx = state.subscribe();

        state.update(|status| {
            status.busy = true;
            status.last_cell_count = 3;
        });

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen, state.snapshot());
        assert!(seen.busy);
        assert_eq!(seen.last_cell_count, 3);
    }

    #[test]
    fn update_without_subscribers_still_applies() {
        let state = SharedState::default();
        state.update(|status| status.exchanges = 7);
        assert_eq!(state.snapshot().exchanges, 7);
    }

    #[test]
    fn status_serializes_for_output() {
        let status = TelemetryStatus {
            connection: ConnectionStatus::Connected,
            ..TelemetryStatus::default()
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["connection"], "connected");
        assert_eq!(value["last_error"], serde_json::Value::Null);
    }
}
