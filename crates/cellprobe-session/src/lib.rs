//! Telemetry session: one persistent request/reply channel to a collector.
//!
//! A [`Session`] owns the connection. It probes the collector while
//! connecting and then carries exactly one outstanding request at a time.
//! Every blocking call is bounded by the configured send and receive
//! timeouts; a timeout tears the connection down so the next caller sees a
//! clean "not connected" session instead of a half-open one.
//!
//! [`CollectorListener`] is the other end of the channel, used by the
//! `collect` command and by tests.

pub mod collector;
pub mod config;
pub mod error;
pub mod probe;
pub mod session;
pub mod state;

pub use collector::{CollectorListener, CollectorPeer};
pub use config::{SessionConfig, DEFAULT_ADDR, DEFAULT_TIMEOUT};
pub use error::{CollectorError, ConnectError, ExchangeError};
pub use probe::send_probe;
pub use session::Session;
pub use state::SessionState;
