//! The telemetry agent: what runs on the device.
//!
//! A [`TelemetryAgent`] owns one [`Session`](cellprobe_session::Session) and
//! one [`TelemetrySource`]. Each cycle it samples the source, encodes a
//! snapshot, exchanges it with the collector and records the result in a
//! [`SharedState`] that any number of observers can watch.
//!
//! The [`Scheduler`] drives cycles on a fixed cadence from a tokio task and
//! accepts manual `refresh` / `send_now` commands. At most one cycle runs at
//! a time; a command that finds a cycle running gets [`CycleError::Busy`].

pub mod agent;
pub mod error;
pub mod scheduler;
pub mod source;
pub mod state;

pub use agent::{AgentConfig, CycleOutcome, TelemetryAgent, Trigger, DEFAULT_DEVICE};
pub use error::{CycleError, DataSourceError};
pub use scheduler::{Cadence, ScheduleConfig, Scheduler};
pub use source::{FileSource, StaticSource, TelemetrySource};
pub use state::{ConnectionStatus, SharedState, TelemetryStatus};
