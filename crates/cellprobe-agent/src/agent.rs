use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use cellprobe_codec::{decode_ack, encode_snapshot, TelemetrySnapshot};
use cellprobe_session::{Session, SessionConfig};
use tracing::{debug, info, warn};

use crate::error::CycleError;
use crate::scheduler::ScheduleConfig;
use crate::source::TelemetrySource;
use crate::state::{ConnectionStatus, SharedState, TelemetryStatus};

/// Device tag sent with every snapshot unless configured otherwise.
pub const DEFAULT_DEVICE: &str = "Android";

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The scheduler's periodic tick.
    Scheduled,
    /// Manual resample; reconnects if needed, like a scheduled cycle.
    Refresh,
    /// Manual send; fails fast instead of reconnecting or sending nothing.
    SendNow,
}

/// A cycle that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The collector acknowledged a snapshot of `cells` cells.
    Sent { cells: usize, ack: String },
    /// The source had no cells, so nothing was sent.
    Empty,
}

/// Everything needed to build an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub session: SessionConfig,
    pub schedule: ScheduleConfig,
    pub device: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            schedule: ScheduleConfig::default(),
            device: DEFAULT_DEVICE.to_string(),
        }
    }
}

/// Runs telemetry cycles against one session.
///
/// The session mutex is the busy guard: whoever holds it runs the cycle,
/// anyone else gets [`CycleError::Busy`] immediately.
pub struct TelemetryAgent {
    session: Mutex<Session>,
    source: Arc<dyn TelemetrySource>,
    device: String,
    state: SharedState,
}

/// What a cycle learned from the source before it stopped.
#[derive(Default)]
struct Sample {
    network_label: Option<String>,
    cells: Option<usize>,
}

/// Marks the shared status busy for as long as it lives.
///
/// Dropped without [`CycleGuard::finish`] only when the cycle unwinds; the
/// busy flag is still released.
struct CycleGuard<'a> {
    state: &'a SharedState,
    finished: bool,
}

impl<'a> CycleGuard<'a> {
    fn begin(state: &'a SharedState) -> Self {
        state.update(|status| status.busy = true);
        Self {
            state,
            finished: false,
        }
    }

    fn finish<F>(mut self, commit: F)
    where
        F: FnOnce(&mut TelemetryStatus),
    {
        self.finished = true;
        self.state.update(|status| {
            commit(status);
            status.busy = false;
        });
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.update(|status| {
                status.busy = false;
                status.last_error = Some(CycleError::Panicked.to_string());
            });
        }
    }
}

impl TelemetryAgent {
    pub fn new(
        session: Session,
        source: Arc<dyn TelemetrySource>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            session: Mutex::new(session),
            source,
            device: device.into(),
            state: SharedState::new(),
        }
    }

    pub fn from_config(config: &AgentConfig, source: Arc<dyn TelemetrySource>) -> Self {
        Self::new(
            Session::new(config.session.clone()),
            source,
            config.device.clone(),
        )
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Startup connection attempt.
    ///
    /// A failure is recorded in the shared status and returned; nothing is
    /// retried here. The next scheduled cycle reconnects.
    pub fn connect(&self) -> Result<(), CycleError> {
        let mut session = self.lock_session()?;
        let guard = CycleGuard::begin(&self.state);

        let result = session.connect().map_err(CycleError::from);
        let connection = ConnectionStatus::from(session.state());

        guard.finish(|status| {
            status.connection = connection;
            status.last_error = result.as_ref().err().map(ToString::to_string);
        });
        result
    }

    /// Run one cycle: sample, encode, exchange, record.
    pub fn run_cycle(&self, trigger: Trigger) -> Result<CycleOutcome, CycleError> {
        let mut session = self.lock_session()?;
        let guard = CycleGuard::begin(&self.state);

        let mut sample = Sample::default();
        let result = self.cycle(&mut session, trigger, &mut sample);
        let connection = ConnectionStatus::from(session.state());

        guard.finish(|status| {
            status.connection = connection;
            status.cycles = status.cycles.saturating_add(1);
            if let Some(label) = sample.network_label {
                status.network_label = label;
            }
            if let Some(cells) = sample.cells {
                status.last_cell_count = cells;
            }
            match &result {
                Ok(CycleOutcome::Sent { ack, .. }) => {
                    status.last_error = None;
                    status.exchanges = status.exchanges.saturating_add(1);
                    status.last_ack = Some(ack.clone());
                }
                Ok(CycleOutcome::Empty) => status.last_error = None,
                Err(err) => status.last_error = Some(err.to_string()),
            }
        });

        match &result {
            Ok(CycleOutcome::Sent { cells, .. }) => {
                info!(?trigger, cells, "snapshot acknowledged")
            }
            Ok(CycleOutcome::Empty) => debug!(?trigger, "no cells, nothing sent"),
            Err(CycleError::Busy) => {}
            Err(err) => warn!(?trigger, error = %err, "telemetry cycle failed"),
        }
        result
    }

    fn cycle(
        &self,
        session: &mut Session,
        trigger: Trigger,
        sample: &mut Sample,
    ) -> Result<CycleOutcome, CycleError> {
        if trigger == Trigger::SendNow && !session.is_connected() {
            return Err(CycleError::NotConnected);
        }

        let network = self.source.network_state()?;
        sample.network_label = Some(network.label());
        let cells = self.source.cell_measurements()?;
        sample.cells = Some(cells.len());

        if cells.is_empty() {
            return match trigger {
                Trigger::SendNow => Err(CycleError::NoData),
                Trigger::Scheduled | Trigger::Refresh => Ok(CycleOutcome::Empty),
            };
        }

        if !session.is_connected() {
            debug!(?trigger, "session not connected, reconnecting");
            session.connect()?;
        }

        let snapshot = TelemetrySnapshot::new(network, cells);
        let request = encode_snapshot(&snapshot, &self.device)?;
        let reply = session.exchange(&request)?;
        let ack = decode_ack(&reply).map_err(CycleError::Ack)?;

        Ok(CycleOutcome::Sent {
            cells: snapshot.cells().len(),
            ack: ack.as_str().to_string(),
        })
    }

    /// Close the session, waiting for a running cycle to finish first.
    pub fn disconnect(&self) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        session.disconnect();
        let connection = ConnectionStatus::from(session.state());
        self.state.update(|status| status.connection = connection);
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, Session>, CycleError> {
        match self.session.try_lock() {
            Ok(session) => Ok(session),
            Err(TryLockError::WouldBlock) => Err(CycleError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => {
                warn!("previous cycle panicked, recovering session");
                self.session.clear_poison();
                Ok(poisoned.into_inner())
            }
        }
    }
}

impl std::fmt::Debug for TelemetryAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryAgent")
            .field("device", &self.device)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
