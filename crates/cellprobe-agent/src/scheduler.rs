use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agent::{CycleOutcome, TelemetryAgent, Trigger};
use crate::error::CycleError;
use crate::state::SharedState;

/// Cycle timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Wait between the startup connect and the first cycle.
    pub initial_delay: Duration,
    /// Wait between cycles.
    pub interval: Duration,
    /// Wait after a cycle that failed unexpectedly.
    pub backoff_interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            interval: Duration::from_secs(10),
            backoff_interval: Duration::from_secs(5),
        }
    }
}

/// Decides how long to wait before the next cycle.
#[derive(Debug, Clone)]
pub struct Cadence {
    config: ScheduleConfig,
    consecutive_failures: u32,
}

impl Cadence {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
        }
    }

    pub fn initial_delay(&self) -> Duration {
        self.config.initial_delay
    }

    /// Delay after a cycle that ended with `result`.
    ///
    /// An unexpected error earns one back-off delay; any other outcome
    /// resets the count and keeps the regular interval.
    pub fn next_delay(&mut self, result: &Result<CycleOutcome, CycleError>) -> Duration {
        match result {
            Err(err) if err.is_unexpected() => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.config.backoff_interval
            }
            _ => {
                self.consecutive_failures = 0;
                self.config.interval
            }
        }
    }

    /// Unexpected failures since the last ordinary cycle.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// Handle to the periodic telemetry task.
///
/// Must be created inside a tokio runtime. Cycles run on the blocking pool
/// since session I/O blocks for up to its timeouts.
pub struct Scheduler {
    agent: Arc<TelemetryAgent>,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Connect, then run cycles until [`Scheduler::shutdown`].
    pub fn spawn(agent: Arc<TelemetryAgent>, config: ScheduleConfig) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&agent),
            Cadence::new(config),
            token.clone(),
        ));
        Self {
            agent,
            token,
            handle,
        }
    }

    pub fn agent(&self) -> &Arc<TelemetryAgent> {
        &self.agent
    }

    pub fn state(&self) -> &SharedState {
        self.agent.state()
    }

    /// Resample and send now, reconnecting if needed.
    pub async fn refresh(&self) -> Result<CycleOutcome, CycleError> {
        run_blocking(&self.agent, Trigger::Refresh).await
    }

    /// Send now if connected and there is something to send.
    pub async fn send_now(&self) -> Result<CycleOutcome, CycleError> {
        run_blocking(&self.agent, Trigger::SendNow).await
    }

    /// Stop the loop, wait for a running cycle, then disconnect.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(err) = self.handle.await {
            error!(error = %err, "telemetry loop ended abnormally");
        }

        let agent = Arc::clone(&self.agent);
        if let Err(err) = tokio::task::spawn_blocking(move || agent.disconnect()).await {
            warn!(error = %err, "disconnect on shutdown failed");
        }
        info!("telemetry scheduler shut down");
    }
}

async fn run_blocking(
    agent: &Arc<TelemetryAgent>,
    trigger: Trigger,
) -> Result<CycleOutcome, CycleError> {
    let agent = Arc::clone(agent);
    match tokio::task::spawn_blocking(move || agent.run_cycle(trigger)).await {
        Ok(result) => result,
        Err(err) => {
            error!(?trigger, error = %err, "telemetry cycle panicked");
            Err(CycleError::Panicked)
        }
    }
}

async fn run_loop(agent: Arc<TelemetryAgent>, mut cadence: Cadence, token: CancellationToken) {
    let startup = {
        let agent = Arc::clone(&agent);
        tokio::task::spawn_blocking(move || agent.connect()).await
    };
    match startup {
        Ok(Ok(())) => {}
        Ok(Err(err)) => info!(error = %err, "startup connect failed, next cycle retries"),
        Err(err) => error!(error = %err, "startup connect panicked"),
    }

    let mut delay = cadence.initial_delay();
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let result = run_blocking(&agent, Trigger::Scheduled).await;
        delay = cadence.next_delay(&result);
        if cadence.consecutive_failures() > 0 {
            warn!(
                failures = cadence.consecutive_failures(),
                ?delay,
                "backing off after unexpected error"
            );
        }
    }
    debug!("telemetry loop stopped");
}
