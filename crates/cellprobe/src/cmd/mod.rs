use std::path::PathBuf;
use std::time::Duration;

use cellprobe_agent::{ScheduleConfig, DEFAULT_DEVICE};
use cellprobe_session::{SessionConfig, DEFAULT_ADDR};
use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod collect;
pub mod probe;
pub mod run;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the agent: connect, then send a snapshot every interval.
    Run(RunArgs),
    /// Connect and send a single snapshot.
    Send(SendArgs),
    /// Connect to a collector and report the probe round trip.
    Probe(ProbeArgs),
    /// Run a reference collector that acknowledges every snapshot.
    Collect(CollectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Probe(args) => probe::run(args, format),
        Command::Collect(args) => collect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Collector address (host:port).
    #[arg(long, env = "CELLPROBE_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,
    /// Connect, send and receive timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

impl ConnectArgs {
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let timeout = parse_duration(&self.timeout)?;
        Ok(SessionConfig::with_addr(self.addr.clone()).with_timeout(timeout))
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// JSON fixture to read telemetry from. Without one the agent has no
    /// radio access and sends nothing.
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,
    /// Device tag sent with every snapshot.
    #[arg(long, env = "CELLPROBE_DEVICE", default_value = DEFAULT_DEVICE)]
    pub device: String,
    /// Delay between cycles.
    #[arg(long, default_value = "10s")]
    pub interval: String,
    /// Delay before the first cycle.
    #[arg(long, default_value = "3s")]
    pub initial_delay: String,
    /// Delay after a cycle that failed unexpectedly.
    #[arg(long, default_value = "5s")]
    pub backoff: String,
    /// Stop after N cycles.
    #[arg(long)]
    pub cycles: Option<u64>,
}

impl RunArgs {
    pub fn schedule_config(&self) -> CliResult<ScheduleConfig> {
        Ok(ScheduleConfig {
            initial_delay: parse_duration(&self.initial_delay)?,
            interval: parse_duration(&self.interval)?,
            backoff_interval: parse_duration(&self.backoff)?,
        })
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// JSON fixture to read telemetry from.
    #[arg(long, value_name = "FILE")]
    pub fixture: PathBuf,
    /// Device tag sent with the snapshot.
    #[arg(long, env = "CELLPROBE_DEVICE", default_value = DEFAULT_DEVICE)]
    pub device: String,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Address to listen on (host:port).
    #[arg(default_value = DEFAULT_ADDR)]
    pub bind: String,
    /// Exit after N snapshots.
    #[arg(long)]
    pub count: Option<usize>,
    /// Reply sent for every snapshot.
    #[arg(long, default_value = "ack")]
    pub reply: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
