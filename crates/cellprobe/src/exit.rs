use std::fmt;
use std::io;

use cellprobe_agent::CycleError;
use cellprobe_frame::FrameError;
use cellprobe_session::{CollectorError, ConnectError, ExchangeError};
use cellprobe_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::InvalidMagic => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn connect_error(context: &str, err: ConnectError) -> CliError {
    match err {
        ConnectError::Transport(err) => transport_error(context, err),
        ConnectError::Frame(err) => frame_error(context, err),
        ConnectError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ConnectError::Refused { .. } | ConnectError::NoProbeReply(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        ConnectError::Codec(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn exchange_error(context: &str, err: ExchangeError) -> CliError {
    match err {
        ExchangeError::Frame(err) => frame_error(context, err),
        ExchangeError::SendTimeout(_) | ExchangeError::ReceiveTimeout(_) => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        ExchangeError::Busy => CliError::new(FAILURE, format!("{context}: {err}")),
        ExchangeError::NotConnected
        | ExchangeError::TransportClosed(_)
        | ExchangeError::UnexpectedChannel { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn cycle_error(context: &str, err: CycleError) -> CliError {
    match err {
        CycleError::Connect(err) => connect_error(context, err),
        CycleError::Exchange(err) => exchange_error(context, err),
        CycleError::Busy => CliError::new(FAILURE, format!("{context}: {err}")),
        CycleError::NotConnected => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        CycleError::NoData | CycleError::Source(_) | CycleError::Ack(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        CycleError::Encode(_) | CycleError::Panicked => {
            CliError::new(INTERNAL, format!("{context}: {err}"))
        }
    }
}

pub fn collector_error(context: &str, err: CollectorError) -> CliError {
    match err {
        CollectorError::Transport(err) => transport_error(context, err),
        CollectorError::Frame(err) => frame_error(context, err),
    }
}
