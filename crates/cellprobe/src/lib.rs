//! Device-resident cellular telemetry agent.
//!
//! cellprobe samples the cellular radio, assembles a snapshot and pushes it
//! to a remote collector over a persistent request/reply channel, on a fixed
//! schedule or on demand.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP stream and listener with bounded timeouts
//! - [`frame`]: Length-prefixed framing, one frame per request or reply
//! - [`codec`]: Telemetry model and its JSON wire form
//! - [`session`]: Connection lifecycle and the request/reply exchange
//! - [`agent`]: Scheduler, shared status and telemetry sources

/// Re-export transport types.
pub mod transport {
    pub use cellprobe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cellprobe_frame::*;
}

/// Re-export model and codec types.
pub mod codec {
    pub use cellprobe_codec::*;
}

/// Re-export session types.
pub mod session {
    pub use cellprobe_session::*;
}

/// Re-export agent types.
pub mod agent {
    pub use cellprobe_agent::*;
}
