//! Channel IDs carried in the frame header.
//!
//! A reply always travels on the channel of the request it answers.

/// Session control: the liveness probe sent while connecting.
pub const CONTROL: u16 = 0;

/// Telemetry snapshots and their acknowledgements.
pub const TELEMETRY: u16 = 1;

/// Returns a human-readable name for a channel ID.
pub fn channel_name(id: u16) -> &'static str {
    match id {
        CONTROL => "CONTROL",
        TELEMETRY => "TELEMETRY",
        _ => "UNKNOWN",
    }
}
