//! TCP transport for the cellprobe telemetry channel.
//!
//! This is the lowest layer of cellprobe. It owns socket setup only:
//! address resolution, bounded connect, and the send/receive timeouts the
//! request/reply discipline above it relies on. Everything else builds on
//! the [`TcpTransport`] stream provided here.

pub mod error;
pub mod listener;
pub mod stream;

pub use error::{Result, TransportError};
pub use listener::TcpEndpoint;
pub use stream::TcpTransport;
