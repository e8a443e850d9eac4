use std::net::{SocketAddr, TcpListener};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::TcpTransport;

/// Listening TCP endpoint.
///
/// The agent side never listens; this is what a collector binds to. Port `0`
/// asks the OS for a free port, which [`TcpEndpoint::local_addr`] reports.
pub struct TcpEndpoint {
    listener: TcpListener,
    local: SocketAddr,
}

impl TcpEndpoint {
    /// Bind and listen on `addr` (`host:port`).
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local = listener
            .local_addr()
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        info!(%local, "listening on tcp endpoint");

        Ok(Self { listener, local })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<TcpTransport> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nodelay(true)?;
        debug!(%peer, "accepted connection");
        Ok(TcpTransport::from_tcp(stream, peer))
    }

    /// The address this endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }
}
