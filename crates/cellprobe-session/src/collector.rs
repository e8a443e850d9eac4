use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use cellprobe_frame::{Frame, FrameConfig, FrameReader, FrameWriter};
use cellprobe_transport::{TcpEndpoint, TcpTransport};
use tracing::debug;

use crate::error::CollectorError;

/// Listens for agents and accepts their sessions.
pub struct CollectorListener {
    endpoint: TcpEndpoint,
    frame_config: FrameConfig,
    next_peer_id: AtomicU64,
}

impl CollectorListener {
    /// Bind to `addr` (`host:port`, port `0` for any free port).
    pub fn bind(addr: &str) -> Result<Self, CollectorError> {
        Ok(Self {
            endpoint: TcpEndpoint::bind(addr)?,
            frame_config: FrameConfig::default(),
            next_peer_id: AtomicU64::new(1),
        })
    }

    /// Override frame limits and socket timeouts for accepted peers.
    pub fn with_frame_config(mut self, config: FrameConfig) -> Self {
        self.frame_config = config;
        self
    }

    /// Accept the next agent connection (blocking).
    pub fn accept(&self) -> Result<CollectorPeer, CollectorError> {
        let stream = self.endpoint.accept()?;
        let peer = stream.peer_addr();
        let reader = FrameReader::with_config_tcp(stream.try_clone()?, self.frame_config.clone())?;
        let writer = FrameWriter::with_config_tcp(stream, self.frame_config.clone())?;

        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        Ok(CollectorPeer {
            id: format!("agent-{id}"),
            peer,
            reader,
            writer,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }
}

/// One accepted agent connection.
pub struct CollectorPeer {
    id: String,
    peer: SocketAddr,
    reader: FrameReader<TcpTransport>,
    writer: FrameWriter<TcpTransport>,
}

impl CollectorPeer {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Wait for the agent's next request.
    pub fn recv(&mut self) -> Result<Frame, CollectorError> {
        let frame = self.reader.read_frame()?;
        debug!(
            peer = %self.id,
            channel = frame.channel,
            size = frame.payload.len(),
            "request received"
        );
        Ok(frame)
    }

    /// Answer `request` on its own channel.
    pub fn reply(&mut self, request: &Frame, payload: &[u8]) -> Result<(), CollectorError> {
        self.writer.send(request.channel, payload)?;
        Ok(())
    }

    /// Receive one request and answer it with whatever `respond` returns.
    pub fn serve_one<F>(&mut self, respond: F) -> Result<Frame, CollectorError>
    where
        F: FnOnce(&Frame) -> Vec<u8>,
    {
        let request = self.recv()?;
        let reply = respond(&request);
        self.reply(&request, &reply)?;
        Ok(request)
    }

    /// Close both directions of the connection.
    pub fn close(self) -> Result<(), CollectorError> {
        self.writer.get_ref().shutdown()?;
        Ok(())
    }
}
