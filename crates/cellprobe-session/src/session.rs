use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use cellprobe_frame::{FrameError, FrameReader, FrameWriter, TELEMETRY};
use cellprobe_transport::TcpTransport;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{ConnectError, ExchangeError};
use crate::probe::{await_reply, send_probe};
use crate::state::SessionState;

/// The live half of a connected session.
struct Link {
    reader: FrameReader<TcpTransport>,
    writer: FrameWriter<TcpTransport>,
    peer: SocketAddr,
}

impl Link {
    fn round_trip(
        &mut self,
        request: &[u8],
        config: &SessionConfig,
    ) -> Result<Bytes, ExchangeError> {
        self.writer
            .send(TELEMETRY, request)
            .map_err(|err| match err {
                err if err.is_timeout() => ExchangeError::SendTimeout(config.send_timeout),
                err if is_hang_up(&err) => ExchangeError::TransportClosed(
                    "collector closed the connection while sending".to_string(),
                ),
                err => ExchangeError::Frame(err),
            })?;
        debug!(peer = %self.peer, size = request.len(), "request sent");

        let deadline = Instant::now() + config.recv_timeout;
        let reply = await_reply(&mut self.reader, deadline).map_err(|err| match err {
            err if err.is_timeout() => ExchangeError::ReceiveTimeout(config.recv_timeout),
            FrameError::ConnectionClosed => ExchangeError::TransportClosed(
                "collector closed the connection before replying".to_string(),
            ),
            err => ExchangeError::Frame(err),
        })?;

        if reply.channel != TELEMETRY {
            return Err(ExchangeError::UnexpectedChannel {
                expected: TELEMETRY,
                got: reply.channel,
            });
        }
        Ok(reply.payload)
    }
}

fn is_hang_up(err: &FrameError) -> bool {
    match err {
        FrameError::ConnectionClosed => true,
        FrameError::Io(io) => io.kind() == std::io::ErrorKind::BrokenPipe,
        _ => false,
    }
}

/// A request/reply channel to one collector.
///
/// The session is a plain owned value: whoever holds it decides when to
/// connect, exchange and disconnect. Dropping it closes the connection.
///
/// `exchange` takes `&mut self`, so at most one request is ever outstanding.
/// Sharing a session between tasks needs a lock, and the lock holder is the
/// one that reports busy:
///
/// ```compile_fail
/// use cellprobe_session::{Session, SessionConfig};
///
/// let mut session = Session::new(SessionConfig::default());
/// std::thread::scope(|s| {
///     s.spawn(|| session.exchange(b"first"));
///     s.spawn(|| session.exchange(b"second"));
/// });
/// ```
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    link: Option<Link>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
            link: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Address of the collector while connected.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.link.as_ref().map(|link| link.peer)
    }

    /// Open the connection and probe the collector.
    ///
    /// A session that is already connected is torn down and rebuilt. On
    /// failure nothing stays open and the state is `Failed`.
    pub fn connect(&mut self) -> Result<(), ConnectError> {
        if self.link.is_some() {
            debug!(addr = %self.config.addr, "rebuilding connected session");
            self.teardown(SessionState::Disconnected);
        }

        self.state = SessionState::Connecting;
        let started = Instant::now();

        match self.open() {
            Ok(link) => {
                info!(
                    addr = %self.config.addr,
                    peer = %link.peer,
                    elapsed = ?started.elapsed(),
                    "session connected"
                );
                self.link = Some(link);
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(err) => {
                warn!(addr = %self.config.addr, error = %err, "session connect failed");
                self.state = SessionState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    fn open(&self) -> Result<Link, ConnectError> {
        let stream = TcpTransport::connect(&self.config.addr, self.config.connect_timeout)
            .map_err(|err| ConnectError::from_transport(err, self.config.connect_timeout))?;
        let peer = stream.peer_addr();

        let frame_config = self.config.frame_config();
        let mut reader = FrameReader::with_config_tcp(stream.try_clone()?, frame_config.clone())?;
        let mut writer = FrameWriter::with_config_tcp(stream, frame_config)?;

        let ack = send_probe(&mut reader, &mut writer, self.config.recv_timeout)?;
        debug!(peer = %peer, reply = %ack, "probe acknowledged");

        Ok(Link {
            reader,
            writer,
            peer,
        })
    }

    /// Send one request and wait for its reply.
    ///
    /// Fails with `NotConnected` without touching the network unless the
    /// session is connected. Any failure after the request went out drops
    /// the connection: a closed peer leaves the session `Disconnected`,
    /// anything else leaves it `Failed`.
    pub fn exchange(&mut self, request: &[u8]) -> Result<Bytes, ExchangeError> {
        if !self.state.is_connected() {
            return Err(ExchangeError::NotConnected);
        }
        let Some(link) = self.link.as_mut() else {
            return Err(ExchangeError::NotConnected);
        };

        let result = link.round_trip(request, &self.config);

        match result {
            Ok(reply) => {
                debug!(size = reply.len(), "reply received");
                Ok(reply)
            }
            Err(err) => {
                warn!(
                    addr = %self.config.addr,
                    error = %err,
                    "exchange failed, dropping connection"
                );
                let next = match err {
                    ExchangeError::TransportClosed(_) => SessionState::Disconnected,
                    _ => SessionState::Failed(err.to_string()),
                };
                self.teardown(next);
                Err(err)
            }
        }
    }

    /// Close the connection. Safe to call in any state, any number of times.
    pub fn disconnect(&mut self) {
        if self.link.is_some() {
            info!(addr = %self.config.addr, "disconnecting session");
        }
        self.teardown(SessionState::Disconnected);
    }

    fn teardown(&mut self, next: SessionState) {
        if let Some(link) = self.link.take() {
            if let Err(err) = link.writer.get_ref().shutdown() {
                warn!(peer = %link.peer, error = %err, "failed to shut down session stream");
            }
        }
        self.state = next;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("addr", &self.config.addr)
            .field("state", &self.state)
            .field("peer", &self.peer_addr())
            .finish()
    }
}
