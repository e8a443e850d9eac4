use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use cellprobe_transport::TcpTransport;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
/// A socket timeout surfaces as `FrameError::Io` with `WouldBlock` or
/// `TimedOut`; see [`FrameError::is_timeout`].
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Drop any buffered bytes of a partially received frame.
    pub fn discard_buffered(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes buffered but not yet returned as a frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<TcpTransport> {
    /// Create a frame reader for a TCP stream and apply the read timeout
    /// from config to the socket.
    pub fn with_config_tcp(inner: TcpTransport, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: cellprobe_transport::TransportError) -> FrameError {
    match err {
        cellprobe_transport::TransportError::Io(io)
        | cellprobe_transport::TransportError::Accept(io) => FrameError::Io(io),
        cellprobe_transport::TransportError::Bind { source, .. }
        | cellprobe_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::net::TcpListener;
    use std::time::Duration;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::channel::{CONTROL, TELEMETRY};
    use crate::codec::{encode_frame, MAGIC};
    use crate::writer::FrameWriter;

    #[test]
    fn reads_consecutive_frames() {
        let mut wire = BytesMut::new();
        encode_frame(CONTROL, b"probe", &mut wire).unwrap();
        encode_frame(TELEMETRY, b"snapshot", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        let first = reader.read_frame().unwrap();
        let second = reader.read_frame().unwrap();
        assert_eq!((first.channel, first.payload.as_ref()), (CONTROL, &b"probe"[..]));
        assert_eq!(
            (second.channel, second.payload.as_ref()),
            (TELEMETRY, &b"snapshot"[..])
        );
        assert_eq!(reader.buffered_len(), 0);
    }

    #[test]
    fn reassembles_frame_delivered_one_byte_at_a_time() {
        let mut wire = BytesMut::new();
        encode_frame(TELEMETRY, b"slow", &mut wire).unwrap();

        let mut reader = FrameReader::new(ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        });

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"slow");
    }

    #[test]
    fn eof_before_any_frame_is_connection_closed() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn eof_mid_frame_is_connection_closed() {
        let mut partial = BytesMut::new();
        partial.put_slice(&MAGIC);
        partial.put_u32_le(32);
        partial.put_u16_le(TELEMETRY);
        partial.put_slice(b"truncated");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn oversized_frame_is_rejected_by_config() {
        let mut wire = BytesMut::new();
        encode_frame(TELEMETRY, &[0u8; 64], &mut wire).unwrap();

        let cfg = FrameConfig {
            max_payload_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.to_vec()), cfg);
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::PayloadTooLarge { size: 64, max: 16 }
        ));
    }

    #[test]
    fn interrupted_read_is_retried() {
        let mut wire = BytesMut::new();
        encode_frame(CONTROL, b"ok", &mut wire).unwrap();

        let mut reader = FrameReader::new(InterruptedOnce {
            interrupted: false,
            inner: Cursor::new(wire.to_vec()),
        });
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"ok");
    }

    #[test]
    fn socket_timeout_is_reported_as_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let stream = TcpTransport::connect(&addr, Duration::from_secs(1)).unwrap();

        let cfg = FrameConfig {
            read_timeout: Some(Duration::from_millis(20)),
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config_tcp(stream, cfg).unwrap();

        let err = reader.read_frame().unwrap_err();
        assert!(err.is_timeout(), "unexpected error: {err}");
        drop(listener);
    }

    #[test]
    fn request_reply_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = FrameReader::new(stream.try_clone().unwrap());
            let mut writer = FrameWriter::new(stream);
            let request = reader.read_frame().unwrap();
            writer.send(request.channel, b"ack").unwrap();
        });

        let stream = TcpTransport::connect(&addr, Duration::from_secs(1)).unwrap();
        let mut reader = FrameReader::new(stream.try_clone().unwrap());
        let mut writer = FrameWriter::new(stream);

        writer.send(TELEMETRY, b"{}").unwrap();
        let reply = reader.read_frame().unwrap();
        assert_eq!(reply.channel, TELEMETRY);
        assert_eq!(reply.payload.as_ref(), b"ack");

        server.join().unwrap();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
