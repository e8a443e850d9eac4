use std::io::{Read, Write};
use std::time::{Duration, Instant, SystemTime};

use cellprobe_codec::{decode_ack, encode_test_probe, epoch_millis, Acknowledgement};
use cellprobe_frame::{Frame, FrameError, FrameReader, FrameWriter, CONTROL};
use tracing::debug;

use crate::error::ConnectError;

/// Send the liveness probe on CONTROL and wait for its reply.
///
/// The collector must answer on CONTROL with any non-empty text before
/// `timeout` runs out. Used once per connect.
pub fn send_probe<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    timeout: Duration,
) -> Result<Acknowledgement, ConnectError> {
    let payload = encode_test_probe(epoch_millis(SystemTime::now()))?;
    writer.send(CONTROL, &payload).map_err(|err| {
        if err.is_timeout() {
            ConnectError::Timeout(timeout)
        } else {
            ConnectError::Frame(err)
        }
    })?;
    debug!(size = payload.len(), "probe sent");

    let deadline = Instant::now() + timeout;
    let frame = match await_reply(reader, deadline) {
        Ok(frame) => frame,
        Err(err) if err.is_timeout() => return Err(ConnectError::Timeout(timeout)),
        Err(FrameError::ConnectionClosed) => {
            return Err(ConnectError::NoProbeReply(
                "connection closed before probe reply".to_string(),
            ))
        }
        Err(err) => return Err(ConnectError::Frame(err)),
    };

    if frame.channel != CONTROL {
        return Err(ConnectError::NoProbeReply(format!(
            "expected CONTROL channel {}, got {}",
            CONTROL, frame.channel
        )));
    }

    decode_ack(&frame.payload).map_err(|err| ConnectError::NoProbeReply(err.to_string()))
}

/// Read the next frame, retrying socket timeouts until `deadline`.
///
/// Once the deadline has passed the last timeout error is returned as is.
pub(crate) fn await_reply<R: Read>(
    reader: &mut FrameReader<R>,
    deadline: Instant,
) -> cellprobe_frame::Result<Frame> {
    loop {
        match reader.read_frame() {
            Ok(frame) => return Ok(frame),
            Err(err) if err.is_timeout() && Instant::now() < deadline => continue,
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use cellprobe_frame::{encode_frame, TELEMETRY};

    use super::*;

    fn reply_stream(channel: u16, payload: &[u8]) -> FrameReader<Cursor<Vec<u8>>> {
        let mut wire = BytesMut::new();
        encode_frame(channel, payload, &mut wire).unwrap();
        FrameReader::new(Cursor::new(wire.to_vec()))
    }

    fn sent_probe(writer: FrameWriter<Cursor<Vec<u8>>>) -> serde_json::Value {
        let mut reader = FrameReader::new(Cursor::new(writer.into_inner().into_inner()));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.channel, CONTROL);
        serde_json::from_slice(&frame.payload).unwrap()
    }

    #[test]
    fn probe_accepts_any_text_reply() {
        let mut reader = reply_stream(CONTROL, b"pong");
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let ack = send_probe(&mut reader, &mut writer, Duration::from_secs(1)).unwrap();
        assert_eq!(ack.as_str(), "pong");

        let probe = sent_probe(writer);
        assert_eq!(probe["test"], true);
        assert_eq!(probe["message"], "connection_test");
        assert!(probe["time"].as_u64().unwrap() > 0);
    }

    #[test]
    fn whitespace_only_reply_still_connects() {
        let mut reader = reply_stream(CONTROL, b"\n");
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let ack = send_probe(&mut reader, &mut writer, Duration::from_secs(1)).unwrap();
        assert_eq!(ack.as_str(), "\n");
    }

    #[test]
    fn empty_reply_is_no_probe_reply() {
        let mut reader = reply_stream(CONTROL, b"");
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let err = send_probe(&mut reader, &mut writer, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ConnectError::NoProbeReply(_)), "{err}");
    }

    #[test]
    fn reply_on_wrong_channel_is_rejected() {
        let mut reader = reply_stream(TELEMETRY, b"ack");
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let err = send_probe(&mut reader, &mut writer, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ConnectError::NoProbeReply(ref msg) if msg.contains("channel")));
    }

    #[test]
    fn closed_before_reply() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let err = send_probe(&mut reader, &mut writer, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ConnectError::NoProbeReply(_)));
    }
}
