//! Length-prefixed framing for the cellprobe telemetry channel.
//!
//! One frame carries one logical message (a request or its reply). Every
//! frame is laid out as:
//! - A 2-byte magic number ("CT") for stream synchronization
//! - A 4-byte little-endian payload length
//! - A 2-byte little-endian channel ID (CONTROL or TELEMETRY)
//!
//! Callers always see whole messages; partial reads stay in here.

pub mod channel;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use channel::{channel_name, CONTROL, TELEMETRY};
pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
