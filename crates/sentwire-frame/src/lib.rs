//! STX/ETX envelope framing for the SENT interface box.
//!
//! The interface box wraps every SENT event in its own envelope:
//! - a start marker (`STX`, 0x02) and a message id
//! - a 2-byte little-endian payload length
//! - the payload, a 1-byte additive checksum and an end marker (`ETX`, 0x03)
//!
//! [`EnvelopeFramer`] turns an untrusted byte stream into complete frames,
//! resynchronizing one byte at a time past corruption. Checksum failures are
//! reported on the frame, never used to drop it.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod framer;
pub mod message;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::EnvelopeCodec;
pub use codec::{
    build_frame, checksum, encode_frame, next_step, EnvelopeFrame, Step, ETX, HEADER_SIZE,
    MAX_PAYLOAD, STX, TRAILER_SIZE,
};
pub use error::{FrameError, Result};
pub use framer::{EnvelopeFramer, FramerConfig};
pub use message::{
    message_name, start_command, stop_command, ChannelSelect, FAST_ERROR, FAST_RECEPTION,
    SENT_START, SENT_STOP, SLOW_ERROR, SLOW_RECEPTION,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
