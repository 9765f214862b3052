//! `tokio_util` codec over the same scan routine as [`EnvelopeFramer`].
//!
//! [`EnvelopeFramer`]: crate::framer::EnvelopeFramer

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, next_step, EnvelopeFrame, Step};
use crate::error::FrameError;

/// Envelope codec for `FramedRead` / `FramedWrite`.
#[derive(Debug, Default)]
pub struct EnvelopeCodec {
    resyncs: u64,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of single-byte resyncs after a missing end marker.
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }
}

impl Decoder for EnvelopeCodec {
    type Item = EnvelopeFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match next_step(src) {
                Step::Frame(frame) => return Ok(Some(frame)),
                Step::Skipped(_) => continue,
                Step::Resync => self.resyncs += 1,
                Step::Incomplete => return Ok(None),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // A truncated tail is noise, not an error.
        let frame = self.decode(src)?;
        if frame.is_none() {
            src.clear();
        }
        Ok(frame)
    }
}

impl Encoder<EnvelopeFrame> for EnvelopeCodec {
    type Error = FrameError;

    fn encode(&mut self, item: EnvelopeFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item.message_id, &item.payload, dst)
    }
}
