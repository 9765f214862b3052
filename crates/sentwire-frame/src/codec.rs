use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};

/// Start-of-frame marker.
pub const STX: u8 = 0x02;

/// End-of-frame marker.
pub const ETX: u8 = 0x03;

/// Frame header: STX (1) + message id (1) + length (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Frame trailer: checksum (1) + ETX (1) = 2 bytes.
pub const TRAILER_SIZE: usize = 2;

/// Largest payload the 16-bit DATALEN field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// A complete envelope frame as received from the interface box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeFrame {
    /// Message id from the header.
    pub message_id: u8,
    /// The DATA section.
    pub payload: Bytes,
    /// Checksum byte carried in the frame.
    pub checksum_received: u8,
    /// Checksum recomputed over id, length and data.
    pub checksum_computed: u8,
    /// Whether the two checksums agree. Advisory only.
    pub checksum_ok: bool,
    /// The full frame, STX through ETX, exactly as received.
    pub raw: Bytes,
}

impl EnvelopeFrame {
    /// Build a well-formed frame around `payload`.
    pub fn new(message_id: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let raw = build_frame(message_id, &payload)?;
        let sum = checksum(message_id, &payload);
        Ok(Self {
            message_id,
            payload,
            checksum_received: sum,
            checksum_computed: sum,
            checksum_ok: true,
            raw,
        })
    }

    /// The total wire size of this frame (header + payload + trailer).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + TRAILER_SIZE
    }
}

/// Additive checksum over message id, both DATALEN bytes and the data.
///
/// The length is taken from `payload`; callers must not exceed [`MAX_PAYLOAD`].
pub fn checksum(message_id: u8, payload: &[u8]) -> u8 {
    let len = payload.len() as u16;
    let [lo, hi] = len.to_le_bytes();
    payload
        .iter()
        .fold(message_id.wrapping_add(lo).wrapping_add(hi), |acc, b| {
            acc.wrapping_add(*b)
        })
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬────────┬───────────┬──────────────┬──────────┬──────┐
/// │ STX  │ MSG_ID │ DATALEN   │ DATA         │ CHECKSUM │ ETX  │
/// │ 0x02 │ (1B)   │ (2B LE)   │ (DATALEN B)  │ (1B)     │ 0x03 │
/// └──────┴────────┴───────────┴──────────────┴──────────┴──────┘
/// ```
pub fn encode_frame(message_id: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    put_frame(message_id, payload, dst);
    Ok(())
}

/// Encode a frame into a fresh buffer.
pub fn build_frame(message_id: u8, payload: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    encode_frame(message_id, payload, &mut dst)?;
    Ok(dst.freeze())
}

pub(crate) fn put_frame(message_id: u8, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    dst.put_u8(STX);
    dst.put_u8(message_id);
    dst.put_u16_le(payload.len() as u16);
    dst.put_slice(payload);
    dst.put_u8(checksum(message_id, payload));
    dst.put_u8(ETX);
}

/// Outcome of one scan step over the receive buffer.
#[derive(Debug)]
pub enum Step {
    /// A complete frame was extracted and consumed.
    Frame(EnvelopeFrame),
    /// Bytes with no start marker were discarded.
    Skipped(usize),
    /// A candidate frame lacked its end marker; one byte was dropped.
    Resync,
    /// The buffer holds no complete frame; nothing was consumed.
    Incomplete,
}

/// Run one scan step over `src`.
///
/// Every call that does not return [`Step::Incomplete`] strictly shrinks
/// `src`, so looping until `Incomplete` always terminates.
pub fn next_step(src: &mut BytesMut) -> Step {
    let Some(stx_pos) = src.iter().position(|b| *b == STX) else {
        let n = src.len();
        if n == 0 {
            return Step::Incomplete;
        }
        src.clear();
        trace!(bytes = n, "discarded buffer without start marker");
        return Step::Skipped(n);
    };

    if stx_pos > 0 {
        src.advance(stx_pos);
        trace!(bytes = stx_pos, "discarded noise before start marker");
        return Step::Skipped(stx_pos);
    }

    if src.len() < HEADER_SIZE {
        return Step::Incomplete;
    }

    let message_id = src[1];
    let datalen = u16::from_le_bytes([src[2], src[3]]) as usize;
    let total = HEADER_SIZE + datalen + TRAILER_SIZE;
    if src.len() < total {
        return Step::Incomplete;
    }

    if src[total - 1] != ETX {
        src.advance(1);
        trace!(message_id, datalen, "missing end marker, resyncing by one byte");
        return Step::Resync;
    }

    let raw = src.split_to(total).freeze();
    let payload = raw.slice(HEADER_SIZE..HEADER_SIZE + datalen);
    let checksum_received = raw[HEADER_SIZE + datalen];
    let checksum_computed = checksum(message_id, &payload);

    Step::Frame(EnvelopeFrame {
        message_id,
        payload,
        checksum_received,
        checksum_computed,
        checksum_ok: checksum_received == checksum_computed,
        raw,
    })
}
