use std::time::SystemTime;

use bytes::Bytes;
use sentwire_frame::{EnvelopeFrame, FAST_ERROR, FAST_RECEPTION, SLOW_ERROR, SLOW_RECEPTION};
use tracing::debug;

use crate::error::PayloadError;
use crate::record::{
    CrcCheck, DecodedRecord, FastError, FastReception, RecordBody, SlowError, SlowFrameType,
    SlowReception,
};
use crate::sensor::{decode_slow_value, fast_signal};

/// Length of the optional trailing device timestamp.
pub const TIMESTAMP_LEN: usize = 8;

const FAST_MIN_LEN: usize = 3;
const SLOW_LEN: usize = 6;
const ERROR_LEN: usize = 2;

const FAST_ERROR_TEXT: [&str; 4] = [
    "CRC mismatch",
    "Framing error (nibble length out of range)",
    "Adjacent sync error",
    "SENT bus error (wrong sync)",
];

const SLOW_ERROR_TEXT: [&str; 4] = ["CRC", "Framing", "Sync", "Unknown(3)"];

/// Which half of a data byte holds the logically first nibble.
///
/// Firmware variants of the interface box disagree on this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NibbleOrder {
    #[default]
    LowFirst,
    HighFirst,
}

/// Decoder options.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    pub nibble_order: NibbleOrder,
}

/// Decode one envelope payload, stamped with the current host time.
pub fn decode(message_id: u8, payload: Bytes, options: &DecodeOptions) -> DecodedRecord {
    decode_at(message_id, payload, options, SystemTime::now())
}

/// Decode an envelope frame as delivered by the framer.
pub fn decode_envelope(frame: &EnvelopeFrame, options: &DecodeOptions) -> DecodedRecord {
    decode(frame.message_id, frame.payload.clone(), options)
}

/// Decode with an explicit capture time.
pub fn decode_at(
    message_id: u8,
    payload: Bytes,
    options: &DecodeOptions,
    captured_at: SystemTime,
) -> DecodedRecord {
    let body = match message_id {
        FAST_RECEPTION => RecordBody::FastReception(decode_fast(&payload, options)),
        SLOW_RECEPTION => RecordBody::SlowReception(decode_slow(&payload)),
        FAST_ERROR => RecordBody::FastError(decode_fast_error(&payload)),
        SLOW_ERROR => RecordBody::SlowError(decode_slow_error(&payload)),
        _ => RecordBody::Unrecognized,
    };

    let record = DecodedRecord {
        captured_at,
        message_id,
        payload,
        body,
    };
    if let Some(err) = record.payload_error() {
        debug!(message_id, error = %err, "undecodable payload");
    }
    record
}

/// The trailing timestamp is present only when the payload is exactly
/// `base_len + 8` bytes long.
fn trailing_timestamp(payload: &[u8], base_len: usize) -> Option<u64> {
    if payload.len() != base_len + TIMESTAMP_LEN {
        return None;
    }
    let bytes: [u8; TIMESTAMP_LEN] = payload[base_len..].try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

fn unpack_nibbles(data: &[u8], order: NibbleOrder, count: usize) -> Vec<u8> {
    let mut nibbles: Vec<u8> = data
        .iter()
        .flat_map(|b| {
            let (lo, hi) = (b & 0x0F, b >> 4);
            match order {
                NibbleOrder::LowFirst => [lo, hi],
                NibbleOrder::HighFirst => [hi, lo],
            }
        })
        .collect();
    nibbles.truncate(count);
    nibbles
}

fn ensure_len(payload: &[u8], min: usize) -> Result<(), PayloadError> {
    if payload.len() < min {
        return Err(PayloadError::TooShort {
            len: payload.len(),
            min,
        });
    }
    Ok(())
}

// channel | status:count | data[ceil(count/2)] | crc rx:calc | [timestamp]
fn decode_fast(payload: &[u8], options: &DecodeOptions) -> Result<FastReception, PayloadError> {
    ensure_len(payload, FAST_MIN_LEN)?;

    let channel = payload[0];
    let status = payload[1] & 0x0F;
    let nibble_count = payload[1] >> 4;

    let data_len = usize::from(nibble_count).div_ceil(2);
    let crc_index = 2 + data_len;
    let base_len = crc_index + 1;
    if payload.len() < base_len {
        return Err(PayloadError::LengthMismatch {
            len: payload.len(),
            expected: base_len,
        });
    }

    let crc_byte = payload[crc_index];
    let nibbles = unpack_nibbles(
        &payload[2..crc_index],
        options.nibble_order,
        usize::from(nibble_count),
    );
    let signal = fast_signal(&nibbles);

    Ok(FastReception {
        channel,
        status,
        nibble_count,
        nibbles,
        crc: CrcCheck {
            received: crc_byte & 0x0F,
            computed: crc_byte >> 4,
        },
        timestamp_us: trailing_timestamp(payload, base_len),
        signal,
    })
}

// channel | slow id | value lo | value hi | fmt:type:crc rx | crc calc | [timestamp]
fn decode_slow(payload: &[u8]) -> Result<SlowReception, PayloadError> {
    ensure_len(payload, SLOW_LEN)?;

    let channel = payload[0];
    let slow_id = payload[1];
    let raw = u16::from_le_bytes([payload[2], payload[3]]);
    let frame_info = payload[4];
    let frame_type = if frame_info & 0x40 != 0 {
        SlowFrameType::Enhanced
    } else {
        SlowFrameType::Short
    };

    Ok(SlowReception {
        channel,
        slow_id,
        raw,
        format_bit: frame_info & 0x80 != 0,
        frame_type,
        crc: CrcCheck {
            received: frame_info & 0x3F,
            computed: payload[5] & 0x3F,
        },
        timestamp_us: trailing_timestamp(payload, SLOW_LEN),
        value: decode_slow_value(slow_id, raw),
    })
}

fn error_type(info: u8) -> u8 {
    (info >> 4) & 0x03
}

fn decode_fast_error(payload: &[u8]) -> Result<FastError, PayloadError> {
    ensure_len(payload, ERROR_LEN)?;
    let error_type = error_type(payload[1]);
    Ok(FastError {
        channel: payload[0],
        error_type,
        text: FAST_ERROR_TEXT[usize::from(error_type)],
        framing_error_code: payload[1] & 0x0F,
        timestamp_us: trailing_timestamp(payload, ERROR_LEN),
    })
}

fn decode_slow_error(payload: &[u8]) -> Result<SlowError, PayloadError> {
    ensure_len(payload, ERROR_LEN)?;
    let error_type = error_type(payload[1]);
    Ok(SlowError {
        channel: payload[0],
        error_type,
        text: SLOW_ERROR_TEXT[usize::from(error_type)],
        timestamp_us: trailing_timestamp(payload, ERROR_LEN),
    })
}
