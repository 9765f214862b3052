use std::time::SystemTime;

use bytes::Bytes;
use sentwire_frame::message_name;

use crate::error::PayloadError;
use crate::sensor::{PressureState, SlowValue};

/// A CRC pair reported by the interface box.
///
/// The box computes its own CRC over the SENT bits; the decoder only compares
/// the two values and never recomputes either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcCheck {
    pub received: u8,
    pub computed: u8,
}

impl CrcCheck {
    pub fn ok(&self) -> bool {
        self.received == self.computed
    }
}

/// Inverted-nibble integrity check on the fast channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InversionCheck {
    pub nibble: u8,
    pub ok: bool,
}

/// Sensor reading derived from fast-channel nibbles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastSignal {
    /// 12-bit digit value.
    pub digit_value: u16,
    pub pressure_bar: f64,
    pub pressure_state: PressureState,
    /// Present with at least five nibbles.
    pub rolling_counter: Option<u8>,
    /// Present with at least six nibbles.
    pub inversion: Option<InversionCheck>,
}

/// Fast-channel message.
#[derive(Debug, Clone, PartialEq)]
pub struct FastReception {
    pub channel: u8,
    pub status: u8,
    /// Declared nibble count (0-15).
    pub nibble_count: u8,
    /// Data nibbles in logical order, truncated to `nibble_count`.
    pub nibbles: Vec<u8>,
    pub crc: CrcCheck,
    /// Device timestamp, present only when the payload carries one.
    pub timestamp_us: Option<u64>,
    pub signal: Option<FastSignal>,
}

/// Whether a slow message used the short or enhanced serial format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlowFrameType {
    Short,
    Enhanced,
}

impl SlowFrameType {
    pub fn as_str(self) -> &'static str {
        match self {
            SlowFrameType::Short => "short",
            SlowFrameType::Enhanced => "enhanced",
        }
    }
}

/// Slow-channel message.
#[derive(Debug, Clone, PartialEq)]
pub struct SlowReception {
    pub channel: u8,
    pub slow_id: u8,
    /// 16-bit little-endian raw value.
    pub raw: u16,
    pub format_bit: bool,
    pub frame_type: SlowFrameType,
    /// 6-bit CRC pair.
    pub crc: CrcCheck,
    pub timestamp_us: Option<u64>,
    pub value: SlowValue,
}

/// Fast-channel reception error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastError {
    pub channel: u8,
    /// 2-bit error type.
    pub error_type: u8,
    pub text: &'static str,
    /// 4-bit framing error sub-code.
    pub framing_error_code: u8,
    pub timestamp_us: Option<u64>,
}

/// Slow-channel reception error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowError {
    pub channel: u8,
    /// 2-bit error type.
    pub error_type: u8,
    pub text: &'static str,
    pub timestamp_us: Option<u64>,
}

/// Kind-specific content of a decoded record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    FastReception(Result<FastReception, PayloadError>),
    SlowReception(Result<SlowReception, PayloadError>),
    FastError(Result<FastError, PayloadError>),
    SlowError(Result<SlowError, PayloadError>),
    /// Message id outside the four known reception kinds.
    Unrecognized,
}

/// One decoded envelope payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    /// Host time at decode.
    pub captured_at: SystemTime,
    pub message_id: u8,
    /// The undecoded payload, kept for forensic output.
    pub payload: Bytes,
    pub body: RecordBody,
}

impl DecodedRecord {
    /// Short kind name (`fast_rx`, `slow_rx`, `fast_error`, `slow_error`, `other`).
    pub fn kind_name(&self) -> &'static str {
        match self.body {
            RecordBody::Unrecognized => "other",
            _ => message_name(self.message_id),
        }
    }

    pub fn channel(&self) -> Option<u8> {
        match &self.body {
            RecordBody::FastReception(Ok(r)) => Some(r.channel),
            RecordBody::SlowReception(Ok(r)) => Some(r.channel),
            RecordBody::FastError(Ok(r)) => Some(r.channel),
            RecordBody::SlowError(Ok(r)) => Some(r.channel),
            _ => None,
        }
    }

    pub fn timestamp_us(&self) -> Option<u64> {
        match &self.body {
            RecordBody::FastReception(Ok(r)) => r.timestamp_us,
            RecordBody::SlowReception(Ok(r)) => r.timestamp_us,
            RecordBody::FastError(Ok(r)) => r.timestamp_us,
            RecordBody::SlowError(Ok(r)) => r.timestamp_us,
            _ => None,
        }
    }

    /// SENT CRC result; only reception records carry one.
    pub fn crc_ok(&self) -> Option<bool> {
        match &self.body {
            RecordBody::FastReception(Ok(r)) => Some(r.crc.ok()),
            RecordBody::SlowReception(Ok(r)) => Some(r.crc.ok()),
            _ => None,
        }
    }

    /// The payload problem, if the record could not be fully decoded.
    pub fn payload_error(&self) -> Option<&PayloadError> {
        match &self.body {
            RecordBody::FastReception(Err(e))
            | RecordBody::SlowReception(Err(e))
            | RecordBody::FastError(Err(e))
            | RecordBody::SlowError(Err(e)) => Some(e),
            _ => None,
        }
    }

    pub fn as_fast(&self) -> Option<&FastReception> {
        match &self.body {
            RecordBody::FastReception(Ok(r)) => Some(r),
            _ => None,
        }
    }

    pub fn as_slow(&self) -> Option<&SlowReception> {
        match &self.body {
            RecordBody::SlowReception(Ok(r)) => Some(r),
            _ => None,
        }
    }

    /// Error text for fast/slow error reports.
    pub fn error_text(&self) -> Option<&'static str> {
        match &self.body {
            RecordBody::FastError(Ok(r)) => Some(r.text),
            RecordBody::SlowError(Ok(r)) => Some(r.text),
            _ => None,
        }
    }
}
