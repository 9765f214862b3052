//! Sensor identity assembled across slow-channel messages.
//!
//! The serial number and date code each arrive as two fragments on separate
//! slow ids. Each fragment is cached as it arrives (last value wins); the
//! combined values are rebuilt once both halves are known and then survive
//! until a newer pair replaces them.

use tracing::debug;

use crate::record::DecodedRecord;
use crate::sensor::{combine_serial, decode_date_code, DateCode, SlowField};

/// Cached identity fragments and the values derived from them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationState {
    pub serial_first3: Option<u16>,
    pub serial_last3: Option<u16>,
    pub date_year2: Option<u16>,
    pub date_cw_day: Option<u16>,
    pub serial_number: Option<String>,
    pub date_code: Option<DateCode>,
}

impl CorrelationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the cache. Anything other than a successfully
    /// decoded identity fragment is ignored.
    pub fn update(&mut self, record: &DecodedRecord) {
        let Some(slow) = record.as_slow() else {
            return;
        };

        let raw = slow.raw;
        match slow.value.field {
            SlowField::SensorIdFirst3 => self.serial_first3 = Some(raw),
            SlowField::SensorIdLast3 => self.serial_last3 = Some(raw),
            SlowField::DateCodeYear => self.date_year2 = Some(raw),
            SlowField::DateCodeCwDay => self.date_cw_day = Some(raw),
            _ => return,
        }

        if let Some(serial) = combine_serial(self.serial_first3, self.serial_last3) {
            if self.serial_number.as_deref() != Some(serial.as_str()) {
                debug!(serial = %serial, "sensor serial number assembled");
            }
            self.serial_number = Some(serial);
        }
        if let Some(code) = decode_date_code(self.date_year2, self.date_cw_day) {
            if self.date_code != Some(code) {
                debug!(date_code = %code, "sensor date code assembled");
            }
            self.date_code = Some(code);
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> CorrelationState {
        self.clone()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
