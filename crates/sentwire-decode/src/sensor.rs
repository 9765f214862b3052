//! Sensor semantics for the i2s Dresden #803405 (IPT1866, 30 bar).
//!
//! Fast channel: 6 nibbles.
//! - n1..n3: 12-bit digit value
//! - n4..n5: 8-bit rolling counter
//! - n6: inverted copy of n1
//!
//! Slow channel: enhanced serial messages keyed by slow id, see [`SlowField`].

use std::borrow::Cow;
use std::fmt;

use crate::record::{FastSignal, InversionCheck};

/// Pressure transfer function gain, bar per digit.
pub const PRESSURE_GAIN: f64 = 0.00825;
/// Pressure transfer function offset, bar.
pub const PRESSURE_OFFSET: f64 = -1.65;
/// Temperature gain, °C per LSB.
pub const TEMPERATURE_GAIN: f64 = 0.125;
/// Temperature offset, °C.
pub const TEMPERATURE_OFFSET: f64 = -73.15;

/// Digit value the sensor sends to signal an internal error.
pub const ERROR_SENTINEL: u16 = 4090;
/// Lowest digit value of the high clamp range.
pub const HIGH_CLAMP_MIN: u16 = 4088;
/// Highest digit value of the low clamp range.
pub const LOW_CLAMP_MAX: u16 = 1;

/// Relative pressure in bar for a fast-channel digit value.
pub fn pressure_bar(digit_value: u16) -> f64 {
    PRESSURE_GAIN * f64::from(digit_value) + PRESSURE_OFFSET
}

/// Internal temperature in °C for a raw slow-channel value.
pub fn temperature_c(raw: u16) -> f64 {
    TEMPERATURE_GAIN * f64::from(raw) + TEMPERATURE_OFFSET
}

/// Classification of a fast-channel digit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureState {
    Initialization,
    ErrorCode,
    HighClamp,
    LowClamp,
    Ok,
}

impl PressureState {
    pub fn as_str(self) -> &'static str {
        match self {
            PressureState::Initialization => "Initialization",
            PressureState::ErrorCode => "ErrorCode",
            PressureState::HighClamp => "HighClamp",
            PressureState::LowClamp => "LowClamp",
            PressureState::Ok => "OK",
        }
    }
}

impl fmt::Display for PressureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a digit value.
///
/// The error sentinel sits just above the high clamp range and must be
/// matched first.
pub fn pressure_state(digit_value: u16) -> PressureState {
    match digit_value {
        0 => PressureState::Initialization,
        ERROR_SENTINEL => PressureState::ErrorCode,
        d if (HIGH_CLAMP_MIN..ERROR_SENTINEL).contains(&d) => PressureState::HighClamp,
        d if d <= LOW_CLAMP_MAX => PressureState::LowClamp,
        _ => PressureState::Ok,
    }
}

/// Derive the sensor signal from the unpacked fast-channel nibbles.
///
/// Needs at least three nibbles; counter and inversion check are filled in
/// only when their nibbles are present.
pub fn fast_signal(nibbles: &[u8]) -> Option<FastSignal> {
    let [n1, n2, n3, rest @ ..] = nibbles else {
        return None;
    };
    let digit_value = (u16::from(*n1) << 8) | (u16::from(*n2) << 4) | u16::from(*n3);

    let rolling_counter = match rest {
        [n4, n5, ..] => Some((*n4 << 4) | *n5),
        _ => None,
    };
    let inversion = rest.get(2).map(|n6| InversionCheck {
        nibble: *n6,
        ok: *n6 == (!*n1 & 0x0F),
    });

    Some(FastSignal {
        digit_value,
        pressure_bar: pressure_bar(digit_value),
        pressure_state: pressure_state(digit_value),
        rolling_counter,
        inversion,
    })
}

const DIAGNOSTIC_CODES: &[(u16, &str)] = &[
    (0x000, "No error"),
    (0x900, "Sensor supply undervoltage"),
    (0x901, "Sensor supply overvoltage"),
    (0xFC1, "IC internal hardware error"),
    (0xFC2, "IC internal ADC or Gain error"),
    (0xF01, "Bridge connections check failed"),
    (0xF02, "Bridge output short check failed"),
    (0xF03, "Bridge common mode check failed"),
    (0xF04, "Pressure ADC saturation error"),
    (0xD05, "Internal IC Temperature error"),
    (0xF05, "Internal math saturation"),
];

/// Text for a 12-bit diagnostic code.
pub fn diag_text(code: u16) -> Cow<'static, str> {
    DIAGNOSTIC_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, text)| Cow::Borrowed(*text))
        .unwrap_or_else(|| Cow::Owned(format!("Unknown diagnostic code 0x{code:03X}")))
}

/// Fields carried on the slow channel, keyed by slow id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlowField {
    DiagnosticCode,
    SensorType,
    SensorConfiguration,
    ManufacturerCode,
    SentStandardRevision,
    /// Characteristic point X1, given in bar.
    CharacteristicX1,
    /// Characteristic point X2, given in bar.
    CharacteristicX2,
    /// Characteristic point Y1, given as a digit value.
    CharacteristicY1,
    /// Characteristic point Y2, given as a digit value.
    CharacteristicY2,
    InternalTemperature,
    SensorIdLast3,
    SensorIdFirst3,
    DateCodeCwDay,
    DateCodeYear,
    Unknown(u8),
}

impl SlowField {
    pub fn from_id(slow_id: u8) -> Self {
        match slow_id {
            0x01 => SlowField::DiagnosticCode,
            0x03 => SlowField::SensorType,
            0x04 => SlowField::SensorConfiguration,
            0x05 => SlowField::ManufacturerCode,
            0x06 => SlowField::SentStandardRevision,
            0x07 => SlowField::CharacteristicX1,
            0x08 => SlowField::CharacteristicX2,
            0x09 => SlowField::CharacteristicY1,
            0x0A => SlowField::CharacteristicY2,
            0x23 => SlowField::InternalTemperature,
            0x29 => SlowField::SensorIdLast3,
            0x2A => SlowField::SensorIdFirst3,
            0x2B => SlowField::DateCodeCwDay,
            0x2C => SlowField::DateCodeYear,
            other => SlowField::Unknown(other),
        }
    }

    pub fn name(self) -> Cow<'static, str> {
        let name = match self {
            SlowField::DiagnosticCode => "DiagnosticCode",
            SlowField::SensorType => "SensorType",
            SlowField::SensorConfiguration => "SensorConfiguration",
            SlowField::ManufacturerCode => "ManufacturerCode",
            SlowField::SentStandardRevision => "SentStandardRevision",
            SlowField::CharacteristicX1 => "CharacteristicX1",
            SlowField::CharacteristicX2 => "CharacteristicX2",
            SlowField::CharacteristicY1 => "CharacteristicY1",
            SlowField::CharacteristicY2 => "CharacteristicY2",
            SlowField::InternalTemperature => "InternalTemperature",
            SlowField::SensorIdLast3 => "SensorID_last3",
            SlowField::SensorIdFirst3 => "SensorID_first3",
            SlowField::DateCodeCwDay => "DateCode_cw_day",
            SlowField::DateCodeYear => "DateCode_year",
            SlowField::Unknown(id) => return Cow::Owned(format!("Unknown_0x{id:02X}")),
        };
        Cow::Borrowed(name)
    }

    /// Whether the correlation cache consumes this field.
    pub fn is_identity_fragment(self) -> bool {
        matches!(
            self,
            SlowField::SensorIdLast3
                | SlowField::SensorIdFirst3
                | SlowField::DateCodeCwDay
                | SlowField::DateCodeYear
        )
    }
}

impl fmt::Display for SlowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A decoded slow-channel value.
#[derive(Debug, Clone, PartialEq)]
pub struct SlowValue {
    pub field: SlowField,
    pub raw: u16,
    pub text: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<&'static str>,
}

impl SlowValue {
    fn raw_only(field: SlowField, raw: u16) -> Self {
        Self {
            field,
            raw,
            text: None,
            value: None,
            unit: None,
        }
    }

    fn measured(field: SlowField, raw: u16, value: f64, unit: &'static str) -> Self {
        Self {
            field,
            raw,
            text: None,
            value: Some(value),
            unit: Some(unit),
        }
    }
}

/// Decode a raw slow-channel value by slow id.
pub fn decode_slow_value(slow_id: u8, raw: u16) -> SlowValue {
    let field = SlowField::from_id(slow_id);
    match field {
        SlowField::DiagnosticCode => SlowValue {
            text: Some(diag_text(raw).into_owned()),
            ..SlowValue::raw_only(field, raw)
        },
        SlowField::CharacteristicX1 | SlowField::CharacteristicX2 => {
            SlowValue::measured(field, raw, f64::from(raw), "bar")
        }
        SlowField::CharacteristicY1 | SlowField::CharacteristicY2 => {
            SlowValue::measured(field, raw, pressure_bar(raw), "bar")
        }
        SlowField::InternalTemperature => {
            SlowValue::measured(field, raw, temperature_c(raw), "°C")
        }
        _ => SlowValue::raw_only(field, raw),
    }
}

/// Six-digit serial number from its two halves, zero padded.
pub fn combine_serial(first3: Option<u16>, last3: Option<u16>) -> Option<String> {
    Some(format!("{:03}{:03}", first3?, last3?))
}

/// Manufacturing date code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCode {
    pub year_2digit: u16,
    pub calendar_week: u16,
    pub day_in_week: u16,
    cw_day: u16,
}

impl DateCode {
    /// The five code digits as sent: two year digits, then week and day.
    pub fn raw(&self) -> String {
        format!("{:02}{:03}", self.year_2digit, self.cw_day)
    }
}

impl fmt::Display for DateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "20{:02}-CW{:02}-D{}",
            self.year_2digit, self.calendar_week, self.day_in_week
        )
    }
}

/// Assemble a date code from year and week/day fragments.
pub fn decode_date_code(year2: Option<u16>, cw_day: Option<u16>) -> Option<DateCode> {
    let (year_2digit, cw_day) = (year2?, cw_day?);
    Some(DateCode {
        year_2digit,
        calendar_week: cw_day / 10,
        day_in_week: cw_day % 10,
        cw_day,
    })
}
