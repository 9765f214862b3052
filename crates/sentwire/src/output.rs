use std::fmt::Write as _;
use std::io::IsTerminal;
use std::time::SystemTime;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use sentwire_decode::{CorrelationState, DecodedRecord, RecordBody};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Column order of the decoded CSV file.
pub const CSV_COLUMNS: [&str; 25] = [
    "pc_time",
    "type",
    "channel",
    "timestamp_us",
    "crc_ok",
    "status_nibble",
    "data_nibble_count",
    "data_nibbles",
    "digit_value",
    "pressure_bar",
    "pressure_state",
    "rolling_counter",
    "invert_ok",
    "slow_id_hex",
    "slow_raw",
    "decoded_name",
    "decoded_value",
    "decoded_unit",
    "decoded_text",
    "errtype_text",
    "msg_id_hex",
    "raw_data_hex",
    "state_serial_number",
    "state_date_code",
    "decode_error",
];

/// Flat view of one decoded record, shared by JSON, CSV and console output.
///
/// Field order must match [`CSV_COLUMNS`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordRow {
    pub pc_time: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub channel: Option<u8>,
    pub timestamp_us: Option<u64>,
    pub crc_ok: Option<bool>,
    pub status_nibble: Option<u8>,
    pub data_nibble_count: Option<u8>,
    pub data_nibbles: Option<String>,
    pub digit_value: Option<u16>,
    pub pressure_bar: Option<f64>,
    pub pressure_state: Option<&'static str>,
    pub rolling_counter: Option<u8>,
    pub invert_ok: Option<bool>,
    pub slow_id_hex: Option<String>,
    pub slow_raw: Option<u16>,
    pub decoded_name: Option<String>,
    pub decoded_value: Option<f64>,
    pub decoded_unit: Option<&'static str>,
    pub decoded_text: Option<String>,
    pub errtype_text: Option<&'static str>,
    pub msg_id_hex: String,
    pub raw_data_hex: String,
    pub state_serial_number: Option<String>,
    pub state_date_code: Option<String>,
    pub decode_error: Option<String>,
}

impl RecordRow {
    pub fn new(record: &DecodedRecord, state: Option<&CorrelationState>) -> Self {
        let mut row = RecordRow {
            pc_time: format_pc_time(record.captured_at),
            kind: record.kind_name(),
            channel: record.channel(),
            timestamp_us: record.timestamp_us(),
            crc_ok: record.crc_ok(),
            errtype_text: record.error_text(),
            msg_id_hex: format!("0x{:02X}", record.message_id),
            raw_data_hex: hex_upper(&record.payload),
            decode_error: record.payload_error().map(ToString::to_string),
            ..RecordRow::default()
        };

        match &record.body {
            RecordBody::FastReception(Ok(fast)) => {
                row.status_nibble = Some(fast.status);
                row.data_nibble_count = Some(fast.nibble_count);
                row.data_nibbles = Some(
                    fast.nibbles
                        .iter()
                        .map(u8::to_string)
                        .collect::<Vec<_>>()
                        .join(" "),
                );
                if let Some(signal) = &fast.signal {
                    row.digit_value = Some(signal.digit_value);
                    row.pressure_bar = Some(round6(signal.pressure_bar));
                    row.pressure_state = Some(signal.pressure_state.as_str());
                    row.rolling_counter = signal.rolling_counter;
                    row.invert_ok = signal.inversion.map(|check| check.ok);
                }
            }
            RecordBody::SlowReception(Ok(slow)) => {
                row.slow_id_hex = Some(format!("0x{:02X}", slow.slow_id));
                row.slow_raw = Some(slow.raw);
                row.decoded_name = Some(slow.value.field.name().into_owned());
                row.decoded_value = slow.value.value.map(round6);
                row.decoded_unit = slow.value.unit;
                row.decoded_text = slow.value.text.clone();
            }
            _ => {}
        }

        if let Some(state) = state {
            row.state_serial_number = state.serial_number.clone();
            row.state_date_code = state.date_code.map(|code| code.to_string());
        }
        row
    }

    /// Everything after the time/channel/type prefix of a console line.
    fn detail(&self) -> String {
        let crc_ok = display_opt(&self.crc_ok);

        if let Some(err) = &self.decode_error {
            return format!(
                "decode_error=\"{err}\" msg={} data={}",
                self.msg_id_hex, self.raw_data_hex
            );
        }

        match self.kind {
            "fast_rx" => {
                let pressure = self
                    .pressure_bar
                    .map(|p| format!("{p:.3}bar"))
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "status=0x{:X} nibbles={} crc_ok={crc_ok} digit={} p={pressure} state={}",
                    self.status_nibble.unwrap_or_default(),
                    display_opt(&self.data_nibble_count),
                    display_opt(&self.digit_value),
                    self.pressure_state.unwrap_or("-"),
                )
            }
            "slow_rx" => {
                let sid = self.slow_id_hex.as_deref().unwrap_or("-");
                let name = self.decoded_name.as_deref().unwrap_or("-");
                match (self.decoded_value, self.decoded_unit, &self.decoded_text) {
                    (Some(value), Some(unit), _) => {
                        format!("id={sid} {name}={value:.3}{unit} crc_ok={crc_ok}")
                    }
                    (_, _, Some(text)) => format!("id={sid} {name}: {text} crc_ok={crc_ok}"),
                    _ => format!(
                        "id={sid} {name} raw={} crc_ok={crc_ok}",
                        display_opt(&self.slow_raw)
                    ),
                }
            }
            "fast_error" | "slow_error" => {
                let details = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
                format!("{} details={details}", self.errtype_text.unwrap_or("-"))
            }
            _ => format!("msg={} data={}", self.msg_id_hex, self.raw_data_hex),
        }
    }

    fn state_suffix(&self) -> String {
        let mut out = String::new();
        if let Some(serial) = &self.state_serial_number {
            let _ = write!(out, " serial={serial}");
        }
        if let Some(code) = &self.state_date_code {
            let _ = write!(out, " date_code={code}");
        }
        out
    }

    fn raw_suffix(&self) -> String {
        format!(" raw_payload={} msg={}", self.raw_data_hex, self.msg_id_hex)
    }

    /// One console line in the `pretty` layout.
    pub fn pretty_line(&self, print_raw: bool) -> String {
        let mut line = format!(
            "{} ch={} {}",
            self.pc_time,
            display_opt(&self.channel),
            self.kind
        );
        if let Some(ts) = self.timestamp_us {
            let _ = write!(line, " ts_us={ts}");
        }
        line.push(' ');
        line.push_str(&self.detail());
        line.push_str(&self.state_suffix());
        if print_raw {
            line.push_str(&self.raw_suffix());
        }
        line
    }
}

pub fn print_record(row: &RecordRow, format: OutputFormat, print_raw: bool) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut detail = row.detail();
            detail.push_str(&row.state_suffix());
            if print_raw {
                detail.push_str(&row.raw_suffix());
            }

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TIME", "CH", "TYPE", "TS_US", "DETAIL"])
                .add_row(vec![
                    row.pc_time.clone(),
                    display_opt(&row.channel),
                    row.kind.to_string(),
                    display_opt(&row.timestamp_us),
                    detail.trim_start().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", row.pretty_line(print_raw)),
    }
}

/// Host time as RFC 3339 with millisecond precision.
pub fn format_pc_time(at: SystemTime) -> String {
    jiff::Timestamp::try_from(at)
        .map(|ts| format!("{ts:.3}"))
        .unwrap_or_default()
}

pub fn hex_upper(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{byte:02X}");
    }
    out
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

fn display_opt<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use bytes::Bytes;
    use sentwire_decode::{decode_at, DecodeOptions};
    use sentwire_frame::{FAST_ERROR, FAST_RECEPTION, SLOW_RECEPTION};

    use super::*;

    fn record(message_id: u8, payload: &'static [u8]) -> DecodedRecord {
        decode_at(
            message_id,
            Bytes::from_static(payload),
            &DecodeOptions::default(),
            UNIX_EPOCH + Duration::from_millis(1_500),
        )
    }

    #[test]
    fn fast_row() {
        let row = RecordRow::new(
            &record(FAST_RECEPTION, &[0x00, 0x65, 0x08, 0x30, 0x7C, 0x55]),
            None,
        );
        assert_eq!(row.kind, "fast_rx");
        assert_eq!(row.pc_time, "1970-01-01T00:00:01.500Z");
        assert_eq!(row.data_nibbles.as_deref(), Some("8 0 0 3 12 7"));
        assert_eq!(row.digit_value, Some(2048));
        assert_eq!(row.pressure_bar, Some(15.246));
        assert_eq!(row.pressure_state, Some("OK"));
        assert_eq!(row.rolling_counter, Some(0x3C));
        assert_eq!(row.invert_ok, Some(true));
        assert_eq!(row.msg_id_hex, "0x95");
        assert_eq!(row.raw_data_hex, "006508307C55");

        assert_eq!(
            row.pretty_line(false),
            "1970-01-01T00:00:01.500Z ch=0 fast_rx status=0x5 nibbles=6 crc_ok=true \
             digit=2048 p=15.246bar state=OK"
        );
    }

    #[test]
    fn slow_row_with_unit() {
        let row = RecordRow::new(
            &record(SLOW_RECEPTION, &[0x01, 0x23, 0x11, 0x03, 0x55, 0x15]),
            None,
        );
        assert_eq!(row.slow_id_hex.as_deref(), Some("0x23"));
        assert_eq!(row.decoded_name.as_deref(), Some("InternalTemperature"));
        assert_eq!(row.decoded_value, Some(24.975));
        assert!(row
            .pretty_line(false)
            .ends_with("ch=1 slow_rx id=0x23 InternalTemperature=24.975°C crc_ok=true"));
    }

    #[test]
    fn slow_row_text_and_raw() {
        let diag = RecordRow::new(
            &record(SLOW_RECEPTION, &[0x00, 0x01, 0x00, 0x00, 0x40, 0x00]),
            None,
        );
        assert!(diag
            .pretty_line(false)
            .ends_with("id=0x01 DiagnosticCode: No error crc_ok=true"));

        let raw = RecordRow::new(
            &record(SLOW_RECEPTION, &[0x00, 0x29, 0xC8, 0x01, 0x40, 0x00]),
            None,
        );
        assert!(raw
            .pretty_line(false)
            .ends_with("id=0x29 SensorID_last3 raw=456 crc_ok=true"));
    }

    #[test]
    fn error_row_prints_details() {
        let row = RecordRow::new(&record(FAST_ERROR, &[0x00, 0x00]), None);
        let line = row.pretty_line(true);
        assert!(line.contains("fast_error CRC mismatch details={"));
        assert!(line.contains("\"errtype_text\":\"CRC mismatch\""));
        assert!(line.ends_with(" raw_payload=0000 msg=0x97"));
    }

    #[test]
    fn short_payload_row() {
        let row = RecordRow::new(&record(FAST_RECEPTION, &[0x00, 0x60]), None);
        assert_eq!(row.channel, None);
        assert!(row
            .pretty_line(false)
            .ends_with("ch=- fast_rx decode_error=\"payload too short (2 bytes, need at least 3)\" msg=0x95 data=0060"));

        let json: serde_json::Value = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json["decode_error"],
            "payload too short (2 bytes, need at least 3)"
        );
        assert!(json["status_nibble"].is_null());

        let ok = RecordRow::new(&record(FAST_RECEPTION, &[0x00, 0x00, 0x00]), None);
        assert!(serde_json::to_value(&ok).unwrap()["decode_error"].is_null());
    }

    #[test]
    fn unknown_message_row() {
        let row = RecordRow::new(&record(0x42, &[0xAB]), None);
        assert_eq!(row.kind, "other");
        assert!(row.pretty_line(false).ends_with("ch=- other msg=0x42 data=AB"));
    }

    #[test]
    fn state_columns() {
        let mut state = CorrelationState::new();
        state.update(&record(SLOW_RECEPTION, &[0x00, 0x2A, 0x7B, 0x00, 0x40, 0x00]));
        state.update(&record(SLOW_RECEPTION, &[0x00, 0x29, 0xC8, 0x01, 0x40, 0x00]));

        let row = RecordRow::new(&record(0x42, &[]), Some(&state));
        assert_eq!(row.state_serial_number.as_deref(), Some("123456"));
        assert_eq!(row.state_date_code, None);
        assert!(row.pretty_line(false).ends_with(" serial=123456"));
    }

    #[test]
    fn csv_header_matches_columns() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(RecordRow::default()).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, CSV_COLUMNS.join(","));
    }

    #[test]
    fn hex_is_uppercase() {
        assert_eq!(hex_upper(&[0x0a, 0xff, 0x00]), "0AFF00");
        assert_eq!(hex_upper(&[]), "");
    }
}
