//! Frame handling shared by `live` and `replay`.

use sentwire_decode::{decode_envelope, CorrelationState, DecodeOptions};
use sentwire_frame::EnvelopeFrame;
use tracing::warn;

use crate::exit::CliResult;
use crate::output::{print_record, OutputFormat, RecordRow};
use crate::sink::{CsvSink, RawCapture};

#[derive(Debug, Clone, Copy)]
pub struct ConsoleOptions {
    pub format: OutputFormat,
    pub quiet: bool,
    pub print_raw: bool,
    pub show_state: bool,
}

pub struct Pipeline {
    decode: DecodeOptions,
    console: ConsoleOptions,
    correlation: CorrelationState,
    raw: Option<RawCapture>,
    csv: Option<CsvSink<std::fs::File>>,
    seen: u64,
}

impl Pipeline {
    pub fn new(decode: DecodeOptions, console: ConsoleOptions) -> Self {
        Self {
            decode,
            console,
            correlation: CorrelationState::new(),
            raw: None,
            csv: None,
            seen: 0,
        }
    }

    pub fn with_raw_capture(mut self, capture: Option<RawCapture>) -> Self {
        self.raw = capture;
        self
    }

    pub fn with_csv(mut self, csv: Option<CsvSink<std::fs::File>>) -> Self {
        self.csv = csv;
        self
    }

    /// Capture, decode, correlate and emit one frame.
    pub fn handle(&mut self, frame: &EnvelopeFrame) -> CliResult<()> {
        if let Some(raw) = &mut self.raw {
            raw.write(frame)?;
        }

        if !frame.checksum_ok {
            warn!(
                message_id = frame.message_id,
                received = frame.checksum_received,
                computed = frame.checksum_computed,
                "envelope checksum mismatch"
            );
        }

        let record = decode_envelope(frame, &self.decode);
        self.correlation.update(&record);

        let state = (self.console.show_state && !self.correlation.is_empty())
            .then_some(&self.correlation);
        let row = RecordRow::new(&record, state);

        if let Some(csv) = &mut self.csv {
            csv.write(&row)?;
        }
        if !self.console.quiet {
            print_record(&row, self.console.format, self.console.print_raw);
        }

        self.seen += 1;
        Ok(())
    }

    /// Frames handled so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn correlation(&self) -> &CorrelationState {
        &self.correlation
    }
}

#[cfg(test)]
mod tests {
    use sentwire_frame::{build_frame, EnvelopeFramer, SLOW_RECEPTION};

    use super::*;

    fn quiet() -> ConsoleOptions {
        ConsoleOptions {
            format: OutputFormat::Json,
            quiet: true,
            print_raw: false,
            show_state: true,
        }
    }

    #[test]
    fn correlates_across_frames() {
        let mut wire = build_frame(SLOW_RECEPTION, &[0x00, 0x2A, 0x7B, 0x00, 0x40, 0x00])
            .unwrap()
            .to_vec();
        wire.extend_from_slice(
            &build_frame(SLOW_RECEPTION, &[0x00, 0x29, 0xC8, 0x01, 0x40, 0x00]).unwrap(),
        );
        // Corrupt the checksum of the second frame; it must still be handled.
        let chk = wire.len() - 2;
        wire[chk] ^= 0xFF;

        let mut pipeline = Pipeline::new(DecodeOptions::default(), quiet());
        for frame in EnvelopeFramer::new().feed(&wire) {
            pipeline.handle(&frame).unwrap();
        }

        assert_eq!(pipeline.seen(), 2);
        assert_eq!(
            pipeline.correlation().serial_number.as_deref(),
            Some("123456")
        );
    }
}
