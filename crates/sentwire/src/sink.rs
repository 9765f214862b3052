//! File outputs: raw frame capture and decoded CSV rows.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use sentwire_frame::EnvelopeFrame;
use tracing::info;

use crate::exit::{csv_error, io_error, CliResult};
use crate::output::{hex_upper, RecordRow, CSV_COLUMNS};

const RAW_CSV_HEADER: [&str; 4] = ["pc_time_unix", "msg_id_hex", "len", "raw_hex"];

#[derive(Clone, Debug, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RawFormat {
    /// Frames exactly as received; replayable.
    #[default]
    Bin,
    /// One text line per frame.
    Hex,
    Csv,
}

/// Appends every received frame, envelope included, to a capture file.
pub enum RawCapture {
    Bin(File),
    Hex(File),
    Csv(csv::Writer<File>),
}

impl RawCapture {
    pub fn open(path: &Path, format: RawFormat) -> CliResult<Self> {
        create_parent(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| io_error(&format!("open {}", path.display()), err))?;
        let fresh = file
            .metadata()
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);

        info!(path = %path.display(), ?format, "raw capture enabled");
        Ok(match format {
            RawFormat::Bin => RawCapture::Bin(file),
            RawFormat::Hex => RawCapture::Hex(file),
            RawFormat::Csv => {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(file);
                if fresh {
                    writer
                        .write_record(RAW_CSV_HEADER)
                        .map_err(|err| csv_error("raw capture header", err))?;
                }
                RawCapture::Csv(writer)
            }
        })
    }

    pub fn write(&mut self, frame: &EnvelopeFrame) -> CliResult<()> {
        let context = "raw capture write";
        match self {
            RawCapture::Bin(file) => {
                file.write_all(&frame.raw)
                    .and_then(|()| file.flush())
                    .map_err(|err| io_error(context, err))?;
            }
            RawCapture::Hex(file) => {
                let line = format!(
                    "{:.6} 0x{:02X} {} {}\n",
                    unix_seconds(),
                    frame.message_id,
                    frame.raw.len(),
                    hex_upper(&frame.raw)
                );
                file.write_all(line.as_bytes())
                    .and_then(|()| file.flush())
                    .map_err(|err| io_error(context, err))?;
            }
            RawCapture::Csv(writer) => {
                writer
                    .write_record([
                        format!("{:.6}", unix_seconds()),
                        format!("0x{:02X}", frame.message_id),
                        frame.raw.len().to_string(),
                        hex_upper(&frame.raw),
                    ])
                    .map_err(|err| csv_error(context, err))?;
                writer.flush().map_err(|err| io_error(context, err))?;
            }
        }
        Ok(())
    }
}

/// Decoded rows as CSV, header written on creation.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    pub fn create(path: &Path, delimiter: u8) -> CliResult<Self> {
        create_parent(path)?;
        let file =
            File::create(path).map_err(|err| io_error(&format!("create {}", path.display()), err))?;
        info!(path = %path.display(), "decoded csv enabled");
        Self::new(file, delimiter)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W, delimiter: u8) -> CliResult<Self> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(inner);
        writer
            .write_record(CSV_COLUMNS)
            .map_err(|err| csv_error("csv header", err))?;
        Ok(Self { writer })
    }

    pub fn write(&mut self, row: &RecordRow) -> CliResult<()> {
        self.writer
            .serialize(row)
            .map_err(|err| csv_error("csv write", err))?;
        self.writer
            .flush()
            .map_err(|err| io_error("csv flush", err))
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(inner) => inner,
            Err(err) => panic!("csv flush failed: {err}"),
        }
    }
}

/// Parse a single-byte CSV separator.
pub fn parse_separator(value: &str) -> Result<u8, String> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        b"\\t" => Ok(b'\t'),
        _ => Err(format!("separator must be one ASCII character, got {value:?}")),
    }
}

fn create_parent(path: &Path) -> CliResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|err| io_error(&format!("create {}", parent.display()), err)),
        _ => Ok(()),
    }
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
