use clap::{ArgGroup, Args, Subcommand};
use std::path::PathBuf;

use sentwire_decode::{DecodeOptions, NibbleOrder};

use crate::exit::CliResult;
use crate::output::OutputFormat;
use crate::pipeline::ConsoleOptions;
use crate::sink::{parse_separator, RawFormat};

pub mod live;
pub mod replay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read SENT frames from the interface box and print decoded records.
    Live(LiveArgs),
    /// Decode a raw `bin` capture file.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Live(args) => live::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Decoding and console/CSV output flags shared by `live` and `replay`.
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Fast data nibbles sit high-nibble-first inside each byte.
    #[arg(long)]
    pub swap_fast_data_nibbles: bool,
    /// Write decoded rows to a CSV file.
    #[arg(long, value_name = "PATH")]
    pub out_csv: Option<PathBuf>,
    /// CSV separator (use ';' for spreadsheet locales with decimal commas).
    #[arg(long, default_value = ",", value_parser = parse_separator)]
    pub csv_sep: u8,
    /// Do not print records to the console.
    #[arg(long)]
    pub quiet: bool,
    /// Also print the raw payload hex on each console line.
    #[arg(long)]
    pub print_raw: bool,
    /// Include the assembled serial number and date code once known.
    #[arg(long)]
    pub show_state: bool,
    /// Exit after N frames.
    #[arg(long)]
    pub count: Option<u64>,
}

impl OutputArgs {
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            nibble_order: if self.swap_fast_data_nibbles {
                NibbleOrder::HighFirst
            } else {
                NibbleOrder::LowFirst
            },
        }
    }

    pub fn console(&self, format: OutputFormat) -> ConsoleOptions {
        ConsoleOptions {
            format,
            quiet: self.quiet,
            print_raw: self.print_raw,
            show_state: self.show_state,
        }
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("link").required(true).args(["serial", "tcp"])))]
pub struct LiveArgs {
    /// Serial port of the interface box (e.g. /dev/ttyUSB0, COM7).
    #[arg(long, env = "SENTWIRE_SERIAL", value_name = "PORT")]
    pub serial: Option<String>,
    /// TCP endpoint of the interface box, host[:port] (port defaults to 8000).
    #[arg(long, env = "SENTWIRE_TCP", value_name = "HOST[:PORT]")]
    pub tcp: Option<String>,
    /// Serial baud rate.
    #[arg(long, env = "SENTWIRE_BAUD", default_value_t = 115_200)]
    pub baud: u32,
    /// SENT channel index, 0-based.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub channel: u8,
    /// Start/stop all channels instead of --channel.
    #[arg(long)]
    pub all_channels: bool,
    /// Only listen; do not send SENT_START on connect.
    #[arg(long)]
    pub no_start: bool,
    /// Send SENT_STOP when exiting.
    #[arg(long)]
    pub stop_on_exit: bool,
    /// Stop after N seconds (default: run until Ctrl+C).
    #[arg(long, value_name = "SECONDS")]
    pub duration: Option<f64>,
    /// Append every received frame, envelope included, to a file.
    #[arg(long, value_name = "PATH")]
    pub raw_out: Option<PathBuf>,
    /// Format of the --raw-out file.
    #[arg(long, value_enum, default_value_t = RawFormat::Bin)]
    pub raw_format: RawFormat,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Raw capture written by `live --raw-out PATH --raw-format bin`.
    pub path: PathBuf,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
