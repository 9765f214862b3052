mod cmd;
mod exit;
mod logging;
mod output;
mod pipeline;
mod sink;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "sentwire",
    version,
    about = "SENT (SAE J2716) decoder for the Mach Systems interface box"
)]
struct Cli {
    /// Record output format (default: pretty on a terminal, json otherwise).
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RawFormat;

    #[test]
    fn parses_live_tcp() {
        let cli = Cli::try_parse_from([
            "sentwire",
            "--format",
            "pretty",
            "live",
            "--tcp",
            "192.168.1.100:8000",
            "--all-channels",
            "--raw-out",
            "cap.hex",
            "--raw-format",
            "hex",
            "--csv-sep",
            ";",
        ])
        .expect("live args should parse");

        let Command::Live(args) = cli.command else {
            panic!("expected live");
        };
        assert_eq!(args.tcp.as_deref(), Some("192.168.1.100:8000"));
        assert!(args.all_channels);
        assert_eq!(args.raw_format, RawFormat::Hex);
        assert_eq!(args.output.csv_sep, b';');
        assert_eq!(args.baud, 115_200);
        assert_eq!(cli.format, Some(OutputFormat::Pretty));
    }

    #[test]
    fn live_requires_a_link() {
        let err = Cli::try_parse_from(["sentwire", "live", "--count", "1"])
            .expect_err("missing link should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_both_links() {
        let err = Cli::try_parse_from([
            "sentwire", "live", "--serial", "COM7", "--tcp", "localhost",
        ])
        .expect_err("conflicting links should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_channel_out_of_range() {
        let err = Cli::try_parse_from(["sentwire", "live", "--tcp", "h", "--channel", "4"])
            .expect_err("channel 4 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_replay() {
        let cli = Cli::try_parse_from([
            "sentwire",
            "replay",
            "capture.bin",
            "--swap-fast-data-nibbles",
            "--show-state",
            "--count",
            "10",
        ])
        .expect("replay args should parse");

        let Command::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert!(args.output.swap_fast_data_nibbles);
        assert_eq!(args.output.count, Some(10));
        assert_eq!(
            args.output.decode_options().nibble_order,
            sentwire_decode::NibbleOrder::HighFirst
        );
    }
}
