use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

// Our own crates follow --log-level; dependencies stay at warn.
fn targets(level: LogLevel) -> Targets {
    let level = level.as_filter();
    Targets::new()
        .with_default(LevelFilter::WARN.min(level))
        .with_target("sentwire", level)
        .with_target("sentwire_transport", level)
        .with_target("sentwire_frame", level)
        .with_target("sentwire_decode", level)
}

pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = targets(level);
    let registry = tracing_subscriber::registry();

    match format {
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false);
            let _ = registry.with(layer.with_filter(filter)).try_init();
        }
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(std::io::stderr);
            let _ = registry.with(layer.with_filter(filter)).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_crates_follow_level() {
        let filter = targets(LogLevel::Trace);
        assert!(filter.would_enable("sentwire_frame::codec", &tracing::Level::TRACE));
        assert!(!filter.would_enable("serialport", &tracing::Level::DEBUG));
        assert!(filter.would_enable("serialport", &tracing::Level::WARN));
    }

    #[test]
    fn quiet_level_applies_everywhere() {
        let filter = targets(LogLevel::Error);
        assert!(!filter.would_enable("sentwire", &tracing::Level::WARN));
        assert!(!filter.would_enable("serialport", &tracing::Level::WARN));
    }
}
