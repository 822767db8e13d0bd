//! Builds the `slog` loggers used by the harness binaries and their tests.
//!
//! Logs always go to stderr: stdout is reserved for the single-line verdict a flag binary prints.

use slog::{o, Drain, Level, Logger};
use sloggers::{null::NullLoggerBuilder, Build};
use std::str::FromStr;

/// Output format of the root logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Terminal,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(LogFormat::Terminal),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Logging format {} is not supported", other)),
        }
    }
}

/// Builds the root logger.
///
/// The logger is "async": records are handed to a dedicated thread which formats and flushes
/// them, so the subprocess polling loop never waits on stderr.
pub fn build_logger(level: Option<Level>, format: LogFormat) -> Result<Logger, String> {
    let level = match level {
        Some(level) => level,
        None => return null_logger(),
    };

    let drain = match format {
        LogFormat::Json => {
            let drain = slog_json::Json::default(std::io::stderr()).fuse();
            slog_async::Async::new(drain).build()
        }
        LogFormat::Terminal => {
            let decorator = slog_term::TermDecorator::new().stderr().build();
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            slog_async::Async::new(drain).build()
        }
    };

    Ok(Logger::root(drain.filter_level(level).fuse(), o!()))
}

/// A logger which discards everything.
pub fn null_logger() -> Result<Logger, String> {
    NullLoggerBuilder
        .build()
        .map_err(|e| format!("Failed to start null logger: {:?}", e))
}

/// Return a logger suitable for test usage.
///
/// Silent by default; build with `--features logging/test_logger` to see debug output.
pub fn test_logger() -> Logger {
    if cfg!(feature = "test_logger") {
        sloggers::terminal::TerminalLoggerBuilder::new()
            .level(sloggers::types::Severity::Debug)
            .destination(sloggers::terminal::Destination::Stderr)
            .build()
            .expect("Should build test_logger")
    } else {
        NullLoggerBuilder.build().expect("Should build null_logger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse() {
        assert_eq!("json".parse(), Ok(LogFormat::Json));
        assert_eq!("Terminal".parse(), Ok(LogFormat::Terminal));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn disabled_level_builds_null_logger() {
        let log = build_logger(None, LogFormat::Terminal).unwrap();
        slog::info!(log, "discarded"; "n" => 1);
    }
}
