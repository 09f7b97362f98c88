//! The `LogLevel` configuration key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logging verbosity, recognized by the `LogLevel` configuration key.
///
/// Includes `Fatal` and `Panic` above `tracing`'s own `Level` ladder because
/// the source system distinguishes "fatal and about to exit" from ordinary
/// errors; we map both onto `tracing::Level::ERROR` with an extra field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose diagnostic output, off by default.
    Debug,
    /// Routine operational messages.
    #[default]
    Info,
    /// Recoverable but noteworthy conditions.
    Warn,
    /// Failed operations that did not bring the process down.
    Error,
    /// An error severe enough that the process is about to exit.
    Fatal,
    /// Synonym for `Fatal`, accepted as an alternate spelling for the same
    /// severity.
    Panic,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Panic => "panic",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            "panic" => Ok(LogLevel::Panic),
            other => Err(format!("unrecognized log level {other:?}")),
        }
    }
}

impl LogLevel {
    /// The `tracing` level this maps onto. `Fatal` and `Panic` both map to
    /// `ERROR`; the distinction only matters to the process-exit behavior
    /// the caller wires up around it, not to the subscriber's filter.
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("Fatal".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
    }

    #[test]
    fn rejects_unknown_level() {
        assert!("verbose".parse::<LogLevel>().is_err());
    }
}
