//! # Logging
//!
//! Log level handling and tracing subscriber setup.
//!
//! Levels follow the whereabouts convention: `debug`, `verbose`, `error` and
//! `panic`. They map onto tracing levels as DEBUG, INFO, ERROR and off.

use crate::constants::LOG_TARGET;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Everything, including cleaned-up addresses
    Debug,
    /// Informational messages such as ignored known errors
    Verbose,
    /// Only errors
    Error,
    /// Nothing is logged
    Panic,
}

#[derive(Debug, Error)]
#[error("unrecognized log level {0:?}, valid values are \"debug\", \"verbose\", \"error\" and \"panic\"")]
pub struct UnknownLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "verbose" => Ok(LogLevel::Verbose),
            "error" => Ok(LogLevel::Error),
            "panic" => Ok(LogLevel::Panic),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
            LogLevel::Error => "error",
            LogLevel::Panic => "panic",
        })
    }
}

impl LogLevel {
    /// Default directive for this crate, e.g. `ip_reconciler=info`
    #[must_use]
    pub fn directive(self) -> String {
        let level = match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "info",
            LogLevel::Error => "error",
            LogLevel::Panic => "off",
        };
        format!("{LOG_TARGET}={level}")
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level.directive().into());

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("tracing subscriber already initialized: {e}");
    }
}
