//! Severity levels shared by loggers and handlers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LogConfigError;

/// Threshold severity for a logger or handler.
///
/// Numeric values follow the conventional 10-step ladder so that
/// `tracing` levels can be compared against them (see [`severity_of`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    pub fn severity(&self) -> u8 {
        *self as u8
    }

    /// Whether a record at `severity` passes this threshold.
    pub fn allows(&self, severity: u8) -> bool {
        severity >= self.severity()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LogConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "10" => Ok(Level::Debug),
            "INFO" | "20" => Ok(Level::Info),
            "WARNING" | "WARN" | "30" => Ok(Level::Warning),
            "ERROR" | "40" => Ok(Level::Error),
            "CRITICAL" | "FATAL" | "50" => Ok(Level::Critical),
            _ => Err(LogConfigError::invalid_level(s)),
        }
    }
}

/// Position of a `tracing` event level on the same ladder as [`Level`].
///
/// TRACE sits below DEBUG and never passes a configured threshold.
/// CRITICAL has no `tracing` counterpart.
pub fn severity_of(level: &tracing::Level) -> u8 {
    match *level {
        tracing::Level::TRACE => 5,
        tracing::Level::DEBUG => 10,
        tracing::Level::INFO => 20,
        tracing::Level::WARN => 30,
        tracing::Level::ERROR => 40,
    }
}

/// Level name as it appears in rendered records.
pub fn record_level_name(level: &tracing::Level) -> &'static str {
    match *level {
        tracing::Level::TRACE => "TRACE",
        tracing::Level::DEBUG => "DEBUG",
        tracing::Level::INFO => "INFO",
        tracing::Level::WARN => "WARNING",
        tracing::Level::ERROR => "ERROR",
    }
}
