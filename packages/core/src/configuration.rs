//! Declarative logging configuration.
//!
//! [`LoggingConfiguration`] mirrors the classic dictionary schema
//! (`version`, `formatters`, `handlers`, `root`, `loggers`) and
//! serializes to the same JSON shape:
//!
//! ```text
//! {
//!   "version": 1,
//!   "disable_existing_loggers": false,
//!   "formatters": { "simple": { "format": "{level}\t{target}:{line}\t{message}" }, ... },
//!   "handlers": { "default": { "class": "console", "level": "DEBUG", "formatter": "simple" } },
//!   "root": { "level": "WARNING", "handlers": ["default"] },
//!   "loggers": { "myapp": { "level": "INFO", "handlers": ["default"], "propagate": false } }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LogConfigError, LogConfigResult};
use crate::level::Level;
use crate::loggers::{build_logger_entries, LoggerEntry, DEFAULT_HANDLER};
use crate::names::normalize_package_names;

/// The only schema version understood by the registry.
pub const CONFIG_VERSION: u32 = 1;

pub const VERBOSE_FORMATTER: &str = "verbose";
pub const SIMPLE_FORMATTER: &str = "simple";

pub const VERBOSE_FORMAT: &str = "{level}\t{timestamp}\t{target}:{line}\t{message}";
pub const SIMPLE_FORMAT: &str = "{level}\t{target}:{line}\t{message}";

/// UTC timestamp with millisecond precision.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Prefix of the log file name written in file mode.
pub const LOG_FILE_PREFIX: &str = "app-";

/// Complete logging configuration, consumed by [`crate::registry::LoggingRegistry::install`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfiguration {
    pub version: u32,
    #[serde(default)]
    pub disable_existing_loggers: bool,
    #[serde(default)]
    pub formatters: BTreeMap<String, FormatterSpec>,
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerSpec>,
    pub root: RootSpec,
    #[serde(default)]
    pub loggers: BTreeMap<String, LoggerEntry>,
}

/// Rendering template for a log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatterSpec {
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datefmt: Option<String>,
}

/// A named output sink together with its threshold and formatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerSpec {
    #[serde(flatten)]
    pub kind: HandlerKind,
    pub level: Level,
    pub formatter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum HandlerKind {
    Console {
        #[serde(default)]
        stream: ConsoleStream,
    },
    /// File sink that reopens its target when the file is rotated away.
    WatchedFile { filename: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    #[default]
    Stderr,
    Stdout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSpec {
    pub level: Level,
    pub handlers: Vec<String>,
}

impl HandlerSpec {
    pub fn console(level: Level, formatter: impl Into<String>) -> Self {
        Self {
            kind: HandlerKind::Console {
                stream: ConsoleStream::default(),
            },
            level,
            formatter: formatter.into(),
        }
    }

    pub fn watched_file(level: Level, formatter: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            kind: HandlerKind::WatchedFile {
                filename: filename.into(),
            },
            level,
            formatter: formatter.into(),
        }
    }

    pub fn is_console(&self) -> bool {
        matches!(self.kind, HandlerKind::Console { .. })
    }

    pub fn filename(&self) -> Option<&Path> {
        match &self.kind {
            HandlerKind::WatchedFile { filename } => Some(filename),
            HandlerKind::Console { .. } => None,
        }
    }
}

impl LoggingConfiguration {
    pub fn to_json_pretty(&self) -> LogConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a configuration written by hand or by `to_json_pretty`.
    pub fn from_json(json: &str) -> LogConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file.
    pub fn from_json_file(path: &Path) -> LogConfigResult<Self> {
        let json = fs::read_to_string(path).map_err(|err| LogConfigError::io(path, err))?;
        Self::from_json(&json)
    }

    /// Add or replace a handler definition.
    #[cfg(test)]
    pub(crate) fn with_handler(mut self, name: impl Into<String>, handler: HandlerSpec) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Add or replace logger definitions.
    pub fn with_loggers(mut self, loggers: BTreeMap<String, LoggerEntry>) -> Self {
        self.loggers.extend(loggers);
        self
    }
}

fn default_formatters() -> BTreeMap<String, FormatterSpec> {
    BTreeMap::from([
        (
            VERBOSE_FORMATTER.to_string(),
            FormatterSpec {
                format: VERBOSE_FORMAT.to_string(),
                datefmt: Some(DEFAULT_DATE_FORMAT.to_string()),
            },
        ),
        (
            SIMPLE_FORMATTER.to_string(),
            FormatterSpec {
                format: SIMPLE_FORMAT.to_string(),
                datefmt: None,
            },
        ),
    ])
}

/// Build a complete configuration for the given packages.
///
/// Without `file_path` the `default` handler logs to the console at DEBUG,
/// leaving the per-package loggers to do the filtering. With `file_path`
/// it becomes a watched file handler at `level` with the verbose format.
/// Package names are collapsed to their top-level namespaces.
pub fn build_logging_configuration<I, S>(
    level: Level,
    names: I,
    verbose: bool,
    file_path: Option<&Path>,
) -> LogConfigResult<LoggingConfiguration>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let default_handler = match file_path {
        Some(path) => HandlerSpec::watched_file(level, VERBOSE_FORMATTER, path),
        None if verbose => HandlerSpec::console(Level::Debug, VERBOSE_FORMATTER),
        None => HandlerSpec::console(Level::Debug, SIMPLE_FORMATTER),
    };

    let loggers = build_logger_entries(level, normalize_package_names(names), None)?;

    Ok(LoggingConfiguration {
        version: CONFIG_VERSION,
        disable_existing_loggers: false,
        formatters: default_formatters(),
        handlers: BTreeMap::from([(DEFAULT_HANDLER.to_string(), default_handler)]),
        root: RootSpec {
            level: Level::Warning,
            handlers: vec![DEFAULT_HANDLER.to_string()],
        },
        loggers,
    })
}

/// Path of the file-mode log: `<directory>/app-<basename of base_path>.log`.
pub fn log_file_path(directory: &Path, base_path: &Path) -> PathBuf {
    let basename = base_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string());

    directory.join(format!("{}{}.log", LOG_FILE_PREFIX, basename))
}
