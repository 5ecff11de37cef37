//! Error types for building and applying logging configurations

use std::path::PathBuf;

use thiserror::Error;

/// Unified error for the configuration helper.
///
/// Building a configuration fails before any global state is touched;
/// only [`LogConfigError::Io`] and [`LogConfigError::SubscriberConflict`]
/// can surface while a configuration is being installed.
#[derive(Error, Debug)]
pub enum LogConfigError {
    #[error("Improperly configured: {message}")]
    ImproperlyConfigured { message: String },

    #[error("Invalid handler specification: {message}")]
    InvalidHandlerSpec { message: String },

    #[error("Logger `{logger}` references undefined handler `{handler}`")]
    UnknownHandler { logger: String, handler: String },

    #[error("Handler `{handler}` references undefined formatter `{formatter}`")]
    UnknownFormatter { handler: String, formatter: String },

    #[error("Invalid format for `{formatter}`: {message}")]
    InvalidFormat { formatter: String, message: String },

    #[error("Unsupported configuration version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Invalid log level: {value}")]
    InvalidLevel { value: String },

    #[error("Cannot open log file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings error: {message}")]
    Settings { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Another global tracing subscriber is already installed")]
    SubscriberConflict,
}

impl LogConfigError {
    pub fn improperly_configured(message: impl Into<String>) -> Self {
        Self::ImproperlyConfigured { message: message.into() }
    }

    pub fn invalid_handler_spec(message: impl Into<String>) -> Self {
        Self::InvalidHandlerSpec { message: message.into() }
    }

    pub fn unknown_handler(logger: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::UnknownHandler {
            logger: logger.into(),
            handler: handler.into(),
        }
    }

    pub fn unknown_formatter(handler: impl Into<String>, formatter: impl Into<String>) -> Self {
        Self::UnknownFormatter {
            handler: handler.into(),
            formatter: formatter.into(),
        }
    }

    pub fn invalid_format(formatter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            formatter: formatter.into(),
            message: message.into(),
        }
    }

    pub fn invalid_level(value: impl Into<String>) -> Self {
        Self::InvalidLevel { value: value.into() }
    }

    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings { message: message.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for configuration operations
pub type LogConfigResult<T> = Result<T, LogConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_handler_message_names_both_sides() {
        let err = LogConfigError::unknown_handler("myapp", "audit");
        assert_eq!(
            err.to_string(),
            "Logger `myapp` references undefined handler `audit`"
        );
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error;

        let err = LogConfigError::io(
            "/nope/app.log",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/nope/app.log"));
        assert!(err.source().is_some());
    }
}
