//! Per-package logger entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LogConfigError, LogConfigResult};
use crate::level::Level;
use crate::names::NameList;

/// Name of the handler every generated logger writes to unless told otherwise.
pub const DEFAULT_HANDLER: &str = "default";

/// Configuration of a single named logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerEntry {
    pub level: Level,
    pub handlers: Vec<String>,
    #[serde(default)]
    pub propagate: bool,
}

impl LoggerEntry {
    /// Non-propagating entry writing to `handlers`.
    pub fn new(level: Level, handlers: Vec<String>) -> Self {
        Self {
            level,
            handlers,
            propagate: false,
        }
    }
}

/// Resolve an optional handler specification to the list stored on each entry.
///
/// `None` means `["default"]`. An empty list or a blank name is rejected.
pub fn resolve_handlers(handlers: Option<NameList>) -> LogConfigResult<Vec<String>> {
    let handlers = match handlers {
        Some(handlers) => handlers.into_vec(),
        None => return Ok(vec![DEFAULT_HANDLER.to_string()]),
    };

    if handlers.is_empty() {
        return Err(LogConfigError::invalid_handler_spec(
            "at least one handler name is required",
        ));
    }
    if let Some(blank) = handlers.iter().position(|h| h.trim().is_empty()) {
        return Err(LogConfigError::invalid_handler_spec(format!(
            "handler name at position {} is empty",
            blank
        )));
    }

    Ok(handlers)
}

/// Build one non-propagating [`LoggerEntry`] per package name.
///
/// Package names are used as given; normalize them first with
/// [`crate::names::normalize_package_names`] when only top-level
/// namespaces should be configured.
pub fn build_logger_entries<I, S>(
    level: Level,
    names: I,
    handlers: Option<NameList>,
) -> LogConfigResult<BTreeMap<String, LoggerEntry>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let handlers = resolve_handlers(handlers)?;

    Ok(names
        .into_iter()
        .map(|name| (name.into(), LoggerEntry::new(level, handlers.clone())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_package_list_yields_no_entries() {
        let loggers = build_logger_entries(Level::Debug, Vec::<String>::new(), None).unwrap();
        assert!(loggers.is_empty());
    }

    #[test]
    fn entries_use_default_handler() {
        let loggers = build_logger_entries(Level::Info, ["a", "b"], None).unwrap();

        assert_eq!(loggers.len(), 2);
        for (name, entry) in &loggers {
            assert!(name == "a" || name == "b");
            assert_eq!(entry.level, Level::Info);
            assert_eq!(entry.handlers, vec!["default".to_string()]);
            assert!(!entry.propagate);
        }
    }

    #[test]
    fn custom_handler_list_is_kept() {
        let handlers = NameList::from(vec!["handler1", "handler2"]);
        let loggers = build_logger_entries(Level::Info, ["framework"], Some(handlers)).unwrap();

        assert_eq!(loggers["framework"].handlers, vec!["handler1", "handler2"]);
    }

    #[test]
    fn string_handler_is_a_single_name() {
        let loggers =
            build_logger_entries(Level::Info, ["a"], Some(NameList::from("custom"))).unwrap();

        assert_eq!(loggers["a"].handlers, vec!["custom".to_string()]);
    }

    #[test]
    fn empty_handler_list_is_rejected() {
        let err = build_logger_entries(Level::Info, ["a"], Some(NameList::new())).unwrap_err();
        assert!(matches!(err, LogConfigError::InvalidHandlerSpec { .. }));
    }

    #[test]
    fn blank_handler_name_is_rejected() {
        let err = build_logger_entries(Level::Info, ["a"], Some(NameList::from(vec!["ok", " "])))
            .unwrap_err();
        assert!(matches!(err, LogConfigError::InvalidHandlerSpec { .. }));
    }

    #[test]
    fn propagate_key_is_spelled_correctly() {
        let entry = LoggerEntry::new(Level::Warning, vec!["default".to_string()]);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["propagate"], serde_json::Value::Bool(false));
        assert!(json.get("propogate").is_none());
    }
}
