//! Process-wide logging registry.
//!
//! The registry owns the active handler and logger tables and routes
//! `tracing` events through them. It is attached once as a layer on the
//! global `tracing_subscriber` registry; every later install only swaps
//! the tables, so logging can be reconfigured any number of times.
//!
//! Installing a configuration happens in two phases. [`LoggingRegistry::install`]
//! first validates the configuration and opens every sink without touching
//! the active tables; only when that succeeds are the tables replaced.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::configuration::{LoggingConfiguration, CONFIG_VERSION};
use crate::error::{LogConfigError, LogConfigResult};
use crate::format::{Record, Template};
use crate::level::{record_level_name, severity_of, Level};
use crate::sink::Sink;

const ROOT_LOGGER: &str = "root";

#[derive(Debug)]
struct Handler {
    name: String,
    level: Level,
    formatter: String,
    template: Template,
    sink: Sink,
}

#[derive(Debug, Clone)]
struct LoggerNode {
    level: Level,
    handlers: Vec<Arc<Handler>>,
    propagate: bool,
}

#[derive(Debug)]
struct ActiveTables {
    root: LoggerNode,
    loggers: BTreeMap<String, LoggerNode>,
    disabled: BTreeSet<String>,
}

impl Default for ActiveTables {
    fn default() -> Self {
        Self {
            root: LoggerNode {
                level: Level::Warning,
                handlers: Vec::new(),
                propagate: false,
            },
            loggers: BTreeMap::new(),
            disabled: BTreeSet::new(),
        }
    }
}

/// Read-only view of a configured handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerView {
    pub name: String,
    pub kind: &'static str,
    pub level: Level,
    pub formatter: String,
    pub filename: Option<PathBuf>,
}

/// Read-only view of a configured logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerView {
    pub name: String,
    pub level: Level,
    pub handlers: Vec<HandlerView>,
    pub propagate: bool,
}

impl HandlerView {
    fn of(handler: &Handler) -> Self {
        let filename = match &handler.sink {
            Sink::WatchedFile(file) => Some(
                file.lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .path()
                    .to_path_buf(),
            ),
            Sink::Console(_) => None,
        };

        Self {
            name: handler.name.clone(),
            kind: handler.sink.kind_name(),
            level: handler.level,
            formatter: handler.formatter.clone(),
            filename,
        }
    }
}

impl LoggerView {
    fn of(name: &str, node: &LoggerNode) -> Self {
        Self {
            name: name.to_string(),
            level: node.level,
            handlers: node.handlers.iter().map(|h| HandlerView::of(h)).collect(),
            propagate: node.propagate,
        }
    }
}

/// Holder of the active logging configuration.
#[derive(Debug, Default)]
pub struct LoggingRegistry {
    tables: RwLock<ActiveTables>,
    attached: Mutex<bool>,
}

static GLOBAL: OnceLock<Arc<LoggingRegistry>> = OnceLock::new();

impl LoggingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by the `configure_*` entry points.
    pub fn global() -> &'static Arc<LoggingRegistry> {
        GLOBAL.get_or_init(|| Arc::new(LoggingRegistry::new()))
    }

    /// A `tracing` layer that routes events through this registry.
    pub fn layer(self: &Arc<Self>) -> RegistryLayer {
        RegistryLayer {
            registry: Arc::clone(self),
        }
    }

    /// Validate `config`, open its sinks and make it the active configuration.
    ///
    /// On error the previously active configuration stays in place.
    pub fn install(&self, config: LoggingConfiguration) -> LogConfigResult<()> {
        let next = prepare(&config)?;
        self.swap(next, config.disable_existing_loggers);
        Ok(())
    }

    /// Like [`LoggingRegistry::install`], attaching this registry as the
    /// global `tracing` subscriber first if it is not attached yet.
    pub fn install_global(self: &Arc<Self>, config: LoggingConfiguration) -> LogConfigResult<()> {
        let next = prepare(&config)?;
        self.attach_global()?;
        self.swap(next, config.disable_existing_loggers);
        Ok(())
    }

    fn swap(&self, mut next: ActiveTables, disable_existing_loggers: bool) {
        let mut tables = self.tables.write().unwrap_or_else(|p| p.into_inner());
        if disable_existing_loggers {
            next.disabled = tables
                .loggers
                .keys()
                .chain(tables.disabled.iter())
                .filter(|name| !next.loggers.contains_key(*name))
                .cloned()
                .collect();
        }
        *tables = next;
    }

    fn attach_global(self: &Arc<Self>) -> LogConfigResult<()> {
        let mut attached = self.attached.lock().unwrap_or_else(|p| p.into_inner());
        if *attached {
            return Ok(());
        }

        let subscriber = tracing_subscriber::registry().with(self.layer());
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|_| LogConfigError::SubscriberConflict)?;

        *attached = true;
        Ok(())
    }

    /// The logger configured under exactly `name`.
    pub fn logger(&self, name: &str) -> Option<LoggerView> {
        let tables = self.tables.read().unwrap_or_else(|p| p.into_inner());
        tables
            .loggers
            .get(name)
            .map(|node| LoggerView::of(name, node))
    }

    /// The logger that handles events for `target`, falling back to root.
    pub fn effective_logger(&self, target: &str) -> LoggerView {
        let tables = self.tables.read().unwrap_or_else(|p| p.into_inner());
        match matching_loggers(&tables, target).first() {
            Some((name, node)) => LoggerView::of(name, node),
            None => LoggerView::of(ROOT_LOGGER, &tables.root),
        }
    }

    pub fn root(&self) -> LoggerView {
        let tables = self.tables.read().unwrap_or_else(|p| p.into_inner());
        LoggerView::of(ROOT_LOGGER, &tables.root)
    }

    pub fn logger_names(&self) -> Vec<String> {
        let tables = self.tables.read().unwrap_or_else(|p| p.into_inner());
        tables.loggers.keys().cloned().collect()
    }

    /// Whether an event at `metadata` would reach at least one handler.
    pub fn accepts(&self, metadata: &Metadata<'_>) -> bool {
        let severity = severity_of(metadata.level());
        let tables = self.tables.read().unwrap_or_else(|p| p.into_inner());
        route(&tables, metadata.target(), severity)
            .iter()
            .any(|h| h.level.allows(severity))
    }

    fn dispatch(&self, metadata: &Metadata<'_>, message: &str) {
        let severity = severity_of(metadata.level());
        let handlers = {
            let tables = self.tables.read().unwrap_or_else(|p| p.into_inner());
            route(&tables, metadata.target(), severity)
        };

        let record = Record {
            level: record_level_name(metadata.level()),
            target: metadata.target(),
            module: metadata.module_path(),
            line: metadata.line(),
            message,
            timestamp: Utc::now(),
        };

        for handler in handlers.iter().filter(|h| h.level.allows(severity)) {
            let line = handler.template.render(&record);
            if let Err(err) = handler.sink.write_line(&line) {
                // Reporting through tracing would re-enter this registry.
                eprintln!("logging handler `{}` failed: {}", handler.name, err);
            }
        }
    }
}

fn prepare(config: &LoggingConfiguration) -> LogConfigResult<ActiveTables> {
    if config.version != CONFIG_VERSION {
        return Err(LogConfigError::UnsupportedVersion {
            version: config.version,
        });
    }

    let mut templates = BTreeMap::new();
    for (name, spec) in &config.formatters {
        templates.insert(name.as_str(), Template::compile(name, spec)?);
    }

    // Check every reference before any file is opened.
    for (name, spec) in &config.handlers {
        if !templates.contains_key(spec.formatter.as_str()) {
            return Err(LogConfigError::unknown_formatter(name, &spec.formatter));
        }
    }
    let references = std::iter::once((ROOT_LOGGER, &config.root.handlers)).chain(
        config
            .loggers
            .iter()
            .map(|(name, entry)| (name.as_str(), &entry.handlers)),
    );
    for (logger, handlers) in references {
        if let Some(missing) = handlers.iter().find(|h| !config.handlers.contains_key(*h)) {
            return Err(LogConfigError::unknown_handler(logger, missing));
        }
    }

    let mut handlers = BTreeMap::new();
    for (name, spec) in &config.handlers {
        let template = templates[spec.formatter.as_str()].clone();
        handlers.insert(
            name.clone(),
            Arc::new(Handler {
                name: name.clone(),
                level: spec.level,
                formatter: spec.formatter.clone(),
                template,
                sink: Sink::open(&spec.kind)?,
            }),
        );
    }

    let resolve = |names: &[String]| -> Vec<Arc<Handler>> {
        names
            .iter()
            .filter_map(|name| handlers.get(name).cloned())
            .collect()
    };

    Ok(ActiveTables {
        root: LoggerNode {
            level: config.root.level,
            handlers: resolve(config.root.handlers.as_slice()),
            propagate: false,
        },
        loggers: config
            .loggers
            .iter()
            .map(|(name, entry)| {
                (
                    name.clone(),
                    LoggerNode {
                        level: entry.level,
                        handlers: resolve(entry.handlers.as_slice()),
                        propagate: entry.propagate,
                    },
                )
            })
            .collect(),
        disabled: BTreeSet::new(),
    })
}

/// Whether logger `name` covers `target` (`a` covers `a`, `a.b` and `a::b`).
fn covers(name: &str, target: &str) -> bool {
    match target.strip_prefix(name) {
        Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with("::"),
        None => false,
    }
}

/// Loggers covering `target`, most specific first.
fn matching_loggers<'a>(tables: &'a ActiveTables, target: &str) -> Vec<(&'a str, &'a LoggerNode)> {
    let mut matches: Vec<_> = tables
        .loggers
        .iter()
        .filter(|(name, _)| covers(name, target))
        .map(|(name, node)| (name.as_str(), node))
        .collect();
    matches.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    matches
}

/// Handlers that receive an event, before per-handler level filtering.
fn route(tables: &ActiveTables, target: &str, severity: u8) -> Vec<Arc<Handler>> {
    let chain = matching_loggers(tables, target);

    let specific = chain.first().map(|(name, _)| name.len());
    let disabled = tables
        .disabled
        .iter()
        .filter(|name| covers(name, target))
        .map(|name| name.len())
        .max();
    if let Some(disabled_len) = disabled {
        if specific.map_or(true, |len| disabled_len > len) {
            return Vec::new();
        }
    }

    let effective = chain.first().map_or(&tables.root, |(_, node)| *node);
    if !effective.level.allows(severity) {
        return Vec::new();
    }

    let mut handlers: Vec<Arc<Handler>> = Vec::new();
    let mut push = |list: &[Arc<Handler>]| {
        for handler in list {
            if !handlers.iter().any(|h| Arc::ptr_eq(h, handler)) {
                handlers.push(Arc::clone(handler));
            }
        }
    };

    let mut reaches_root = true;
    for (_, node) in &chain {
        push(node.handlers.as_slice());
        if !node.propagate {
            reaches_root = false;
            break;
        }
    }
    if reaches_root {
        push(tables.root.handlers.as_slice());
    }

    handlers
}

/// `tracing` layer forwarding events to a [`LoggingRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryLayer {
    registry: Arc<LoggingRegistry>,
}

impl<S: Subscriber> Layer<S> for RegistryLayer {
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        // The tables can be swapped at any time.
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.registry.accepts(metadata)
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.registry.dispatch(event.metadata(), &visitor.finish());
    }
}

/// Collects the `message` field followed by the other fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(mut self) -> String {
        self.message.push_str(&self.fields);
        self.message
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{build_logging_configuration, FormatterSpec, HandlerSpec};
    use crate::loggers::{build_logger_entries, LoggerEntry};
    use crate::names::NameList;
    use std::path::Path;

    fn file_config(dir: &Path, level: Level, packages: &[&str]) -> LoggingConfiguration {
        build_logging_configuration(level, packages, false, Some(&dir.join("app-test.log"))).unwrap()
    }

    fn read_log(dir: &Path) -> String {
        std::fs::read_to_string(dir.join("app-test.log")).unwrap()
    }

    fn with_registry(registry: &Arc<LoggingRegistry>, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(registry.layer());
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn covers_matches_dotted_and_module_paths() {
        assert!(covers("myapp", "myapp"));
        assert!(covers("myapp", "myapp::views"));
        assert!(covers("myapp", "myapp.views"));
        assert!(!covers("myapp", "myapplication"));
        assert!(!covers("myapp", "other::myapp"));
    }

    #[test]
    fn installed_logger_is_visible() {
        let registry = LoggingRegistry::new();
        let config = build_logging_configuration(Level::Info, ["myapp.views"], false, None).unwrap();
        registry.install(config).unwrap();

        let logger = registry.logger("myapp").unwrap();
        assert_eq!(logger.level, Level::Info);
        assert!(!logger.propagate);
        assert_eq!(logger.handlers.len(), 1);
        assert_eq!(logger.handlers[0].name, "default");
        assert_eq!(logger.handlers[0].kind, "console");
        assert!(registry.logger("myapp.views").is_none());
        assert_eq!(registry.effective_logger("myapp::views").name, "myapp");
    }

    #[test]
    fn unknown_handler_keeps_previous_configuration() {
        let registry = LoggingRegistry::new();
        registry
            .install(build_logging_configuration(Level::Info, ["first"], false, None).unwrap())
            .unwrap();

        let broken = build_logging_configuration(Level::Info, Vec::<String>::new(), false, None)
            .unwrap()
            .with_loggers(
                build_logger_entries(Level::Info, ["second"], Some(NameList::from("audit")))
                    .unwrap(),
            );
        let err = registry.install(broken).unwrap_err();

        assert!(matches!(err, LogConfigError::UnknownHandler { .. }));
        assert!(registry.logger("first").is_some());
        assert!(registry.logger("second").is_none());
    }

    #[test]
    fn unknown_formatter_is_rejected() {
        let config = build_logging_configuration(Level::Info, ["a"], false, None)
            .unwrap()
            .with_handler("extra", HandlerSpec::console(Level::Info, "fancy"));

        let err = LoggingRegistry::new().install(config).unwrap_err();
        assert!(matches!(err, LogConfigError::UnknownFormatter { .. }));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut config = build_logging_configuration(Level::Info, ["a"], false, None).unwrap();
        config.version = 2;

        let err = LoggingRegistry::new().install(config).unwrap_err();
        assert!(matches!(err, LogConfigError::UnsupportedVersion { version: 2 }));
    }

    #[test]
    fn package_events_are_filtered_by_logger_level() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(LoggingRegistry::new());
        registry
            .install(file_config(dir.path(), Level::Info, &["myapp"]))
            .unwrap();

        with_registry(&registry, || {
            tracing::debug!(target: "myapp::db", "dropped");
            tracing::info!(target: "myapp::db", rows = 3, "query done");
        });

        let log = read_log(dir.path());
        assert!(!log.contains("dropped"));
        let line = log.lines().next().unwrap();
        assert!(line.starts_with("INFO\t"));
        assert!(line.contains("\tmyapp::db:"));
        assert!(line.ends_with("\tquery done rows=3"));
    }

    #[test]
    fn unconfigured_targets_fall_back_to_root_warning() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(LoggingRegistry::new());
        registry
            .install(file_config(dir.path(), Level::Debug, &["myapp"]))
            .unwrap();

        with_registry(&registry, || {
            tracing::info!(target: "thirdparty", "quiet");
            tracing::warn!(target: "thirdparty", "loud");
        });

        let log = read_log(dir.path());
        assert!(!log.contains("quiet"));
        assert!(log.contains("WARNING\t"));
        assert!(log.contains("loud"));
    }

    #[test]
    fn handler_level_applies_after_logger_level() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(LoggingRegistry::new());
        let mut config = file_config(dir.path(), Level::Debug, &["myapp"]);
        config.handlers.get_mut("default").unwrap().level = Level::Error;
        registry.install(config).unwrap();

        with_registry(&registry, || {
            tracing::warn!(target: "myapp", "below handler");
            tracing::error!(target: "myapp", "at handler");
        });

        let log = read_log(dir.path());
        assert!(!log.contains("below handler"));
        assert!(log.contains("at handler"));
    }

    #[test]
    fn propagating_logger_also_reaches_root_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = dir.path().join("root.log");
        let pkg_file = dir.path().join("pkg.log");

        let mut config = build_logging_configuration(Level::Info, Vec::<String>::new(), false, None)
            .unwrap()
            .with_handler("default", HandlerSpec::watched_file(Level::Debug, "simple", &root_file))
            .with_handler("pkg", HandlerSpec::watched_file(Level::Debug, "simple", &pkg_file));
        let mut entry = LoggerEntry::new(Level::Info, vec!["pkg".to_string()]);
        entry.propagate = true;
        config.loggers.insert("myapp".to_string(), entry);

        let registry = Arc::new(LoggingRegistry::new());
        registry.install(config).unwrap();
        with_registry(&registry, || tracing::info!(target: "myapp", "both"));

        assert!(std::fs::read_to_string(&pkg_file).unwrap().contains("both"));
        assert!(std::fs::read_to_string(&root_file).unwrap().contains("both"));
    }

    #[test]
    fn disable_existing_loggers_silences_dropped_names() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(LoggingRegistry::new());
        registry
            .install(file_config(dir.path(), Level::Info, &["old"]))
            .unwrap();

        let mut config = file_config(dir.path(), Level::Info, &["new"]);
        config.disable_existing_loggers = true;
        registry.install(config).unwrap();

        with_registry(&registry, || {
            tracing::error!(target: "old::jobs", "silenced");
            tracing::info!(target: "new", "kept");
        });

        let log = read_log(dir.path());
        assert!(!log.contains("silenced"));
        assert!(log.contains("kept"));
    }

    #[test]
    fn custom_formatter_renders_module_and_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.log");
        let mut config = build_logging_configuration(Level::Info, ["myapp"], false, None).unwrap();
        config.formatters.insert(
            "bare".to_string(),
            FormatterSpec {
                format: "[{level}] {message}".to_string(),
                datefmt: None,
            },
        );
        config = config.with_handler("default", HandlerSpec::watched_file(Level::Info, "bare", &path));

        let registry = Arc::new(LoggingRegistry::new());
        registry.install(config).unwrap();
        with_registry(&registry, || tracing::info!(target: "myapp", "plain {}", 7));

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[INFO] plain 7\n");
    }
}
