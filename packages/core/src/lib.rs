// Library root. The binary in `src/main.rs` is a thin wrapper around it.

pub mod cli;
pub mod configuration;
pub mod error;
pub mod format;
pub mod level;
pub mod loggers;
pub mod logging;
pub mod names;
pub mod registry;
pub mod settings;
pub mod sink;

pub use configuration::{
    build_logging_configuration, log_file_path, FormatterSpec, HandlerKind, HandlerSpec,
    LoggingConfiguration, RootSpec,
};
pub use error::{LogConfigError, LogConfigResult};
pub use level::Level;
pub use loggers::{build_logger_entries, LoggerEntry};
pub use logging::{
    apply_configuration, build_package_configuration, configure_console_logging,
    configure_file_logging, configure_installed_applications_logging, resolve_packages,
};
pub use names::{normalize_package_names, NameList};
pub use registry::{HandlerView, LoggingRegistry, LoggerView};
pub use settings::{HostSettings, Settings};
