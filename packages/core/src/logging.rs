//! Applying logging configurations to the running process.
//!
//! Every entry point builds a fresh [`LoggingConfiguration`] from the
//! host settings as they are at call time and installs it into the
//! process-wide [`LoggingRegistry`]. The host's automatic logging setup
//! must be switched off first, otherwise it would fight over the same
//! global state.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info};

use crate::configuration::{build_logging_configuration, log_file_path, LoggingConfiguration};
use crate::error::{LogConfigError, LogConfigResult};
use crate::level::Level;
use crate::loggers::build_logger_entries;
use crate::names::{normalize_package_names, NameList};
use crate::registry::LoggingRegistry;
use crate::settings::HostSettings;

/// Install `config` into the global registry.
///
/// Fails with [`LogConfigError::ImproperlyConfigured`] while the host still
/// configures logging automatically.
pub fn apply_configuration<S>(settings: &S, config: LoggingConfiguration) -> LogConfigResult<()>
where
    S: HostSettings + ?Sized,
{
    if !settings.logging_config_disabled() {
        return Err(LogConfigError::improperly_configured(
            "the host's automatic logging configuration must be disabled \
             before installing a custom configuration",
        ));
    }

    let loggers = config.loggers.len();
    LoggingRegistry::global().install_global(config)?;

    info!(loggers, "Logging configured");
    Ok(())
}

/// Logger names for an entry point.
///
/// Installed applications are collapsed to their top-level namespaces;
/// explicitly passed and additional packages are configured as given.
pub fn resolve_packages<S>(
    settings: &S,
    packages: Option<NameList>,
    additional: Option<NameList>,
) -> BTreeSet<String>
where
    S: HostSettings + ?Sized,
{
    let mut names = match packages {
        Some(packages) => exact_names(packages),
        None => normalize_package_names(settings.installed_apps()),
    };
    if let Some(additional) = additional {
        names.extend(exact_names(additional));
    }
    names
}

fn exact_names(names: NameList) -> BTreeSet<String> {
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// The fixed handlers and formatters plus one logger per name in `packages`.
pub fn build_package_configuration(
    level: Level,
    packages: BTreeSet<String>,
    verbose: bool,
    file_path: Option<&Path>,
) -> LogConfigResult<LoggingConfiguration> {
    let config = build_logging_configuration(level, std::iter::empty::<&str>(), verbose, file_path)?;
    Ok(config.with_loggers(build_logger_entries(level, packages, None)?))
}

/// Log to the console for `packages`, or for the installed applications.
pub fn configure_console_logging<S>(
    settings: &S,
    level: Level,
    packages: Option<NameList>,
) -> LogConfigResult<()>
where
    S: HostSettings + ?Sized,
{
    let packages = resolve_packages(settings, packages, None);
    let config = build_package_configuration(level, packages, settings.verbose_logging(), None)?;

    apply_configuration(settings, config)
}

/// Log to `<directory>/app-<basename of base path>.log`.
pub fn configure_file_logging<S>(
    settings: &S,
    level: Level,
    directory: &Path,
    packages: Option<NameList>,
) -> LogConfigResult<()>
where
    S: HostSettings + ?Sized,
{
    let packages = resolve_packages(settings, packages, None);
    let file_path = log_file_path(directory, settings.base_path());
    let config = build_package_configuration(
        level,
        packages,
        settings.verbose_logging(),
        Some(&file_path),
    )?;

    apply_configuration(settings, config)?;
    debug!(path = %file_path.display(), "File logging enabled");
    Ok(())
}

/// Console logging for every installed application plus `additional_packages`.
///
/// A single package name is accepted as-is: `Some("rq.worker".into())`.
pub fn configure_installed_applications_logging<S>(
    settings: &S,
    level: Level,
    additional_packages: Option<NameList>,
) -> LogConfigResult<()>
where
    S: HostSettings + ?Sized,
{
    let packages = resolve_packages(settings, None, additional_packages);
    debug!(?packages, "Configuring installed application loggers");

    let config = build_package_configuration(level, packages, settings.verbose_logging(), None)?;
    apply_configuration(settings, config)
}
