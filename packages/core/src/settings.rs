use std::env;
use std::path::{Path, PathBuf};

use crate::error::LogConfigError;

/// What the logging helper needs to know about the host application.
///
/// Values are read on every call; implementations must not assume the
/// application registry is populated when the value is first requested.
pub trait HostSettings {
    /// Installed application / package names, in dotted form.
    fn installed_apps(&self) -> Vec<String>;

    /// `true` once the host's own automatic logging setup has been switched off.
    fn logging_config_disabled(&self) -> bool;

    /// Base path of the application; its last component names the log file.
    fn base_path(&self) -> &Path;

    fn verbose_logging(&self) -> bool {
        false
    }
}

/// Host settings loaded from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub installed_apps: Vec<String>,
    /// Name of the host's automatic logging setup, `None` when disabled.
    pub logging_config: Option<String>,
    pub base_path: PathBuf,
    pub verbose: bool,
}

impl Settings {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            installed_apps: Vec::new(),
            logging_config: Some(DEFAULT_LOGGING_CONFIG.to_string()),
            base_path: base_path.into(),
            verbose: false,
        }
    }

    pub fn with_installed_apps<I, S>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installed_apps = apps.into_iter().map(Into::into).collect();
        self
    }

    /// Switch off the host's automatic logging setup.
    pub fn without_logging_config(mut self) -> Self {
        self.logging_config = None;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn from_env() -> Result<Self, LogConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup (the environment, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LogConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let installed_apps: Vec<String> = lookup("APP_INSTALLED_APPS")
            .map(|apps| {
                apps.split(',')
                    .map(str::trim)
                    .filter(|app| !app.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let logging_config = match lookup("APP_LOGGING_CONFIG") {
            None => Some(DEFAULT_LOGGING_CONFIG.to_string()),
            Some(value) => match value.trim() {
                "" => None,
                v if v.eq_ignore_ascii_case("none") => None,
                v => Some(v.to_string()),
            },
        };

        let base_path = match lookup("APP_BASE_PATH") {
            Some(path) => PathBuf::from(path),
            None => env::current_dir().map_err(|err| {
                LogConfigError::settings(format!("APP_BASE_PATH is unset and cwd is unavailable: {}", err))
            })?,
        };

        let verbose = match lookup("APP_LOG_VERBOSE") {
            None => false,
            Some(value) => parse_bool(&value).ok_or_else(|| {
                LogConfigError::settings(format!("APP_LOG_VERBOSE must be a boolean, got {}", value))
            })?,
        };

        Ok(Self {
            installed_apps,
            logging_config,
            base_path,
            verbose,
        })
    }
}

/// Value of `logging_config` while the host still configures logging itself.
pub const DEFAULT_LOGGING_CONFIG: &str = "default";

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl HostSettings for Settings {
    fn installed_apps(&self) -> Vec<String> {
        self.installed_apps.clone()
    }

    fn logging_config_disabled(&self) -> bool {
        self.logging_config.is_none()
    }

    fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn verbose_logging(&self) -> bool {
        self.verbose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn parses_installed_apps_list() {
        let settings = Settings::from_lookup(lookup(&[
            ("APP_INSTALLED_APPS", "framework.contrib.auth, myapp ,,"),
            ("APP_BASE_PATH", "/srv/mysite"),
        ]))
        .unwrap();

        assert_eq!(settings.installed_apps, vec!["framework.contrib.auth", "myapp"]);
        assert_eq!(settings.base_path(), Path::new("/srv/mysite"));
    }

    #[test]
    fn automatic_logging_is_enabled_by_default() {
        let settings = Settings::from_lookup(lookup(&[("APP_BASE_PATH", "/srv")])).unwrap();
        assert!(!settings.logging_config_disabled());
    }

    #[test]
    fn none_disables_automatic_logging() {
        for value in ["none", "None", ""] {
            let settings = Settings::from_lookup(lookup(&[
                ("APP_BASE_PATH", "/srv"),
                ("APP_LOGGING_CONFIG", value),
            ]))
            .unwrap();
            assert!(settings.logging_config_disabled(), "value {:?}", value);
        }
    }

    #[test]
    fn invalid_verbose_flag_is_rejected() {
        let err = Settings::from_lookup(lookup(&[
            ("APP_BASE_PATH", "/srv"),
            ("APP_LOG_VERBOSE", "loud"),
        ]))
        .unwrap_err();
        assert!(matches!(err, LogConfigError::Settings { .. }));
    }

    #[test]
    fn verbose_flag_is_parsed() {
        let settings = Settings::from_lookup(lookup(&[
            ("APP_BASE_PATH", "/srv"),
            ("APP_LOG_VERBOSE", "yes"),
        ]))
        .unwrap();
        assert!(settings.verbose_logging());
    }

    #[test]
    fn builder_methods_set_fields() {
        let settings = Settings::new("/srv/site")
            .with_installed_apps(["a.b"])
            .without_logging_config()
            .with_verbose(true);

        assert_eq!(settings.installed_apps(), vec!["a.b"]);
        assert!(settings.logging_config_disabled());
        assert!(settings.verbose_logging());
    }
}
