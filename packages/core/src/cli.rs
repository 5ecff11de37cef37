use std::path::PathBuf;

use clap::Parser;

use crate::level::Level;

/// Logging configuration helper CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "app-log-config",
    version,
    about = "Build and apply per-package logging configuration for a host application"
)]
pub struct Cli {
    /// Log level for the configured packages (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(long, default_value = "INFO", value_parser = parse_level)]
    pub level: Level,

    /// Package to configure; defaults to APP_INSTALLED_APPS when omitted
    #[arg(long = "package")]
    pub packages: Vec<String>,

    /// Package configured in addition to the installed applications
    #[arg(long = "additional")]
    pub additional: Vec<String>,

    /// Directory for the log file; logs to the console when omitted
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Use the verbose formatter (with timestamps) on the console
    #[arg(long)]
    pub verbose: bool,

    /// Print the configuration as JSON instead of applying it
    #[arg(long)]
    pub print: bool,

    /// Apply a JSON configuration file as-is instead of building one
    #[arg(long, conflicts_with_all = ["packages", "additional", "log_dir", "print"])]
    pub config: Option<PathBuf>,
}

fn parse_level(value: &str) -> Result<Level, String> {
    value.parse::<Level>().map_err(|err| err.to_string())
}
