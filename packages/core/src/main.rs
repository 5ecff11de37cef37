use app_log_config::cli::Cli;
use app_log_config::configuration::{log_file_path, LoggingConfiguration};
use app_log_config::error::LogConfigError;
use app_log_config::logging::{
    apply_configuration, build_package_configuration, configure_console_logging,
    configure_file_logging, configure_installed_applications_logging, resolve_packages,
};
use app_log_config::names::NameList;
use app_log_config::settings::{HostSettings, Settings};
use clap::Parser;
use dotenvy::dotenv;

fn name_list(values: &[String]) -> Option<NameList> {
    (!values.is_empty()).then(|| NameList::from(values))
}

fn run(cli: Cli) -> Result<(), LogConfigError> {
    let mut settings = Settings::from_env()?;
    settings.verbose |= cli.verbose;

    if let Some(path) = &cli.config {
        let config = LoggingConfiguration::from_json_file(path)?;
        apply_configuration(&settings, config)?;
        tracing::info!(path = %path.display(), "Logging initialized from file");
        return Ok(());
    }

    let packages = name_list(&cli.packages);
    let additional = name_list(&cli.additional);

    if cli.print {
        let file_path = cli
            .log_dir
            .as_deref()
            .map(|dir| log_file_path(dir, settings.base_path()));
        let config = build_package_configuration(
            cli.level,
            resolve_packages(&settings, packages, additional),
            settings.verbose,
            file_path.as_deref(),
        )?;
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    match &cli.log_dir {
        Some(dir) => {
            let names: NameList = resolve_packages(&settings, packages, additional)
                .into_iter()
                .collect();
            configure_file_logging(&settings, cli.level, dir, Some(names))?;
        }
        None if packages.is_some() => {
            let names: NameList = resolve_packages(&settings, packages, additional)
                .into_iter()
                .collect();
            configure_console_logging(&settings, cli.level, Some(names))?;
        }
        None => {
            configure_installed_applications_logging(&settings, cli.level, additional)?;
        }
    }

    tracing::info!("Logging initialized");
    Ok(())
}

fn main() {
    dotenv().ok();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
