use std::{env, process::ExitCode, str::FromStr as _};

use clap::Parser as _;
use config_rs::Config as ConfigRs;
use tracing::{debug, trace};

use crate::{
    app::App,
    app_info::AppInfo,
    cli::{Cli, Commands},
    commands::{self, check, end, monitor, stage, start, status, version},
    config::{Config, ConfigError},
    environment::Environment,
    setup_tracing::setup_tracing_for_command,
};

const ENVIRONMENT_VARIABLE: &str = "APP_ENVIRONMENT";
const ENVIRONMENT_PREFIX: &str = "APP";

pub async fn boot(app_info: AppInfo) -> ExitCode {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Version)) {
        version::print_version_info(app_info);
        return ExitCode::SUCCESS;
    }

    let environment = set_environment();

    let config = match read_config(&environment) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::from(commands::EXIT_ERROR);
        }
    };

    setup_tracing_for_command(&cli.command, &config.tracing.log_level);

    debug!("Environment set to: {:?}", environment);
    trace!("Configuration loaded: {:?}", config);

    let app = match App::from_config(config, environment) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::from(commands::EXIT_ERROR);
        }
    };

    handle_command(app, cli.command, app_info).await
}

#[must_use]
pub fn set_environment() -> Environment {
    env::var(ENVIRONMENT_VARIABLE)
        .ok()
        .and_then(|s| Environment::from_str(&s).ok())
        .unwrap_or_default()
}

/// Load `config/{environment}` overlaid with `APP_*` variables, e.g.
/// `APP_MONITOR__DEADLINE_HOUR=6`.
pub fn read_config(environment: &Environment) -> Result<Config, ConfigError> {
    let config_file_name = environment.config_file_name();

    trace!("Reading configuration from: {}", config_file_name);

    let config: Config = ConfigRs::builder()
        .add_source(config_rs::File::with_name(&config_file_name).required(false))
        .add_source(
            config_rs::Environment::with_prefix(ENVIRONMENT_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    config.validate()?;
    Ok(config)
}

pub async fn handle_command(app: App, command: Option<Commands>, app_info: AppInfo) -> ExitCode {
    match command {
        Some(Commands::Start) => start::handle_start_command(&app),
        Some(Commands::Stage { stage, percentage }) => {
            stage::handle_stage_command(&app, &stage, percentage)
        }
        Some(Commands::End) => end::handle_end_command(&app),
        Some(Commands::Status) => status::handle_status_command(&app),
        Some(Commands::Check) => check::handle_check_command(&app),
        Some(Commands::Monitor { once: true }) => monitor::handle_monitor_once_command(&app).await,
        Some(Commands::Version) => {
            version::print_version_info(app_info);
            ExitCode::SUCCESS
        }
        Some(Commands::Monitor { once: false }) | None => {
            monitor::handle_monitor_command(&app).await
        }
    }
}
