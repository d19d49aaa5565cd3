use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};
use waymark_config::domains::logging::LogLevel;
use waymark_config::{ConfigLoader, WaymarkConfig};

mod cli;
mod commands;

use cli::{Cli, Commands, ConfigCommands};
use commands::AppContext;

fn load_config(config_path: Option<&PathBuf>) -> Result<WaymarkConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                info!("Loading configuration from: {:?}", path);
                loader
                    .from_file(path)
                    .context(format!("Failed to load configuration from {:?}", path))
            } else {
                warn!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}

/// Initialize logging from config, with `--log-level` taking precedence
fn init_logging(config: &WaymarkConfig, log_level: Option<&String>) -> Result<()> {
    let mut logging = config.logging.clone();

    if let Some(level) = log_level {
        match LogLevel::from_str(level) {
            Ok(level) => logging.level = level,
            Err(_) => {
                eprintln!(
                    "Invalid log level '{}', using configured level '{}'",
                    level, logging.level
                );
            }
        }
    }

    waymark_logging::init_logging_from_config(&logging)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = load_config(cli.config.as_ref())?;
    init_logging(&config, cli.log_level.as_ref())?;

    debug!("Waymark CLI starting");

    let ctx = AppContext::new(config)?;

    match &cli.command {
        Commands::Apply { dirs, force, unit } => {
            commands::apply::handle_apply(&ctx, dirs, unit.as_deref(), *force).await
        }
        Commands::Revert { force, unit } => {
            commands::revert::handle_revert(&ctx, unit, *force).await
        }
        Commands::Status { dir } => commands::status::handle_status(&ctx, dir).await,
        Commands::Create { dir, slug } => commands::create::handle_create(dir, slug),
        Commands::Stores => commands::stores::handle_stores(&ctx),
        Commands::Config { config_cmd } => match config_cmd {
            ConfigCommands::Sample => commands::config::handle_config_sample(),
            ConfigCommands::Validate { dir } => {
                commands::config::handle_config_validate(&ctx, dir.as_deref())
            }
        },
    }
}
