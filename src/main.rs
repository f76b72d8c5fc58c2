//! Compaq Internet Keyboard (SDM4540UL) extra-key driver
//!
//! Reads raw reports from the keyboard and re-emits the nine vendor buttons,
//! which the generic HID driver ignores, as ordinary key events.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod cli;
use cli::{Cli, Commands};

mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(sdm4540_driver::DriverConfig::default_path);
    debug!("Config path: {}", config_path.display());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = commands::load_config(&config_path)?;
            commands::run::run(&config).await?;
        }
        Commands::List { json } => {
            commands::utility::list(json).await?;
        }
        Commands::Decode { reports, json } => {
            let config = commands::load_config(&config_path)?;
            commands::decode::decode(&config, &reports, json)?;
        }
        Commands::Replay {
            file,
            bus,
            device,
            json,
            verbose,
        } => {
            let config = commands::load_config(&config_path)?;
            let filter = sdm4540_driver::ReplayFilter { bus, device };
            commands::decode::replay(&config, &file, filter, json, verbose)?;
        }
        Commands::Keymap { json } => {
            let config = commands::load_config(&config_path)?;
            commands::utility::keymap(&config, json)?;
        }
        Commands::InitConfig { force } => {
            commands::utility::init_config(&config_path, force)?;
        }
    }

    Ok(())
}
