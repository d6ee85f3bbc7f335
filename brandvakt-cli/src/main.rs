//! ## brandvakt-cli
//! **Operator entry point**
//!
//! Loads and validates configuration (fatal on error), initialises logging at the
//! configured level, then dispatches the subcommand.

use anyhow::{anyhow, Result};
use brandvakt_telemetry::EventLogger;
use clap::Parser;

mod commands;
mod error;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_ref())?;
    EventLogger::init(&config.telemetry.log_level).map_err(|e| anyhow!(e))?;

    match cli.command {
        Commands::Simulate(args) => commands::run_simulation(&config, args).await,
        Commands::CheckConfig => {
            commands::check_config(&config);
            Ok(())
        }
        Commands::Rules => {
            print!("{}", commands::render_rules(&config)?);
            Ok(())
        }
    }
}
