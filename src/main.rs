//! smbtv - Browse SMB shares and preview media from the terminal

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod browse;
mod cli;
mod config;
mod error;
mod media;
mod playback;
mod share;
mod utils;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "smbtv=debug" } else { "smbtv=info" };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(utils::ConditionalStderrLayer::new(
            tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr),
        ))
        .init();

    match cli.command {
        Commands::Browse { path } => {
            cli::commands::browse(path).await?;
        }
        Commands::Ls { path, filter, json } => {
            cli::commands::ls(path, filter, json).await?;
        }
        Commands::Parse { path } => {
            cli::commands::parse(path)?;
        }
        Commands::Auth {
            host,
            username,
            password,
            force,
        } => {
            cli::commands::auth(host, username, password, force)?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
