//! ChatVault - Conversation manager CLI
//!
//! Main entry point for the chatvault application.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatvault::cli::{Cli, Commands};
use chatvault::commands;
use chatvault::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { session, no_stream } => {
            tracing::info!("Starting interactive chat mode");
            if let Some(target) = &session {
                tracing::debug!("Resuming session: {}", target);
            }
            if no_stream {
                tracing::debug!("Streaming disabled for this run");
            }

            commands::chat::run_chat(config, session).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::info!("Starting session management command");
            commands::sessions::handle_sessions(&config, command)?;
            Ok(())
        }
        Commands::Prompts { command } => {
            tracing::info!("Starting prompt library command");
            commands::prompts::handle_prompts(&config, command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatvault=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
