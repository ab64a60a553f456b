//! tubechat CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tubechat::cli::{commands, Cli, Commands};
use tubechat::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("tubechat={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let api_key = cli.api_key.as_deref();

    // Execute command
    match &cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, api_key, settings).await?;
        }

        Commands::Chat { video_url } => {
            commands::run_chat(video_url, api_key, settings).await?;
        }

        Commands::Transcript { video_url } => {
            commands::run_transcript(video_url, settings).await?;
        }

        Commands::Title { video_url } => {
            commands::run_title(video_url, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path.clone(), settings)?;
        }
    }

    Ok(())
}
