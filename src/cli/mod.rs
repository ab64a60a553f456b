//! CLI module for tubechat.

pub mod commands;
mod output;

pub use output::{transcript_length, Output};

use clap::{Parser, Subcommand};

/// tubechat - chat with a YouTube video
///
/// Fetches a video's transcript, indexes it and answers questions about it,
/// in the terminal or through a local web page.
#[derive(Parser, Debug)]
#[command(name = "tubechat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web interface
    Serve {
        /// Host to bind to (defaults to server.host in the config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port in the config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with a video in the terminal
    Chat {
        /// YouTube watch or shorts URL
        video_url: String,
    },

    /// Print a video's transcript
    Transcript {
        /// YouTube watch or shorts URL
        video_url: String,
    },

    /// Print a video's title
    Title {
        /// YouTube watch or shorts URL
        video_url: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init,
}
