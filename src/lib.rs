//! tubechat - chat with a YouTube video
//!
//! Fetches a video's transcript, indexes it into a small retrieval-augmented
//! generation pipeline and answers questions about it with OpenAI.
//!
//! # Overview
//!
//! - Transcripts come from the video's auto-generated caption track, falling
//!   back to the timedtext endpoint
//! - Titles come from oEmbed and degrade to a placeholder
//! - Each loaded video gets its own index in a temporary directory
//! - Questions and answers are kept in an ordered in-memory history
//!
//! # Architecture
//!
//! - `video` - URL to video ID
//! - `transcript` - Transcript fallback chain
//! - `title` - Title lookup
//! - `chunking`, `embedding`, `vector_store`, `rag` - The RAG engine
//! - `app` - Per-user state machine (load, ask, reload)
//! - `server` - Web page and JSON API
//! - `cli` - Command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use tubechat::app::App;
//! use tubechat::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut app = App::from_settings(&settings)?;
//!
//!     let video = app
//!         .configure(Some("sk-..."), Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
//!         .await?;
//!     println!("Loaded {} ({} words)", video.title, video.word_count);
//!
//!     let turn = app.ask("What is this video about?").await?;
//!     println!("{}", turn.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod rag;
pub mod server;
pub mod title;
pub mod transcript;
pub mod vector_store;
pub mod video;

#[cfg(test)]
mod test_support;

pub use error::{Result, TubechatError};
