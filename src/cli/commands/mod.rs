//! CLI command implementations.

mod chat;
mod config;
mod serve;
mod title;
mod transcript;

pub use chat::run_chat;
pub use config::run_config;
pub use serve::run_serve;
pub use title::run_title;
pub use transcript::run_transcript;
