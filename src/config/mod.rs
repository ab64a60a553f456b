//! Configuration module for tubechat.
//!
//! Handles loading application settings, prompt templates and the provider credential.

mod credential;
mod prompts;
mod settings;

pub use credential::Credential;
pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, PromptSettings, RagSettings,
    ServerSettings, Settings, YoutubeSettings,
};
