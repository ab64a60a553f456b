//! Error types for tubechat.

use thiserror::Error;

/// Library-level error type for tubechat operations.
#[derive(Error, Debug)]
pub enum TubechatError {
    /// Missing or unusable credential / video reference.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid YouTube URL: {0}")]
    InvalidReference(String),

    #[error("No transcript available for video {0}")]
    TranscriptUnavailable(String),

    /// Raised by the RAG engine while creating, indexing or answering.
    #[error("RAG engine failure: {0}")]
    Engine(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Session not ready: {0}")]
    NotReady(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl TubechatError {
    /// Short machine-readable name, used by the HTTP API.
    pub fn kind(&self) -> &'static str {
        match self {
            TubechatError::Config(_) => "configuration",
            TubechatError::InvalidReference(_) => "invalid_reference",
            TubechatError::TranscriptUnavailable(_) => "transcript_unavailable",
            TubechatError::NotReady(_) => "not_ready",
            TubechatError::InvalidInput(_) => "invalid_input",
            TubechatError::Engine(_)
            | TubechatError::Embedding(_)
            | TubechatError::VectorStore(_)
            | TubechatError::OpenAI(_)
            | TubechatError::Database(_) => "engine_failure",
            TubechatError::Io(_)
            | TubechatError::Json(_)
            | TubechatError::TomlParse(_)
            | TubechatError::Http(_) => "internal",
        }
    }
}

/// Result type alias for tubechat operations.
pub type Result<T> = std::result::Result<T, TubechatError>;
