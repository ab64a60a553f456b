//! Configuration settings for tubechat.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub youtube: YoutubeSettings,
    pub rag: RagSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Parent directory for per-load index directories. Empty means the system temp dir.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: String::new(),
            log_level: "warn".to_string(),
        }
    }
}

/// YouTube endpoints and request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// Base URL for watch pages (caption track discovery).
    pub watch_base_url: String,
    /// Base URL for the timedtext captions endpoint.
    pub timedtext_base_url: String,
    /// Base URL for the oEmbed metadata endpoint.
    pub oembed_base_url: String,
    /// Caption language code.
    pub language: String,
    /// Browser-like User-Agent sent with caption requests.
    pub user_agent: String,
    /// Accept-Language header sent with caption requests.
    pub accept_language: String,
    /// Timeout for the timedtext fallback request.
    pub timedtext_timeout_secs: u64,
    /// Cleaned fallback transcripts shorter than this are treated as unavailable.
    pub min_transcript_chars: usize,
    /// Title shown when the metadata lookup fails.
    pub placeholder_title: String,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            watch_base_url: "https://www.youtube.com".to_string(),
            timedtext_base_url: "https://www.youtube.com".to_string(),
            oembed_base_url: "https://www.youtube.com".to_string(),
            language: "en".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            timedtext_timeout_secs: 10,
            min_transcript_chars: 10,
            placeholder_title: "Unknown Title".to_string(),
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Chat completion model.
    pub model: String,
    /// Sampling temperature for answers.
    pub temperature: f32,
    /// Maximum number of transcript chunks given to the model.
    pub max_context_chunks: usize,
    /// Minimum similarity score for a chunk to be retrieved.
    pub min_score: f32,
    /// Earlier question/answer exchanges sent along with each question.
    pub history_turns: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_context_chunks: 5,
            min_score: 0.0,
            history_turns: 10,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Words per chunk.
    pub chunk_words: usize,
    /// Words shared between consecutive chunks.
    pub overlap_words: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_words: 200,
            overlap_words: 20,
        }
    }
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Most browser sessions kept at once; the least recently used is evicted.
    pub max_sessions: usize,
    /// Seconds without a request before a session is dropped.
    pub session_idle_secs: u64,
    /// Origins allowed to call the API from other pages. Empty means same-origin only.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_sessions: 100,
            session_idle_secs: 3600,
            allowed_origins: Vec::new(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory holding a `rag.toml` that overrides the default RAG prompts.
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TubechatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubechat")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Parent directory for per-load index directories.
    pub fn temp_dir(&self) -> PathBuf {
        if self.general.temp_dir.trim().is_empty() {
            std::env::temp_dir()
        } else {
            Self::expand_path(&self.general.temp_dir)
        }
    }
}
