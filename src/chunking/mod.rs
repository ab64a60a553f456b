//! Transcript chunking for retrieval.
//!
//! Transcripts arrive as one text blob without timing, so chunks are cut by word count.

mod window;

pub use window::WordWindowChunker;

use serde::{Deserialize, Serialize};

/// A chunk of transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Order of this chunk in the transcript.
    pub order: i32,
    /// Index of the first word of this chunk in the transcript.
    pub first_word: usize,
}

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Words per chunk.
    pub chunk_words: usize,
    /// Words repeated at the start of the next chunk.
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_words: 200,
            overlap_words: 20,
        }
    }
}

impl From<&crate::config::ChunkingSettings> for ChunkingConfig {
    fn from(settings: &crate::config::ChunkingSettings) -> Self {
        Self {
            chunk_words: settings.chunk_words,
            overlap_words: settings.overlap_words,
        }
    }
}

/// Trait for content chunking implementations.
pub trait Chunker: Send + Sync {
    /// Split transcript text into ordered chunks.
    fn chunk(&self, text: &str, config: &ChunkingConfig) -> Vec<TextChunk>;
}
