//! Word-window chunking.
//!
//! Splits text into fixed-size windows of words with a configurable overlap.

use super::{Chunker, ChunkingConfig, TextChunk};

/// Word-count based chunker.
pub struct WordWindowChunker;

impl WordWindowChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WordWindowChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for WordWindowChunker {
    fn chunk(&self, text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut chunks = Vec::new();

        if words.is_empty() {
            return chunks;
        }

        let size = config.chunk_words.max(1);
        // Overlap must leave room to advance.
        let step = size - config.overlap_words.min(size - 1);

        let mut start = 0;
        let mut order = 0;

        loop {
            let end = (start + size).min(words.len());
            chunks.push(TextChunk {
                content: words[start..end].join(" "),
                order,
                first_word: start,
            });
            order += 1;

            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}
