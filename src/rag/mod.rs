//! RAG (Retrieval-Augmented Generation) over a single video's transcript.
//!
//! The application only sees two traits: a [`RagBackend`] that creates a
//! [`RagSession`] rooted at a storage directory, and the session itself, which
//! indexes text and answers questions. [`OpenAIBackend`] is the production
//! backend: SQLite vectors, OpenAI embeddings and chat completions.

pub mod context;
mod llm;
mod response;

pub use context::ContextBuilder;
pub use llm::{AnswerModel, ConversationTurn, OpenAIChatModel};
pub use response::{RagEngine, RagResponse};

use crate::config::{Credential, Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::error::Result;
use crate::vector_store::{SearchResult, SqliteVectorStore};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// File name of the vector index inside a session's storage directory.
pub const INDEX_FILE: &str = "index.db";

/// A retrieved transcript chunk.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// Text content.
    pub content: String,
    /// Position of the chunk in the transcript.
    pub order: i32,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            content: result.document.content,
            order: result.document.chunk_order,
            score: result.score,
        }
    }
}

/// An indexed knowledge base that can answer questions.
#[async_trait]
pub trait RagSession: Send + Sync {
    /// Index text as retrievable knowledge. Returns the number of chunks stored.
    async fn index(&self, text: &str) -> Result<usize>;

    /// Answer a question from the indexed text.
    async fn ask(&self, question: &str) -> Result<String>;
}

/// Creates RAG sessions.
pub trait RagBackend: Send + Sync {
    /// Create a session authorised by `credential` that keeps its index under `storage`.
    fn create(&self, credential: &Credential, storage: &Path) -> Result<Box<dyn RagSession>>;
}

/// Production backend on OpenAI and SQLite.
pub struct OpenAIBackend {
    settings: Settings,
    prompts: Prompts,
}

impl OpenAIBackend {
    pub fn new(settings: Settings, prompts: Prompts) -> Self {
        Self { settings, prompts }
    }
}

impl RagBackend for OpenAIBackend {
    fn create(&self, credential: &Credential, storage: &Path) -> Result<Box<dyn RagSession>> {
        let vector_store = Arc::new(SqliteVectorStore::new(&storage.join(INDEX_FILE))?);
        let embedder = Arc::new(OpenAIEmbedder::new(credential, &self.settings.embedding)?);
        let model = Arc::new(OpenAIChatModel::new(credential, &self.settings.rag)?);

        info!(
            "Created RAG session ({} @ {}) in {:?}",
            self.settings.rag.model, self.settings.rag.temperature, storage
        );

        let engine = RagEngine::new(vector_store, embedder, model, &self.settings)
            .with_prompts(self.prompts.clone());
        Ok(Box::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_creates_index_in_storage_dir() {
        let dir = tempfile::tempdir().unwrap();
        let backend = OpenAIBackend::new(Settings::default(), Prompts::default());
        let credential = Credential::new("sk-test").unwrap();

        let session = backend.create(&credential, dir.path());
        assert!(session.is_ok());
        assert!(dir.path().join(INDEX_FILE).exists());
    }
}
