//! Vector store for transcript chunks.
//!
//! Each loaded video gets its own store rooted in a fresh directory, so a
//! store only ever holds one transcript.

mod sqlite;

pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A transcript chunk stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub content: String,
    pub embedding: Vec<f32>,
    /// Position of the chunk in the transcript.
    pub chunk_order: i32,
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    pub fn new(content: String, embedding: Vec<f32>, chunk_order: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            embedding,
            chunk_order,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    /// Cosine similarity to the query (higher is better).
    pub score: f32,
}

/// Storage and similarity search over embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store documents, replacing any with the same ID. Returns how many were written.
    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize>;

    /// The `limit` most similar documents scoring at least `min_score`, best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
