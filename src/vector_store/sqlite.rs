//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust. A single video's
//! transcript is a few hundred chunks at most, so a full scan is fine.

use super::{cosine_similarity, Document, SearchResult, VectorStore};
use crate::error::{Result, TubechatError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    chunk_order INTEGER NOT NULL,
    indexed_at TEXT NOT NULL
);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TubechatError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(2)?;
        let indexed_at_str: String = row.get(4)?;

        Ok(Document {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            content: row.get(1)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            chunk_order: row.get(3)?,
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, docs))]
    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for doc in docs {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO documents
                (id, content, embedding, chunk_order, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    doc.id.to_string(),
                    doc.content,
                    Self::embedding_to_bytes(&doc.embedding),
                    doc.chunk_order,
                    doc.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} documents", docs.len());
        Ok(docs.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, content, embedding, chunk_order, indexed_at FROM documents")?;
        let docs = stmt.query_map([], Self::row_to_document)?;

        let mut results: Vec<SearchResult> = docs
            .filter_map(|doc_result| doc_result.ok())
            .map(|doc| {
                let score = cosine_similarity(query_embedding, &doc.embedding);
                SearchResult { document: doc, score }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        debug!("Found {} matching documents", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str, embedding: Vec<f32>, order: i32) -> Document {
        Document::new(content.to_string(), embedding, order)
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let count = store
            .upsert_batch(&[
                doc("second", vec![0.0, 1.0, 0.0], 1),
                doc("first", vec![1.0, 0.0, 0.0], 0),
            ])
            .await
            .unwrap();
        assert_eq!(count, 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10, f32::MIN).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.content, "first");
        assert_eq!(results[0].document.chunk_order, 0);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[1].document.embedding, vec![0.0, 1.0, 0.0]);

        let results = store.search(&[1.0, 0.0, 0.0], 10, 0.5).await.unwrap();
        assert_eq!(results.len(), 1);

        let results = store.search(&[1.0, 1.0, 0.0], 1, f32::MIN).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let mut document = doc("draft", vec![1.0, 0.0], 0);
        store.upsert_batch(&[document.clone()]).await.unwrap();

        document.content = "final".to_string();
        store.upsert_batch(&[document]).await.unwrap();

        let results = store.search(&[1.0, 0.0], 10, f32::MIN).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.content, "final");
    }

    #[tokio::test]
    async fn test_store_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");

        let store = SqliteVectorStore::new(&path).unwrap();
        store
            .upsert_batch(&[doc("persisted", vec![0.5, 0.5], 0)])
            .await
            .unwrap();
        drop(store);

        assert!(path.exists());
        let reopened = SqliteVectorStore::new(&path).unwrap();
        let results = reopened.search(&[0.5, 0.5], 10, f32::MIN).await.unwrap();
        assert_eq!(results[0].document.content, "persisted");
    }
}
