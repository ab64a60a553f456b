//! RAG response generation over one video's transcript.

use super::context::format_context_for_prompt;
use super::{AnswerModel, ContextBuilder, ContextChunk, ConversationTurn, RagSession};
use crate::chunking::{Chunker, ChunkingConfig, WordWindowChunker};
use crate::config::{Prompts, Settings};
use crate::embedding::Embedder;
use crate::error::{Result, TubechatError};
use crate::vector_store::{Document, VectorStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument};

/// Chunks, embeds and stores a transcript, then answers questions against it.
///
/// Remembers the last `rag.history_turns` exchanges so follow-up questions
/// can refer back to earlier answers.
pub struct RagEngine {
    chunker: Box<dyn Chunker>,
    chunking: ChunkingConfig,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    context_builder: ContextBuilder,
    model: Arc<dyn AnswerModel>,
    prompts: Prompts,
    conversation_history: Mutex<Vec<ConversationTurn>>,
    max_history_turns: usize,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn AnswerModel>,
        settings: &Settings,
    ) -> Self {
        let context_builder = ContextBuilder::new(vector_store.clone(), embedder.clone())
            .with_max_chunks(settings.rag.max_context_chunks)
            .with_min_score(settings.rag.min_score);

        Self {
            chunker: Box::new(WordWindowChunker::new()),
            chunking: ChunkingConfig::from(&settings.chunking),
            embedder,
            vector_store,
            context_builder,
            model,
            prompts: Prompts::default(),
            conversation_history: Mutex::new(Vec::new()),
            max_history_turns: settings.rag.history_turns,
        }
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    fn history(&self) -> Result<MutexGuard<'_, Vec<ConversationTurn>>> {
        self.conversation_history
            .lock()
            .map_err(|e| TubechatError::Engine(format!("Conversation history unavailable: {}", e)))
    }

    /// Earlier exchanges, oldest first.
    pub fn conversation(&self) -> Result<Vec<ConversationTurn>> {
        Ok(self.history()?.clone())
    }

    /// Forget earlier exchanges.
    pub fn clear_history(&self) -> Result<()> {
        self.history()?.clear();
        Ok(())
    }

    /// Answer a question and return the chunks it was based on.
    ///
    /// The exchange is remembered only when the model answers.
    #[instrument(skip(self))]
    pub async fn answer(&self, question: &str) -> Result<RagResponse> {
        info!("Processing question: {}", question);

        let sources = self.context_builder.build(question).await?;

        let context = if sources.is_empty() {
            "(No relevant transcript excerpts were found.)".to_string()
        } else {
            format_context_for_prompt(&sources)
        };

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context);
        let user_prompt = Prompts::render(&self.prompts.rag.user, &vars);

        let earlier = self.conversation()?;
        let answer = self
            .model
            .complete(&self.prompts.rag.system, &earlier, &user_prompt)
            .await?;
        debug!(
            "Generated response with {} sources and {} earlier turns",
            sources.len(),
            earlier.len()
        );

        let mut history = self.history()?;
        history.push(ConversationTurn {
            question: question.to_string(),
            answer: answer.clone(),
        });
        if history.len() > self.max_history_turns {
            let excess = history.len() - self.max_history_turns;
            history.drain(..excess);
        }
        drop(history);

        Ok(RagResponse { answer, sources })
    }
}

#[async_trait]
impl RagSession for RagEngine {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn index(&self, text: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(text, &self.chunking);
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let documents: Vec<Document> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Document::new(chunk.content, embedding, chunk.order))
            .collect();

        let count = self.vector_store.upsert_batch(&documents).await?;
        info!("Indexed {} transcript chunks", count);
        Ok(count)
    }

    async fn ask(&self, question: &str) -> Result<String> {
        Ok(self.answer(question).await?.answer)
    }
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Transcript chunks used for the answer.
    pub sources: Vec<ContextChunk>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::SqliteVectorStore;
    use std::sync::Mutex;

    /// Embeds text as counts of a few marker words.
    struct KeywordEmbedder;

    const KEYWORDS: [&str; 3] = ["borrow", "async", "macro"];

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(KEYWORDS
                .iter()
                .map(|k| lower.matches(k).count() as f32)
                .collect())
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }

    /// Records each call and answers with a fixed string, or fails on "fail".
    #[derive(Default)]
    struct RecordingModel {
        prompts: Mutex<Vec<String>>,
        histories: Mutex<Vec<Vec<ConversationTurn>>>,
    }

    #[async_trait]
    impl AnswerModel for RecordingModel {
        async fn complete(
            &self,
            _system: &str,
            history: &[ConversationTurn],
            user: &str,
        ) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            self.histories.lock().unwrap().push(history.to_vec());
            if user.contains("fail") {
                return Err(TubechatError::OpenAI("rate limited".to_string()));
            }
            Ok("an answer".to_string())
        }
    }

    async fn stored_count(store: &SqliteVectorStore) -> usize {
        store.search(&[1.0, 1.0, 1.0], usize::MAX, f32::MIN).await.unwrap().len()
    }

    fn engine(model: Arc<RecordingModel>) -> (RagEngine, Arc<SqliteVectorStore>) {
        engine_with_history(model, 10)
    }

    fn engine_with_history(
        model: Arc<RecordingModel>,
        history_turns: usize,
    ) -> (RagEngine, Arc<SqliteVectorStore>) {
        let mut settings = Settings::default();
        settings.chunking.chunk_words = 4;
        settings.chunking.overlap_words = 0;
        settings.rag.max_context_chunks = 1;
        settings.rag.min_score = 0.5;
        settings.rag.history_turns = history_turns;

        let store = Arc::new(SqliteVectorStore::in_memory().unwrap());
        let engine = RagEngine::new(store.clone(), Arc::new(KeywordEmbedder), model, &settings);
        (engine, store)
    }

    #[tokio::test]
    async fn test_index_then_answer_uses_relevant_chunk() {
        let model = Arc::new(RecordingModel::default());
        let (engine, store) = engine(model.clone());

        let indexed = engine
            .index("the borrow checker rules. async tasks need executors. macro rules expand code")
            .await
            .unwrap();
        assert_eq!(indexed, 3);
        assert_eq!(stored_count(&store).await, 3);

        let response = engine.answer("how do async tasks run?").await.unwrap();
        assert_eq!(response.answer, "an answer");
        assert_eq!(response.sources.len(), 1);
        assert!(response.sources[0].content.contains("async"));

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("how do async tasks run?"));
        assert!(prompts[0].contains("async tasks need executors."));
    }

    #[tokio::test]
    async fn test_answer_without_context_still_asks_model() {
        let model = Arc::new(RecordingModel::default());
        let (engine, _store) = engine(model.clone());

        let answer = engine.ask("anything about borrow?").await.unwrap();
        assert_eq!(answer, "an answer");
        assert!(model.prompts.lock().unwrap()[0].contains("No relevant transcript excerpts"));
    }

    #[tokio::test]
    async fn test_index_empty_text() {
        let (engine, store) = engine(Arc::new(RecordingModel::default()));
        assert_eq!(engine.index("   ").await.unwrap(), 0);
        assert_eq!(stored_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_follow_up_sees_earlier_exchange() {
        let model = Arc::new(RecordingModel::default());
        let (engine, _store) = engine(model.clone());
        engine.index("the borrow checker rules everything").await.unwrap();

        engine.ask("what rules?").await.unwrap();
        engine.ask("say that again").await.unwrap();

        let histories = model.histories.lock().unwrap();
        assert!(histories[0].is_empty());
        assert_eq!(
            histories[1],
            vec![ConversationTurn {
                question: "what rules?".to_string(),
                answer: "an answer".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_answer_is_not_remembered() {
        let model = Arc::new(RecordingModel::default());
        let (engine, _store) = engine(model.clone());

        assert!(engine.ask("please fail").await.is_err());
        assert!(engine.conversation().unwrap().is_empty());

        engine.ask("ok now").await.unwrap();
        assert_eq!(engine.conversation().unwrap().len(), 1);
        assert!(model.histories.lock().unwrap()[1].is_empty());
    }

    #[tokio::test]
    async fn test_history_keeps_most_recent_turns() {
        let model = Arc::new(RecordingModel::default());
        let (engine, _store) = engine_with_history(model.clone(), 2);

        for question in ["one", "two", "three"] {
            engine.ask(question).await.unwrap();
        }

        let questions: Vec<String> = engine
            .conversation()
            .unwrap()
            .into_iter()
            .map(|t| t.question)
            .collect();
        assert_eq!(questions, vec!["two", "three"]);

        engine.clear_history().unwrap();
        engine.ask("four").await.unwrap();
        assert!(model.histories.lock().unwrap()[3].is_empty());
    }
}
