//! Application state machine.
//!
//! Drives one user's interaction through `Unconfigured -> Loading -> Ready`:
//! a configuration (API key + video URL) triggers a load, which fetches the
//! transcript, resolves the title, creates a RAG session in a fresh storage
//! directory and indexes the transcript. Once ready, questions are answered
//! and appended to the chat history.
//!
//! A reload replaces the previous video only after the new one has loaded;
//! a failed reload leaves the previous session untouched.

use crate::config::{Credential, Prompts, Settings};
use crate::error::{Result, TubechatError};
use crate::rag::{OpenAIBackend, RagBackend, RagSession};
use crate::title::{OembedTitleResolver, TitleResolver};
use crate::transcript::{TranscriptFetcher, TranscriptOrigin};
use crate::video::{extract_video_id, VideoId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{info, instrument, warn};

/// Where the application is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Waiting for an API key and a video URL.
    Unconfigured,
    /// Fetching, indexing.
    Loading,
    /// Accepting questions.
    Ready,
}

/// One question and its answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// What the user sees about the loaded video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSummary {
    pub video_id: VideoId,
    pub title: String,
    pub word_count: usize,
    pub origin: TranscriptOrigin,
    pub chunks_indexed: usize,
}

/// Serializable view of the whole session, for interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: LoadState,
    pub video: Option<VideoSummary>,
    pub history: Vec<ChatTurn>,
}

struct LoadedVideo {
    summary: VideoSummary,
    video_url: String,
    // Declared before `storage` so the index is closed before its directory is removed.
    rag: Box<dyn RagSession>,
    storage: TempDir,
}

/// One interaction context: its collaborators and its mutable session state.
pub struct App {
    fetcher: Arc<TranscriptFetcher>,
    titles: Arc<dyn TitleResolver>,
    backend: Arc<dyn RagBackend>,
    storage_root: PathBuf,
    state: LoadState,
    loaded: Option<LoadedVideo>,
    history: Vec<ChatTurn>,
}

impl App {
    /// Create an app from its collaborators. Per-load storage is created under `storage_root`.
    pub fn new(
        fetcher: Arc<TranscriptFetcher>,
        titles: Arc<dyn TitleResolver>,
        backend: Arc<dyn RagBackend>,
        storage_root: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            titles,
            backend,
            storage_root,
            state: LoadState::Unconfigured,
            loaded: None,
            history: Vec::new(),
        }
    }

    /// Create an app with the same collaborators as `self` and an empty session.
    pub fn fresh(&self) -> Self {
        Self::new(
            self.fetcher.clone(),
            self.titles.clone(),
            self.backend.clone(),
            self.storage_root.clone(),
        )
    }

    /// Create an app wired to YouTube and OpenAI as configured in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        Ok(Self::new(
            Arc::new(TranscriptFetcher::from_settings(&settings.youtube)?),
            Arc::new(OembedTitleResolver::new(&settings.youtube)?),
            Arc::new(OpenAIBackend::new(settings.clone(), prompts)),
            settings.temp_dir().join("tubechat"),
        ))
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn title(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.summary.title.as_str())
    }

    pub fn video(&self) -> Option<&VideoSummary> {
        self.loaded.as_ref().map(|l| &l.summary)
    }

    /// URL of the currently loaded video.
    pub fn video_url(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.video_url.as_str())
    }

    /// Directory holding the current index.
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.loaded.as_ref().map(|l| l.storage.path().to_path_buf())
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            video: self.video().cloned(),
            history: self.history.clone(),
        }
    }

    /// Accept a configuration and load the video it names.
    ///
    /// Blank or missing values are rejected with a configuration error before
    /// any network call. On success the previous video, its index and the chat
    /// history are discarded.
    #[instrument(skip(self, api_key))]
    pub async fn configure(
        &mut self,
        api_key: Option<&str>,
        video_url: Option<&str>,
    ) -> Result<VideoSummary> {
        self.settle_interrupted_load();

        let (api_key, video_url) = match (non_blank(api_key), non_blank(video_url)) {
            (Some(key), Some(url)) => (key, url),
            (key, _) => {
                if self.loaded.is_none() {
                    self.state = LoadState::Unconfigured;
                }
                let missing = if key.is_none() {
                    "an OpenAI API key"
                } else {
                    "a YouTube video URL"
                };
                return Err(TubechatError::Config(format!("Enter {} to start", missing)));
            }
        };

        let credential = match Credential::new(api_key) {
            Ok(credential) => credential,
            Err(e) => {
                if self.loaded.is_none() {
                    self.state = LoadState::Unconfigured;
                }
                return Err(e);
            }
        };

        self.state = LoadState::Loading;

        match self.load(&credential, video_url).await {
            Ok(loaded) => {
                let summary = loaded.summary.clone();
                info!("Loaded '{}' ({} words)", summary.title, summary.word_count);
                // Replacing drops the previous index and removes its directory.
                self.loaded = Some(loaded);
                self.history.clear();
                self.state = LoadState::Ready;
                Ok(summary)
            }
            Err(e) => {
                warn!("Load failed: {}", e);
                self.state = if self.loaded.is_some() {
                    LoadState::Ready
                } else {
                    LoadState::Unconfigured
                };
                Err(e)
            }
        }
    }

    async fn load(&self, credential: &Credential, video_url: &str) -> Result<LoadedVideo> {
        let video_id = extract_video_id(video_url)?;

        let transcript = self.fetcher.fetch_for_id(&video_id).await?;
        let title = self.titles.fetch_title(&video_id).await;

        std::fs::create_dir_all(&self.storage_root)?;
        let storage = tempfile::Builder::new()
            .prefix("index-")
            .tempdir_in(&self.storage_root)?;

        let rag = self
            .backend
            .create(credential, storage.path())
            .map_err(engine_failure)?;
        let chunks_indexed = rag.index(&transcript.text).await.map_err(engine_failure)?;

        Ok(LoadedVideo {
            summary: VideoSummary {
                video_id,
                title,
                word_count: transcript.word_count(),
                origin: transcript.origin,
                chunks_indexed,
            },
            video_url: video_url.to_string(),
            rag,
            storage,
        })
    }

    /// Ask a question about the loaded video and record the answer.
    #[instrument(skip(self))]
    pub async fn ask(&mut self, question: &str) -> Result<ChatTurn> {
        self.settle_interrupted_load();

        let question = question.trim();
        if question.is_empty() {
            return Err(TubechatError::InvalidInput("Question is empty".to_string()));
        }

        let loaded = match (self.state, &self.loaded) {
            (LoadState::Ready, Some(loaded)) => loaded,
            _ => {
                return Err(TubechatError::NotReady(
                    "Load a video before asking questions".to_string(),
                ))
            }
        };

        let answer = loaded.rag.ask(question).await.map_err(engine_failure)?;

        let turn = ChatTurn {
            question: question.to_string(),
            answer,
            asked_at: Utc::now(),
        };
        self.history.push(turn.clone());
        Ok(turn)
    }

    /// A load whose future was dropped leaves `Loading` behind; fall back to what is loaded.
    pub fn settle_interrupted_load(&mut self) {
        if self.state == LoadState::Loading {
            self.state = if self.loaded.is_some() {
                LoadState::Ready
            } else {
                LoadState::Unconfigured
            };
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Errors from the RAG engine surface as engine failures, except configuration problems.
fn engine_failure(e: TubechatError) -> TubechatError {
    match e {
        TubechatError::Config(_) | TubechatError::Engine(_) => e,
        other => TubechatError::Engine(other.to_string()),
    }
}
