//! Transcript acquisition for YouTube videos.
//!
//! A [`TranscriptFetcher`] tries an ordered list of [`TranscriptSource`]s and
//! returns the first transcript one of them produces:
//!
//! 1. [`CaptionTrackSource`] - the auto-generated English caption track listed on the watch page.
//! 2. [`TimedTextSource`] - the direct `timedtext` captions endpoint in WebVTT format.
//!
//! A failing source never yields a partial transcript; the chain moves on to the next one.

mod caption_track;
mod timedtext;

pub use caption_track::CaptionTrackSource;
pub use timedtext::{clean_vtt, TimedTextSource};

use crate::config::YoutubeSettings;
use crate::error::{Result, TubechatError};
use crate::video::{extract_video_id, VideoId};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Where a transcript came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptOrigin {
    /// Auto-generated caption track from the watch page.
    CaptionTrack,
    /// Direct timedtext fallback.
    TimedText,
}

impl std::fmt::Display for TranscriptOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptOrigin::CaptionTrack => write!(f, "caption track"),
            TranscriptOrigin::TimedText => write!(f, "timedtext fallback"),
        }
    }
}

/// Plain-text transcript of one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: VideoId,
    pub text: String,
    pub origin: TranscriptOrigin,
}

impl Transcript {
    pub fn new(video_id: VideoId, text: String, origin: TranscriptOrigin) -> Self {
        Self {
            video_id,
            text,
            origin,
        }
    }

    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A single way of obtaining a transcript.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch the full transcript, or fail without a partial result.
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript>;
}

/// Ordered fallback chain of transcript sources.
pub struct TranscriptFetcher {
    sources: Vec<Box<dyn TranscriptSource>>,
}

impl TranscriptFetcher {
    /// Create a fetcher that tries `sources` in order.
    pub fn new(sources: Vec<Box<dyn TranscriptSource>>) -> Self {
        Self { sources }
    }

    /// The default chain: caption track first, then timedtext.
    pub fn from_settings(settings: &YoutubeSettings) -> Result<Self> {
        Ok(Self::new(vec![
            Box::new(CaptionTrackSource::new(settings)?),
            Box::new(TimedTextSource::new(settings)?),
        ]))
    }

    /// Resolve a video URL and fetch its transcript.
    pub async fn fetch_transcript(&self, video_url: &str) -> Result<Transcript> {
        let video_id = extract_video_id(video_url)?;
        self.fetch_for_id(&video_id).await
    }

    /// Fetch the transcript for an already-resolved video ID.
    #[instrument(skip(self), fields(video_id = %video_id))]
    pub async fn fetch_for_id(&self, video_id: &VideoId) -> Result<Transcript> {
        for source in &self.sources {
            match source.fetch(video_id).await {
                Ok(transcript) => {
                    info!(
                        "Fetched transcript via {} ({} words)",
                        source.name(),
                        transcript.word_count()
                    );
                    return Ok(transcript);
                }
                Err(e) => {
                    warn!("Transcript source {} failed: {}", source.name(), e);
                }
            }
        }

        Err(TubechatError::TranscriptUnavailable(video_id.to_string()))
    }
}

/// HTTP client that presents itself as a desktop browser.
pub(crate) fn browser_client(settings: &YoutubeSettings) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&settings.user_agent)
            .map_err(|e| TubechatError::Config(format!("Invalid user agent: {}", e)))?,
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&settings.accept_language)
            .map_err(|e| TubechatError::Config(format!("Invalid accept-language: {}", e)))?,
    );

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}
