//! Fallback transcript source: the direct `timedtext` captions endpoint.

use super::{browser_client, Transcript, TranscriptOrigin, TranscriptSource};
use crate::config::YoutubeSettings;
use crate::error::{Result, TubechatError};
use crate::video::VideoId;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Fetches English WebVTT captions and strips them down to plain text.
pub struct TimedTextSource {
    client: reqwest::Client,
    base_url: String,
    language: String,
    min_chars: usize,
    timeout: Duration,
}

impl TimedTextSource {
    pub fn new(settings: &YoutubeSettings) -> Result<Self> {
        Ok(Self {
            client: browser_client(settings)?,
            base_url: settings.timedtext_base_url.trim_end_matches('/').to_string(),
            language: settings.language.clone(),
            min_chars: settings.min_transcript_chars,
            timeout: Duration::from_secs(settings.timedtext_timeout_secs),
        })
    }

    /// Upper bound on the whole request, body included.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request_url(&self, video_id: &VideoId) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/api/timedtext", self.base_url),
            &[
                ("v", video_id.as_str()),
                ("lang", self.language.as_str()),
                ("fmt", "vtt"),
            ],
        )
        .map_err(|e| TubechatError::Config(format!("Invalid timedtext URL: {}", e)))
    }
}

#[async_trait]
impl TranscriptSource for TimedTextSource {
    fn name(&self) -> &'static str {
        "timedtext"
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript> {
        let response = self
            .client
            .get(self.request_url(video_id)?)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TubechatError::TranscriptUnavailable(format!(
                "timedtext returned status {} for {}",
                status, video_id
            )));
        }

        let body = response.text().await?;
        let cleaned = clean_vtt(&body);
        debug!("Cleaned timedtext body to {} chars", cleaned.len());

        if cleaned.chars().count() < self.min_chars {
            return Err(TubechatError::TranscriptUnavailable(format!(
                "timedtext returned too little content for {}",
                video_id
            )));
        }

        Ok(Transcript::new(
            video_id.clone(),
            cleaned,
            TranscriptOrigin::TimedText,
        ))
    }
}

fn cue_timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{2}:\d{2}:\d{2}\.\d{3}.*").expect("valid regex"))
}

/// Strip WebVTT structure: every cue timing line and the `WEBVTT` header token.
///
/// Blank lines left behind inside the text are kept; only the ends are trimmed.
pub fn clean_vtt(vtt: &str) -> String {
    let without_cues = cue_timestamp_regex().replace_all(vtt, "");
    without_cues.replace("WEBVTT", "").trim().to_string()
}
