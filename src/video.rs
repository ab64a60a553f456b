//! YouTube video references.
//!
//! Two URL shapes are accepted: `...watch?v=<id>[&...]` and
//! `...youtube.com/shorts/<id>[?...]`. Anything else is rejected.

use crate::error::{Result, TubechatError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a single YouTube video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the video ID from a YouTube URL.
pub fn extract_video_id(url: &str) -> Result<VideoId> {
    let id = if url.contains("watch?v=") {
        url.split("watch?v=")
            .nth(1)
            .and_then(|rest| rest.split('&').next())
    } else if url.contains("youtube.com/shorts/") {
        url.split("shorts/")
            .nth(1)
            .and_then(|rest| rest.split('?').next())
    } else {
        None
    };

    match id {
        Some(id) if !id.is_empty() => Ok(VideoId(id.to_string())),
        _ => Err(TubechatError::InvalidReference(url.to_string())),
    }
}
