//! Display titles for videos.
//!
//! Title lookup is cosmetic: every failure degrades to a placeholder.

use crate::config::YoutubeSettings;
use crate::error::{Result, TubechatError};
use crate::video::VideoId;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{instrument, warn};
use url::Url;

/// Resolves a human-readable title for a video.
#[async_trait]
pub trait TitleResolver: Send + Sync {
    /// Never fails; returns a placeholder when the title can't be found.
    async fn fetch_title(&self, video_id: &VideoId) -> String;
}

#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: Option<String>,
}

/// Title lookup through YouTube's public oEmbed endpoint.
pub struct OembedTitleResolver {
    client: reqwest::Client,
    base_url: String,
    placeholder: String,
}

impl OembedTitleResolver {
    pub fn new(settings: &YoutubeSettings) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            base_url: settings.oembed_base_url.trim_end_matches('/').to_string(),
            placeholder: settings.placeholder_title.clone(),
        })
    }

    async fn lookup(&self, video_id: &VideoId) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/oembed", self.base_url),
            &[("url", video_id.watch_url().as_str()), ("format", "json")],
        )
        .map_err(|e| TubechatError::Config(format!("Invalid oEmbed URL: {}", e)))?;

        let response: OembedResponse = self.client.get(url).send().await?.json().await?;
        Ok(response.title.unwrap_or_else(|| self.placeholder.clone()))
    }
}

#[async_trait]
impl TitleResolver for OembedTitleResolver {
    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch_title(&self, video_id: &VideoId) -> String {
        match self.lookup(video_id).await {
            Ok(title) => title,
            Err(e) => {
                warn!("Title lookup failed, using placeholder: {}", e);
                self.placeholder.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_stub;
    use crate::video::extract_video_id;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use std::collections::HashMap;

    fn resolver_for(base: &str) -> OembedTitleResolver {
        OembedTitleResolver::new(&YoutubeSettings {
            oembed_base_url: base.to_string(),
            ..YoutubeSettings::default()
        })
        .unwrap()
    }

    fn video() -> VideoId {
        extract_video_id("https://www.youtube.com/watch?v=HCeyLJP60LQ").unwrap()
    }

    #[tokio::test]
    async fn test_reads_title_field() {
        let router = Router::new().route(
            "/oembed",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["url"], "https://www.youtube.com/watch?v=HCeyLJP60LQ");
                assert_eq!(params["format"], "json");
                Json(serde_json::json!({ "title": "Rust in 100 Seconds", "author_name": "x" }))
            }),
        );
        let resolver = resolver_for(&spawn_stub(router).await);

        assert_eq!(resolver.fetch_title(&video()).await, "Rust in 100 Seconds");
        // Stable endpoint, stable answer.
        assert_eq!(resolver.fetch_title(&video()).await, "Rust in 100 Seconds");
    }

    #[tokio::test]
    async fn test_missing_field_gives_placeholder() {
        let router = Router::new().route(
            "/oembed",
            get(|| async { Json(serde_json::json!({ "author_name": "x" })) }),
        );
        let resolver = resolver_for(&spawn_stub(router).await);

        assert_eq!(resolver.fetch_title(&video()).await, "Unknown Title");
    }

    #[tokio::test]
    async fn test_failures_give_placeholder_every_time() {
        let router = Router::new()
            .route("/oembed", get(|| async { (StatusCode::NOT_FOUND, "Not Found") }));
        let resolver = resolver_for(&spawn_stub(router).await);

        assert_eq!(resolver.fetch_title(&video()).await, "Unknown Title");
        assert_eq!(resolver.fetch_title(&video()).await, "Unknown Title");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_gives_placeholder() {
        // Nothing listens on port 9 locally.
        let resolver = resolver_for("http://127.0.0.1:9");
        assert_eq!(resolver.fetch_title(&video()).await, "Unknown Title");
    }
}
