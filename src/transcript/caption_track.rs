//! Primary transcript source: the caption tracks listed on a video's watch page.
//!
//! The watch page embeds the player response, whose `captionTracks` array lists
//! every available track. Only the auto-generated (`kind: "asr"`) track in the
//! configured language is used.

use super::{browser_client, Transcript, TranscriptOrigin, TranscriptSource};
use crate::config::YoutubeSettings;
use crate::error::{Result, TubechatError};
use crate::video::VideoId;
use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{debug, instrument};
use url::Url;

/// One entry of the player response's `captionTracks` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    /// Auto-generated tracks are marked with kind "asr".
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Lists caption tracks for a video and fetches the generated one.
pub struct CaptionTrackSource {
    client: reqwest::Client,
    watch_base_url: String,
    language: String,
}

impl CaptionTrackSource {
    pub fn new(settings: &YoutubeSettings) -> Result<Self> {
        Ok(Self {
            client: browser_client(settings)?,
            watch_base_url: settings.watch_base_url.trim_end_matches('/').to_string(),
            language: settings.language.clone(),
        })
    }

    /// List the caption tracks advertised on the watch page.
    #[instrument(skip(self), fields(video_id = %video_id))]
    pub async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>> {
        let url = Url::parse_with_params(
            &format!("{}/watch", self.watch_base_url),
            &[("v", video_id.as_str())],
        )
        .map_err(|e| TubechatError::Config(format!("Invalid watch URL: {}", e)))?;

        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let raw = extract_json_array(&html, "\"captionTracks\":").ok_or_else(|| {
            TubechatError::TranscriptUnavailable(format!("no caption tracks listed for {}", video_id))
        })?;

        let tracks: Vec<CaptionTrack> = serde_json::from_str(raw)?;
        debug!("Found {} caption tracks", tracks.len());
        Ok(tracks)
    }

    fn find_generated<'a>(&self, tracks: &'a [CaptionTrack]) -> Option<&'a CaptionTrack> {
        tracks
            .iter()
            .find(|t| t.is_generated() && t.language_code == self.language)
    }
}

#[async_trait]
impl TranscriptSource for CaptionTrackSource {
    fn name(&self) -> &'static str {
        "caption-track"
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript> {
        let tracks = self.list_tracks(video_id).await?;

        let track = self.find_generated(&tracks).ok_or_else(|| {
            TubechatError::TranscriptUnavailable(format!(
                "no auto-generated '{}' track for {}",
                self.language, video_id
            ))
        })?;

        let xml = self
            .client
            .get(&track.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let segments = parse_segments(&xml);
        if segments.is_empty() {
            return Err(TubechatError::TranscriptUnavailable(format!(
                "caption track for {} has no segments",
                video_id
            )));
        }

        Ok(Transcript::new(
            video_id.clone(),
            segments.join(" "),
            TranscriptOrigin::CaptionTrack,
        ))
    }
}

/// Find `key` in `haystack` and return the JSON array that follows it.
///
/// Brackets inside JSON strings are ignored.
fn extract_json_array<'a>(haystack: &'a str, key: &str) -> Option<&'a str> {
    let start = haystack.find(key)? + key.len();
    let rest = haystack[start..].trim_start();
    let offset = haystack.len() - rest.len();
    if !rest.starts_with('[') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in rest.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&haystack[offset..offset + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<text\b[^>]*>(.*?)</text>").expect("valid regex"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").expect("valid regex")
    })
}

/// Extract segment texts, in document order, from a caption track XML body.
fn parse_segments(xml: &str) -> Vec<String> {
    segment_regex()
        .captures_iter(xml)
        .map(|caps| {
            // Caption text arrives escaped once by XML and often once more by YouTube.
            let text = decode_entities(&decode_entities(&caps[1]));
            tag_regex().replace_all(&text, "").to_string()
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    entity_regex()
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if entity.starts_with("#x") => u32::from_str_radix(&entity[2..], 16)
                    .ok()
                    .and_then(char::from_u32),
                _ => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_stub;
    use crate::video::extract_video_id;
    use axum::{http::StatusCode, routing::get, Router};

    const TRACK_XML: &str = r##"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0.5" dur="2.1">hello &amp;amp; welcome</text><text start="2.6" dur="1.9">it&amp;#39;s <font color="#E5E5E5">day</font> one</text></transcript>"##;

    #[test]
    fn test_extract_json_array_handles_nesting_and_strings() {
        let html = r#"var x = {"captions":{"captionTracks":[{"name":{"runs":[{"text":"a ] b"}]},"baseUrl":"u"}],"other":1}};"#;
        let raw = extract_json_array(html, "\"captionTracks\":").unwrap();
        assert_eq!(raw, r#"[{"name":{"runs":[{"text":"a ] b"}]},"baseUrl":"u"}]"#);
    }

    #[test]
    fn test_extract_json_array_missing_key() {
        assert!(extract_json_array("<html></html>", "\"captionTracks\":").is_none());
        assert!(extract_json_array("\"captionTracks\":{}", "\"captionTracks\":").is_none());
    }

    #[test]
    fn test_parse_segments_decodes_and_strips() {
        let segments = parse_segments(TRACK_XML);
        assert_eq!(segments, vec!["hello & welcome", "it's day one"]);
    }

    #[test]
    fn test_decode_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;&unknown;"), "AB&unknown;");
    }

    fn watch_page(base: &str, kind: &str, language: &str) -> String {
        format!(
            r#"<html><script>var ytInitialPlayerResponse = {{"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":[{{"baseUrl":"{base}/api/timedtext?v=vid123&lang=de","languageCode":"de","name":{{"simpleText":"German"}}}},{{"baseUrl":"{base}/track/en","languageCode":"{language}","kind":"{kind}","name":{{"runs":[{{"text":"English (auto-generated)"}}]}}}}]}}}}}};</script></html>"#
        )
    }

    async fn spawn_youtube(kind: &'static str, language: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let page = watch_page(&base, kind, language);
        let router = Router::new()
            .route(
                "/watch",
                get(move || {
                    let page = page.clone();
                    async move { page }
                }),
            )
            .route("/track/en", get(|| async { TRACK_XML }))
            .route(
                "/api/timedtext",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "wrong track") }),
            );
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        base
    }

    fn settings_for(base: &str) -> YoutubeSettings {
        YoutubeSettings {
            watch_base_url: base.to_string(),
            ..YoutubeSettings::default()
        }
    }

    #[tokio::test]
    async fn test_fetches_generated_english_track() {
        let base = spawn_youtube("asr", "en").await;
        let source = CaptionTrackSource::new(&settings_for(&base)).unwrap();
        let id = extract_video_id("https://www.youtube.com/watch?v=vid123").unwrap();

        let tracks = source.list_tracks(&id).await.unwrap();
        assert_eq!(tracks.len(), 2);

        let transcript = source.fetch(&id).await.unwrap();
        assert_eq!(transcript.origin, TranscriptOrigin::CaptionTrack);
        assert_eq!(transcript.text, "hello & welcome it's day one");
    }

    #[tokio::test]
    async fn test_manual_track_is_not_used() {
        let base = spawn_youtube("", "en").await;
        let source = CaptionTrackSource::new(&settings_for(&base)).unwrap();
        let id = extract_video_id("https://www.youtube.com/watch?v=vid123").unwrap();

        let err = source.fetch(&id).await.unwrap_err();
        assert!(matches!(err, TubechatError::TranscriptUnavailable(_)));
    }

    #[tokio::test]
    async fn test_page_without_tracks_fails() {
        let base = spawn_stub(Router::new().route("/watch", get(|| async { "<html></html>" }))).await;
        let source = CaptionTrackSource::new(&settings_for(&base)).unwrap();
        let id = extract_video_id("https://www.youtube.com/watch?v=vid123").unwrap();

        assert!(source.fetch(&id).await.is_err());
    }
}
