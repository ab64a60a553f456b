//! Print a video's transcript.

use crate::cli::{transcript_length, Output};
use crate::config::Settings;
use crate::transcript::TranscriptFetcher;
use anyhow::Result;

pub async fn run_transcript(video_url: &str, settings: Settings) -> Result<()> {
    let fetcher = TranscriptFetcher::from_settings(&settings.youtube)?;

    let spinner = Output::spinner("Fetching transcript...");
    let result = fetcher.fetch_transcript(video_url).await;
    spinner.finish_and_clear();

    let transcript = match result {
        Ok(transcript) => transcript,
        Err(e) => {
            Output::error(&e.to_string());
            return Err(e.into());
        }
    };

    eprintln!(
        "{} ({}, source: {})",
        transcript_length(transcript.word_count()),
        transcript.video_id,
        transcript.origin
    );
    println!("{}", transcript.text);

    Ok(())
}
