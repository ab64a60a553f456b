//! Interactive terminal chat with one video.

use crate::app::App;
use crate::cli::{transcript_length, Output};
use crate::config::{Credential, Settings};
use anyhow::Result;
use console::style;
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Run `fut` unless Ctrl-C arrives first. `None` means interrupted.
async fn interruptible<F: Future>(fut: F) -> Option<F::Output> {
    tokio::select! {
        out = fut => Some(out),
        _ = tokio::signal::ctrl_c() => None,
    }
}

/// Run the interactive chat command.
pub async fn run_chat(video_url: &str, api_key: Option<&str>, settings: Settings) -> Result<()> {
    let credential = match Credential::resolve(api_key) {
        Ok(credential) => credential,
        Err(e) => {
            Output::error(&e.to_string());
            return Err(e.into());
        }
    };

    let mut app = App::from_settings(&settings)?;

    if !load(&mut app, &credential, video_url).await {
        anyhow::bail!("No video loaded");
    }

    println!(
        "{}\n",
        style("Ask questions about the video. 'reload <url>' switches video, 'exit' quits.").dim()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", style("You:").green().bold());
        std::io::stdout().flush()?;

        let line = match interruptible(lines.next_line()).await {
            Some(line) => match line? {
                Some(line) => line,
                None => break,
            },
            None => break,
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        if let Some(url) = input.strip_prefix("reload ") {
            load(&mut app, &credential, url.trim()).await;
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = interruptible(app.ask(input)).await;
        spinner.finish_and_clear();

        match result {
            Some(Ok(turn)) => Output::chat_line("Assistant", &turn.answer),
            Some(Err(e)) => Output::error(&e.to_string()),
            None => Output::warning("Cancelled."),
        }
    }

    println!();
    Output::info("Goodbye!");
    Ok(())
}

/// Load a video, reporting progress. Returns whether a video is ready afterwards.
async fn load(app: &mut App, credential: &Credential, video_url: &str) -> bool {
    let spinner = Output::spinner("Fetching transcript and building the index...");
    let result = interruptible(app.configure(Some(credential.expose()), Some(video_url))).await;
    spinner.finish_and_clear();

    match result {
        Some(Ok(video)) => {
            Output::header(&video.title);
            Output::kv("Video", video.video_id.as_str());
            Output::kv("Transcript source", &video.origin.to_string());
            Output::kv("Chunks indexed", &video.chunks_indexed.to_string());
            Output::success(&transcript_length(video.word_count));
            println!();
            true
        }
        Some(Err(e)) => {
            Output::error(&e.to_string());
            if let Some(title) = app.title() {
                Output::info(&format!("Still chatting about: {}", title));
            }
            app.video().is_some()
        }
        None => {
            Output::warning("Loading cancelled.");
            app.video().is_some()
        }
    }
}
