//! Print a video's title.

use crate::config::Settings;
use crate::title::{OembedTitleResolver, TitleResolver};
use crate::video::extract_video_id;
use anyhow::Result;

pub async fn run_title(video_url: &str, settings: Settings) -> Result<()> {
    let video_id = extract_video_id(video_url)?;
    let resolver = OembedTitleResolver::new(&settings.youtube)?;
    println!("{}", resolver.fetch_title(&video_id).await);
    Ok(())
}
