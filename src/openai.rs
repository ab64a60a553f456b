//! OpenAI client construction for a session credential.

use crate::config::Credential;
use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};

/// Create an OpenAI client authorised with the given credential.
///
/// No request timeout is set; long answers are bounded by the caller.
pub fn create_client(credential: &Credential) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().build()?;

    let config = OpenAIConfig::new().with_api_key(credential.expose());
    Ok(Client::with_config(config).with_http_client(http_client))
}
