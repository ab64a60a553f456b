//! The OpenAI API key, held in memory for the lifetime of a session.

use crate::error::{Result, TubechatError};
use std::fmt;

/// Environment variable consulted when no key is given explicitly.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Provider API key. Never written to disk and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Validate and wrap an API key.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(TubechatError::Config(format!(
                "API key is empty. Enter one or set it with: export {}='sk-...'",
                API_KEY_ENV
            )));
        }
        if key.chars().any(char::is_whitespace) {
            return Err(TubechatError::Config(
                "API key must not contain whitespace".to_string(),
            ));
        }
        Ok(Self(key))
    }

    /// Use the explicit key if present and non-blank, else the environment.
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        match explicit.filter(|k| !k.trim().is_empty()) {
            Some(key) => Self::new(key),
            None => match std::env::var(API_KEY_ENV) {
                Ok(key) => Self::new(key),
                Err(_) => Err(TubechatError::Config(format!(
                    "{} not set. Enter an API key or set it with: export {}='sk-...'",
                    API_KEY_ENV, API_KEY_ENV
                ))),
            },
        }
    }

    /// The raw key, for handing to the provider client only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
