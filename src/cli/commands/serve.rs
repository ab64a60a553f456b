//! Web interface command.

use crate::app::App;
use crate::cli::Output;
use crate::config::{Credential, Settings};
use crate::server::{self, ServerState};
use anyhow::Result;
use std::sync::Arc;

/// Run the web server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    api_key: Option<&str>,
    settings: Settings,
) -> Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let default_credential = match api_key.filter(|k| !k.trim().is_empty()) {
        Some(key) => Some(Credential::new(key)?),
        None => None,
    };

    let prototype = App::from_settings(&settings)?;
    let state = Arc::new(ServerState::new(
        prototype,
        default_credential.clone(),
        &settings.server,
    ));

    let addr = format!("{}:{}", host, port);

    Output::header("tubechat");
    println!();
    Output::success(&format!("Open http://{} in your browser", addr));
    if default_credential.is_some() {
        Output::info("Using the server's API key when the page leaves it blank.");
        if !is_loopback(&host) {
            Output::warning("Anyone who can reach this address can spend the server's API key.");
        }
    } else {
        Output::warning("No server API key; each session must enter its own.");
    }
    println!();
    Output::kv("Page", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("New session", "POST /api/sessions");
    Output::kv("Load video", "POST /api/sessions/{id}/load");
    Output::kv("Ask", "POST /api/sessions/{id}/ask");
    Output::kv("Close session", "DELETE /api/sessions/{id}");
    Output::kv(
        "Sessions",
        &format!(
            "up to {}, dropped after {}s idle",
            settings.server.max_sessions, settings.server.session_idle_secs
        ),
    );
    if !settings.server.allowed_origins.is_empty() {
        Output::kv("Allowed origins", &settings.server.allowed_origins.join(", "));
    }
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    server::serve(&addr, state).await?;

    Ok(())
}

fn is_loopback(host: &str) -> bool {
    host == "localhost"
        || host
            .parse::<std::net::IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}
