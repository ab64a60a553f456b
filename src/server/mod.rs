//! Web interface: a single page plus a JSON API.
//!
//! Every browser session gets its own [`App`], created on demand and kept in
//! a registry keyed by a random session ID. Requests against one session are
//! serialized by its mutex; sessions don't share state.
//!
//! The registry is bounded. Sessions idle for longer than
//! `server.session_idle_secs` are dropped, and creating a session beyond
//! `server.max_sessions` evicts the least recently used one. Dropping a
//! session removes its index directory.

use crate::app::{App, ChatTurn, LoadState, SessionSnapshot};
use crate::config::{Credential, ServerSettings};
use crate::error::TubechatError;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

const INDEX_HTML: &str = include_str!("index.html");

/// How often idle sessions are swept while serving.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One browser session.
struct Session {
    app: Mutex<App>,
    /// Last snapshot taken under the app lock, served while a load or question is running.
    published: RwLock<SessionSnapshot>,
}

impl Session {
    fn new(app: App) -> Self {
        let published = RwLock::new(app.snapshot());
        Self {
            app: Mutex::new(app),
            published,
        }
    }

    async fn publish(&self, snapshot: SessionSnapshot) -> SessionSnapshot {
        *self.published.write().await = snapshot.clone();
        snapshot
    }
}

struct SessionEntry {
    session: Arc<Session>,
    last_seen: Instant,
}

/// Shared server state.
pub struct ServerState {
    prototype: App,
    default_credential: Option<Credential>,
    max_sessions: usize,
    idle_timeout: Duration,
    allowed_origins: Vec<String>,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl ServerState {
    /// `prototype` supplies the collaborators for every new session.
    /// `default_credential` is used when a load request carries no API key.
    pub fn new(
        prototype: App,
        default_credential: Option<Credential>,
        settings: &ServerSettings,
    ) -> Self {
        Self {
            prototype,
            default_credential,
            max_sessions: settings.max_sessions.max(1),
            idle_timeout: Duration::from_secs(settings.session_idle_secs),
            allowed_origins: settings.allowed_origins.clone(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn create_session(&self) -> (Uuid, Arc<Session>) {
        let id = Uuid::new_v4();
        let session = Arc::new(Session::new(self.prototype.fresh()));
        let now = Instant::now();

        let mut sessions = self.sessions.write().await;
        self.drop_expired(&mut sessions, now);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => {
                    sessions.remove(&oldest);
                    info!("Evicted least recently used session {}", oldest);
                }
                None => break,
            }
        }
        sessions.insert(
            id,
            SessionEntry {
                session: session.clone(),
                last_seen: now,
            },
        );

        debug!("Created session {} ({} active)", id, sessions.len());
        (id, session)
    }

    /// Look up a live session and mark it as used.
    async fn session(&self, id: Uuid) -> Result<Arc<Session>, ApiError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get_mut(&id) {
            Some(entry) if now.duration_since(entry.last_seen) <= self.idle_timeout => {
                entry.last_seen = now;
                return Ok(entry.session.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            sessions.remove(&id);
            info!("Removed idle session {}", id);
        }
        Err(ApiError::UnknownSession(id))
    }

    async fn remove_session(&self, id: Uuid) -> Result<(), ApiError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                info!("Closed session {}", id);
                Ok(())
            }
            None => Err(ApiError::UnknownSession(id)),
        }
    }

    /// Drop every session idle for longer than the timeout. Returns how many were dropped.
    pub async fn prune_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.drop_expired(&mut sessions, Instant::now())
    }

    fn drop_expired(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) -> usize {
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_seen) > self.idle_timeout)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            sessions.remove(id);
            info!("Removed idle session {}", id);
        }
        expired.len()
    }

    #[cfg(test)]
    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// CORS for the configured origins only. Without any, browsers keep to same-origin.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid allowed origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

/// Build the router over `state`.
pub fn router(state: Arc<ServerState>) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/load", post(load))
        .route("/api/sessions/{id}/ask", post(ask));

    if let Some(cors) = cors_layer(&state.allowed_origins) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: &str, state: Arc<ServerState>) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweeper.prune_expired().await;
            if removed > 0 {
                debug!("Swept {} idle sessions", removed);
            }
        }
    });

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct LoadRequest {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct SessionResponse {
    id: Uuid,
    #[serde(flatten)]
    session: SessionSnapshot,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

#[derive(Debug)]
enum ApiError {
    UnknownSession(Uuid),
    /// The request itself could not be read (bad path, body or content type).
    Rejected(StatusCode, String),
    App(TubechatError),
}

impl From<TubechatError> for ApiError {
    fn from(e: TubechatError) -> Self {
        ApiError::App(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::UnknownSession(id) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: format!("Session not found: {}", id),
                    kind: "unknown_session",
                },
            ),
            ApiError::Rejected(status, error) => (
                status,
                ErrorResponse {
                    error,
                    kind: "invalid_input",
                },
            ),
            ApiError::App(e) => {
                let status = match &e {
                    TubechatError::Config(_)
                    | TubechatError::InvalidReference(_)
                    | TubechatError::NotReady(_)
                    | TubechatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    TubechatError::TranscriptUnavailable(_) => StatusCode::NOT_FOUND,
                    _ if e.kind() == "engine_failure" => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (
                    status,
                    ErrorResponse {
                        error: e.to_string(),
                        kind: e.kind(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

// === Handlers ===

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_session(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let (id, session) = state.create_session().await;
    let session = session.published.read().await.clone();
    (StatusCode::CREATED, Json(SessionResponse { id, session }))
}

/// Never waits on a running load or question; reports the last published snapshot instead.
async fn get_session(
    State(state): State<Arc<ServerState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Path(id) = path?;
    let session = state.session(id).await?;

    let snapshot = match session.app.try_lock() {
        Ok(mut app) => {
            app.settle_interrupted_load();
            session.publish(app.snapshot()).await
        }
        Err(_) => session.published.read().await.clone(),
    };

    Ok(Json(SessionResponse {
        id,
        session: snapshot,
    }))
}

async fn delete_session(
    State(state): State<Arc<ServerState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.remove_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn load(
    State(state): State<Arc<ServerState>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<LoadRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let session = state.session(id).await?;

    let api_key = req
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| state.default_credential.as_ref().map(Credential::expose));

    let mut app = session.app.lock().await;
    session
        .publish(SessionSnapshot {
            state: LoadState::Loading,
            ..app.snapshot()
        })
        .await;

    let result = app.configure(api_key, req.video_url.as_deref()).await;
    let snapshot = session.publish(app.snapshot()).await;
    result?;

    Ok(Json(SessionResponse {
        id,
        session: snapshot,
    }))
}

async fn ask(
    State(state): State<Arc<ServerState>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<ChatTurn>, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let session = state.session(id).await?;

    let mut app = session.app.lock().await;
    let result = app.ask(&req.question).await;
    session.publish(app.snapshot()).await;
    Ok(Json(result?))
}
