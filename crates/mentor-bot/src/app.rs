use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{json, Value};

use mentor_core::config::MentorConfig;
use mentor_study::subjects;

use crate::auth::{self, AuthUser};

/// Shared state for the HTTP side: health metadata and the OAuth session map.
pub struct AppState {
    pub config: MentorConfig,
    pub started_at: DateTime<Utc>,
    pub http_client: reqwest::Client,
    /// user_id → authenticated user record.
    pub web_users: DashMap<String, AuthUser>,
}

impl AppState {
    pub fn new(config: MentorConfig) -> Self {
        Self {
            config,
            started_at: Utc::now(),
            http_client: reqwest::Client::new(),
            web_users: DashMap::new(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(alive_handler))
        .route("/health", get(health_handler))
        .route("/catalog", get(catalog_handler))
        .route("/auth/login", get(auth::login_handler))
        .route("/auth/callback", get(auth::callback_handler))
        .route("/auth/me", get(auth::me_handler))
        .fallback(not_found)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// GET / — keep-alive probe for external uptime pingers.
async fn alive_handler() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /health — liveness probe with process metadata.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
    }))
}

/// GET /catalog — the question-bank catalog, the only surface shared with
/// the companion web UI.
async fn catalog_handler() -> Json<Value> {
    let entries: Vec<Value> = subjects::SUBJECTS
        .iter()
        .map(|s| {
            json!({
                "subject": s,
                "display": subjects::display_name(s),
                "chapters11": subjects::chapters(11, s).unwrap_or_default(),
                "chapters12": subjects::chapters(12, s).unwrap_or_default(),
            })
        })
        .collect();
    Json(json!({ "subjects": entries }))
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
