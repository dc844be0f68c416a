//! REST API implementation for the session daemon

pub mod handlers;
pub mod sse;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use midroll_common::EventLog;

use crate::session::controller::SessionController;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Session controller
    pub controller: Arc<SessionController>,
    /// Event log feeding SSE and the recent-events endpoint
    pub log: Arc<EventLog>,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(health_check))

        // API v1 routes
        .nest("/api/v1", Router::new()
            // Session endpoints
            .route("/session/status", get(handlers::get_status))
            .route("/session/load", post(handlers::load_content))

            // Playback control endpoints
            .route("/playback/play", post(handlers::play))
            .route("/playback/pause", post(handlers::pause))
            .route("/playback/toggle", post(handlers::toggle_play))
            .route("/playback/seek", post(handlers::seek))

            // Audio endpoints
            .route("/audio/volume", get(handlers::get_volume))
            .route("/audio/volume", post(handlers::set_volume))
            .route("/audio/mute", post(handlers::toggle_mute))

            // Display endpoints
            .route("/display/fullscreen", post(handlers::toggle_fullscreen))

            // Input routing
            .route("/input/key", post(handlers::key_input))

            // SSE events
            .route("/events", get(sse::event_stream))
            .route("/events/recent", get(handlers::recent_events))
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "midroll-session",
        "version": env!("CARGO_PKG_VERSION"),
        "build": {
            "commit": env!("GIT_HASH"),
            "timestamp": env!("BUILD_TIMESTAMP"),
            "profile": env!("BUILD_PROFILE"),
        },
        "port": state.port,
        "session_id": state.controller.session_id(),
    }))
}
