//! API request handlers

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use midroll_common::events::{SessionEvent, SessionStatusInfo};

use super::AppState;
use crate::error::Error;

/// Generic status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Content load request
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadRequest {
    pub uri: String,
}

/// Seek request
#[derive(Debug, Serialize, Deserialize)]
pub struct SeekRequest {
    pub position_ms: u64,
}

/// Volume request (user-facing scale 0-100)
#[derive(Debug, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub volume: u8,
}

/// Volume response (user-facing scale 0-100)
#[derive(Debug, Serialize, Deserialize)]
pub struct VolumeResponse {
    pub volume: u8,
    pub muted: bool,
}

/// Key input request
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyRequest {
    pub key: String,
}

/// Key input response
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyResponse {
    pub handled: bool,
}

/// Fullscreen response
#[derive(Debug, Serialize, Deserialize)]
pub struct FullscreenResponse {
    pub fullscreen: bool,
}

/// Recent events response
#[derive(Debug, Serialize)]
pub struct RecentEventsResponse {
    pub events: Vec<SessionEvent>,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

fn error_response(error: Error) -> HandlerError {
    let status = match &error {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::InvalidState(_) | Error::ContentLoad(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(StatusResponse {
            status: error.to_string(),
        }),
    )
}

/// Convert system volume (0.0-1.0) to user-facing volume (0-100)
fn user_volume(system_volume: f32) -> u8 {
    (system_volume * 100.0).ceil() as u8
}

/// GET /api/v1/session/status
pub async fn get_status(State(state): State<AppState>) -> Json<SessionStatusInfo> {
    Json(state.controller.status().await)
}

/// POST /api/v1/session/load
pub async fn load_content(
    State(state): State<AppState>,
    Json(req): Json<LoadRequest>,
) -> Result<Json<StatusResponse>, HandlerError> {
    info!("Load requested: {}", req.uri);
    state.controller.load(&req.uri).await.map_err(|e| {
        error!("Load failed: {}", e);
        error_response(e)
    })?;
    Ok(Json(StatusResponse {
        status: "loading".to_string(),
    }))
}

/// POST /api/v1/playback/play
pub async fn play(State(state): State<AppState>) -> Result<Json<StatusResponse>, HandlerError> {
    info!("Play requested");
    state.controller.play().await.map_err(|e| {
        error!("Play failed: {}", e);
        error_response(e)
    })?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /api/v1/playback/pause
pub async fn pause(State(state): State<AppState>) -> Result<Json<StatusResponse>, HandlerError> {
    info!("Pause requested");
    state.controller.pause().await.map_err(|e| {
        error!("Pause failed: {}", e);
        error_response(e)
    })?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /api/v1/playback/toggle
pub async fn toggle_play(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, HandlerError> {
    info!("Toggle play requested");
    state.controller.toggle_play().await.map_err(|e| {
        error!("Toggle failed: {}", e);
        error_response(e)
    })?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /api/v1/playback/seek
pub async fn seek(
    State(state): State<AppState>,
    Json(req): Json<SeekRequest>,
) -> Result<Json<StatusResponse>, HandlerError> {
    info!("Seek requested: {}ms", req.position_ms);
    state.controller.seek(req.position_ms).await.map_err(|e| {
        error!("Seek failed: {}", e);
        error_response(e)
    })?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// GET /api/v1/audio/volume
pub async fn get_volume(State(state): State<AppState>) -> Json<VolumeResponse> {
    Json(VolumeResponse {
        volume: user_volume(state.controller.volume()),
        muted: state.controller.is_muted(),
    })
}

/// POST /api/v1/audio/volume
pub async fn set_volume(
    State(state): State<AppState>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<VolumeResponse>, HandlerError> {
    if req.volume > 100 {
        return Err(error_response(Error::InvalidInput(format!(
            "volume {} out of range 0-100",
            req.volume
        ))));
    }
    info!("Volume set to {}", req.volume);
    let system_volume = req.volume as f32 / 100.0;
    state
        .controller
        .set_volume(system_volume)
        .await
        .map_err(|e| {
            error!("Set volume failed: {}", e);
            error_response(e)
        })?;
    Ok(Json(VolumeResponse {
        volume: req.volume,
        muted: req.volume == 0,
    }))
}

/// POST /api/v1/audio/mute
pub async fn toggle_mute(
    State(state): State<AppState>,
) -> Result<Json<VolumeResponse>, HandlerError> {
    info!("Mute toggle requested");
    state.controller.toggle_mute().await.map_err(|e| {
        error!("Mute toggle failed: {}", e);
        error_response(e)
    })?;
    Ok(Json(VolumeResponse {
        volume: user_volume(state.controller.volume()),
        muted: state.controller.is_muted(),
    }))
}

/// POST /api/v1/display/fullscreen
pub async fn toggle_fullscreen(
    State(state): State<AppState>,
) -> Result<Json<FullscreenResponse>, HandlerError> {
    info!("Fullscreen toggle requested");
    state.controller.toggle_fullscreen().await.map_err(|e| {
        error!("Fullscreen toggle failed: {}", e);
        error_response(e)
    })?;
    Ok(Json(FullscreenResponse {
        fullscreen: state.controller.is_fullscreen(),
    }))
}

/// POST /api/v1/input/key
pub async fn key_input(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> Json<KeyResponse> {
    info!("Key input: {}", req.key);
    let handled = state.controller.on_key_input(&req.key).await;
    Json(KeyResponse { handled })
}

/// GET /api/v1/events/recent
pub async fn recent_events(State(state): State<AppState>) -> Json<RecentEventsResponse> {
    Json(RecentEventsResponse {
        events: state.log.recent(),
    })
}
