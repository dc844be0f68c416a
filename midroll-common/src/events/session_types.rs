//! Session-related type definitions
//!
//! Supporting types for the playback/ad orchestration state machine.

use serde::{Deserialize, Serialize};

/// Content playback state enumeration
///
/// Owned by the playback session and mutated only by content-engine event
/// translation. `Error` is terminal until an explicit reload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Buffering,
    Ended,
    Error,
}

impl PlaybackState {
    /// True once a load has succeeded and the engine can meaningfully
    /// receive transport commands and ad checks.
    pub fn is_media_active(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Buffering
        )
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Ready => write!(f, "ready"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Buffering => write!(f, "buffering"),
            PlaybackState::Ended => write!(f, "ended"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}

/// Ad subsystem state enumeration
///
/// Owned by the ad break coordinator. `Completed` and `Error` both return to
/// `Idle` once content playback has been resumed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdState {
    Idle,
    Requesting,
    Loaded,
    Playing,
    Completed,
    Error,
}

impl std::fmt::Display for AdState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdState::Idle => write!(f, "idle"),
            AdState::Requesting => write!(f, "requesting"),
            AdState::Loaded => write!(f, "loaded"),
            AdState::Playing => write!(f, "playing"),
            AdState::Completed => write!(f, "completed"),
            AdState::Error => write!(f, "error"),
        }
    }
}

/// Session-level state, derived from playback state and ad state
///
/// Ad errors never escalate here; only an unrecoverable content load failure
/// produces `Error`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum SessionState {
    ContentOnly,
    AdRequested,
    AdPlaying,
    Error,
}

impl SessionState {
    /// Derive the session state from the two sub-states.
    pub fn derive(playback: PlaybackState, ad: AdState) -> Self {
        if playback == PlaybackState::Error {
            return SessionState::Error;
        }
        match ad {
            AdState::Requesting | AdState::Loaded => SessionState::AdRequested,
            AdState::Playing => SessionState::AdPlaying,
            _ => SessionState::ContentOnly,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::ContentOnly => write!(f, "ContentOnly"),
            SessionState::AdRequested => write!(f, "AdRequested"),
            SessionState::AdPlaying => write!(f, "AdPlaying"),
            SessionState::Error => write!(f, "Error"),
        }
    }
}

/// Why a session closed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum CloseReason {
    /// Viewer pressed a designated cancel input (Escape / Back)
    UserInput,
    /// Process shutdown (signal or embedder teardown)
    Shutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::UserInput => write!(f, "UserInput"),
            CloseReason::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Why an ad check did not produce a request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum AdSkipReason {
    /// Minimum inter-ad interval has not elapsed
    Throttled,
    /// Ad runtime never became available; ad subsystem is a permanent no-op
    RuntimeUnavailable,
}

impl std::fmt::Display for AdSkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdSkipReason::Throttled => write!(f, "Throttled"),
            AdSkipReason::RuntimeUnavailable => write!(f, "RuntimeUnavailable"),
        }
    }
}

/// Full session status snapshot
///
/// Served as the `/session/status` response body and embedded in the SSE
/// `InitialState` event so new subscribers start from a consistent view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStatusInfo {
    /// Derived session-level state
    pub session_state: SessionState,
    /// Content playback state
    pub playback_state: PlaybackState,
    /// Ad subsystem state
    pub ad_state: AdState,
    /// Current playback position in milliseconds
    pub position_ms: u64,
    /// Content duration in milliseconds (None until loaded)
    pub duration_ms: Option<u64>,
    /// Position formatted for display (m:ss or h:mm:ss)
    pub position_display: String,
    /// Current volume (0.0-1.0)
    pub volume: f32,
    /// Whether audio is muted (volume == 0)
    pub muted: bool,
    /// Whether the rendering surface is fullscreen
    pub fullscreen: bool,
}
