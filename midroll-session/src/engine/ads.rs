//! Ad engine abstraction
//!
//! Mirrors the shape of client-side ad SDKs: a runtime produces a loader,
//! the loader answers ad requests with a manager, and a manager runs a
//! single ad break. Responses and break progress arrive asynchronously on
//! the session's ad event channel; nothing here blocks.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::surface::SlotGeometry;

/// Descriptive error reported by the ad engine
///
/// Ad errors never become `Err` values at the session surface; they travel
/// on the event channel and the coordinator absorbs them.
#[derive(Debug, Clone)]
pub struct AdErrorInfo {
    pub code: Option<u32>,
    pub message: String,
}

impl AdErrorInfo {
    pub fn new(code: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for AdErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// View mode an ads manager renders in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Normal,
    Fullscreen,
}

/// Composed ad request handed to the loader
#[derive(Debug, Clone)]
pub struct AdsRequest {
    /// Tag URL with the correlator parameter filled in
    pub tag_url: String,
    /// Slot for linear (full-viewport) creatives
    pub linear_slot: SlotGeometry,
    /// Slot for nonlinear (overlay) creatives
    pub nonlinear_slot: SlotGeometry,
}

impl AdsRequest {
    /// Compose a request, appending a fresh random correlator to the tag URL
    pub fn new(tag_url: &str, linear_slot: SlotGeometry, nonlinear_slot: SlotGeometry) -> Self {
        let correlator: u32 = rand::random();
        let tag_url = if tag_url.ends_with("correlator=") {
            format!("{}{}", tag_url, correlator)
        } else if tag_url.contains('?') {
            format!("{}&correlator={}", tag_url, correlator)
        } else {
            format!("{}?correlator={}", tag_url, correlator)
        };
        Self {
            tag_url,
            linear_slot,
            nonlinear_slot,
        }
    }
}

/// Events delivered by the ad engine on the session's ad event channel
pub enum AdEvent {
    /// An ad request resolved; the manager is ready to initialize
    ManagerLoaded { manager: Arc<dyn AdsManager> },
    /// An ad request failed
    LoaderError { error: AdErrorInfo },
    /// The engine wants content paused so an ad can play
    ContentPauseRequested,
    /// The engine is done with the viewport; content may resume
    ContentResumeRequested,
    /// The first ad in the break began rendering
    Started,
    /// Every ad in the break finished or was abandoned
    AllAdsCompleted,
    /// The manager failed during the break
    ManagerError { error: AdErrorInfo },
}

impl fmt::Debug for AdEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdEvent::ManagerLoaded { .. } => write!(f, "ManagerLoaded"),
            AdEvent::LoaderError { error } => write!(f, "LoaderError({})", error),
            AdEvent::ContentPauseRequested => write!(f, "ContentPauseRequested"),
            AdEvent::ContentResumeRequested => write!(f, "ContentResumeRequested"),
            AdEvent::Started => write!(f, "Started"),
            AdEvent::AllAdsCompleted => write!(f, "AllAdsCompleted"),
            AdEvent::ManagerError { error } => write!(f, "ManagerError({})", error),
        }
    }
}

/// Handle to a loaded ads manager for a single break
///
/// `stop` and `destroy` are safe in any order and any number of times,
/// including on a manager that never started.
pub trait AdsManager: Send + Sync {
    /// Size the manager's rendering and declare restore behavior
    fn init(
        &self,
        width: u32,
        height: u32,
        mode: ViewMode,
        restore_content_on_complete: bool,
    ) -> Result<(), AdErrorInfo>;

    /// Begin playing the break
    fn start(&self) -> Result<(), AdErrorInfo>;

    /// Abandon the break early
    fn stop(&self);

    /// Release manager resources
    fn destroy(&self);
}

/// Per-session loader for issuing ad requests
pub trait AdsLoader: Send + Sync {
    /// Prepare the rendering container; idempotent, required before a request
    fn initialize_container(&self);

    /// Issue an ad request
    ///
    /// The response arrives as `ManagerLoaded` or `LoaderError` on the
    /// event channel.
    fn request_ads(&self, request: &AdsRequest);

    /// Release loader resources; safe with a response still in flight
    fn destroy(&self);
}

/// Entry point to an ad engine runtime
pub trait AdEngine: Send + Sync {
    /// Create the session's loader, wiring responses into `events`
    ///
    /// Fails when the runtime is unavailable; the session then degrades to
    /// content-only operation.
    fn create_loader(
        &self,
        events: mpsc::UnboundedSender<AdEvent>,
    ) -> Result<Box<dyn AdsLoader>, AdErrorInfo>;
}
