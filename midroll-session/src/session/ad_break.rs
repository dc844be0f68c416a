//! Ad break lifecycle coordination
//!
//! Owns the ad state machine, the request throttle, and the managed loader
//! and manager handles. Every ad request funnels through
//! [`AdBreakCoordinator::maybe_request_ads`], the sole admission point.
//! Admission arms the throttle in the same step, so concurrent callers
//! cannot double-spend the window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use midroll_common::events::{AdSkipReason, AdState, SessionEvent};
use midroll_common::{time, EventLog};

use crate::engine::{
    AdEngine, AdErrorInfo, AdEvent, AdsLoader, AdsManager, AdsRequest, SlotGeometry, VideoSurface,
    ViewMode,
};
use crate::session::playback::PlaybackSession;

/// Height of the nonlinear (overlay) ad slot
pub const NONLINEAR_SLOT_HEIGHT: u32 = 150;

/// Minimum spacing between ad requests unless configured otherwise
pub const DEFAULT_MIN_AD_INTERVAL: Duration = Duration::from_secs(300);

/// Decision from the admission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Request admitted; the window is armed as of this decision
    Admit,
    /// Inside the minimum interval
    Throttled { remaining: Duration },
}

/// Minimum-interval admission window for ad requests
///
/// Arming happens inside the admission decision itself; there is no
/// separate "mark requested" step to forget or reorder. A refused check
/// leaves the window untouched.
#[derive(Debug)]
pub struct ThrottleWindow {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl ThrottleWindow {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: None,
            min_interval,
        }
    }

    /// Admit or refuse a request at `now`; admission arms the window
    pub fn try_admit(&mut self, now: Instant) -> ThrottleDecision {
        if let Some(last) = self.last_request {
            let elapsed = now.duration_since(last);
            if elapsed < self.min_interval {
                return ThrottleDecision::Throttled {
                    remaining: self.min_interval - elapsed,
                };
            }
        }
        self.last_request = Some(now);
        ThrottleDecision::Admit
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Coordinates the ad half of a session
///
/// Absorbs every ad-side failure: a missing runtime degrades the session
/// to content-only, and request or break errors fall back to resuming
/// content. Nothing here ever escalates to the session error state.
pub struct AdBreakCoordinator {
    playback: Arc<PlaybackSession>,
    surface: Arc<dyn VideoSurface>,
    log: Arc<EventLog>,
    tag_url: String,
    ad_state: RwLock<AdState>,
    throttle: StdMutex<ThrottleWindow>,
    loader: Mutex<Option<Box<dyn AdsLoader>>>,
    manager: Mutex<Option<Arc<dyn AdsManager>>>,
    initialized: AtomicBool,
    destroyed: AtomicBool,
}

impl AdBreakCoordinator {
    pub fn new(
        playback: Arc<PlaybackSession>,
        surface: Arc<dyn VideoSurface>,
        log: Arc<EventLog>,
        tag_url: String,
        min_interval: Duration,
    ) -> Self {
        Self {
            playback,
            surface,
            log,
            tag_url,
            ad_state: RwLock::new(AdState::Idle),
            throttle: StdMutex::new(ThrottleWindow::new(min_interval)),
            loader: Mutex::new(None),
            manager: Mutex::new(None),
            initialized: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Bind the ad runtime; called once when the session mounts
    ///
    /// A missing or failing runtime is not an error: the degradation is
    /// logged once and every later ad check becomes a no-op.
    pub async fn initialize(
        &self,
        runtime: Option<Arc<dyn AdEngine>>,
        events: mpsc::UnboundedSender<AdEvent>,
    ) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!("Ad coordinator initialized twice, ignoring");
            return;
        }
        let Some(engine) = runtime else {
            warn!("Ad runtime not present, continuing without ads");
            self.log.append(SessionEvent::AdRuntimeUnavailable {
                timestamp: time::now(),
                message: "ad runtime not present".to_string(),
            });
            return;
        };
        match engine.create_loader(events) {
            Ok(loader) => {
                debug!("Ads loader created");
                *self.loader.lock().await = Some(loader);
            }
            Err(error) => {
                warn!("Ad runtime failed to initialize: {}", error);
                self.log.append(SessionEvent::AdRuntimeUnavailable {
                    timestamp: time::now(),
                    message: error.to_string(),
                });
            }
        }
    }

    pub async fn ad_state(&self) -> AdState {
        *self.ad_state.read().await
    }

    /// Sole admission point for ad requests; returns whether one was issued
    ///
    /// Degraded mode skips before the throttle is consulted, so the window
    /// is never armed by a request that cannot be made.
    pub async fn maybe_request_ads(&self, now: Instant) -> bool {
        if self.destroyed.load(Ordering::SeqCst) {
            return false;
        }

        if self.loader.lock().await.is_none() {
            debug!("Ad check skipped, runtime unavailable");
            self.log.append(SessionEvent::AdRequestSkipped {
                timestamp: time::now(),
                reason: AdSkipReason::RuntimeUnavailable,
                remaining_ms: None,
            });
            return false;
        }

        let decision = {
            let mut throttle = self.throttle.lock().unwrap();
            throttle.try_admit(now)
        };
        match decision {
            ThrottleDecision::Throttled { remaining } => {
                debug!("Ad check throttled, {}s remaining", remaining.as_secs());
                self.log.append(SessionEvent::AdRequestSkipped {
                    timestamp: time::now(),
                    reason: AdSkipReason::Throttled,
                    remaining_ms: Some(remaining.as_millis() as u64),
                });
                false
            }
            ThrottleDecision::Admit => {
                self.request_ads().await;
                true
            }
        }
    }

    /// Issue one ad request; reached only through the admission gate
    async fn request_ads(&self) {
        // Slot geometry is read at request time, never cached
        let viewport = self.surface.viewport();
        let request = AdsRequest::new(
            &self.tag_url,
            viewport,
            SlotGeometry::new(viewport.width, NONLINEAR_SLOT_HEIGHT),
        );

        self.set_ad_state(AdState::Requesting).await;
        {
            let guard = self.loader.lock().await;
            let Some(loader) = guard.as_ref() else {
                // Torn down between admission and issue
                return;
            };
            loader.initialize_container();
            loader.request_ads(&request);
        }
        info!("Ad request issued");
        self.log.append(SessionEvent::AdRequested {
            timestamp: time::now(),
            tag_url: request.tag_url,
        });
    }

    /// Apply one ad engine event
    pub async fn on_ad_event(&self, event: AdEvent) {
        if self.destroyed.load(Ordering::SeqCst) {
            // A response that raced teardown still owns a manager handle
            if let AdEvent::ManagerLoaded { manager } = event {
                manager.destroy();
            }
            return;
        }
        match event {
            AdEvent::ManagerLoaded { manager } => self.on_manager_loaded(manager).await,
            AdEvent::LoaderError { error } => {
                warn!("Ad request failed: {}", error);
                self.handle_ad_error(error).await;
            }
            AdEvent::ManagerError { error } => {
                warn!("Ad break failed: {}", error);
                self.handle_ad_error(error).await;
            }
            AdEvent::ContentPauseRequested => {
                debug!("Ad engine requested content pause");
                self.playback.pause_for_ad();
            }
            AdEvent::ContentResumeRequested => {
                debug!("Ad engine released the viewport");
                self.playback.resume_after_ad();
            }
            AdEvent::Started => {
                self.set_ad_state(AdState::Playing).await;
                self.log.append(SessionEvent::AdBreakStarted {
                    timestamp: time::now(),
                });
            }
            AdEvent::AllAdsCompleted => self.on_all_ads_completed().await,
        }
    }

    /// Stop a running break early, if any
    pub async fn stop_active_break(&self) {
        let guard = self.manager.lock().await;
        if let Some(manager) = guard.as_ref() {
            info!("Stopping active ad break");
            manager.stop();
        }
    }

    /// Tear down the ad side; idempotent, manager first then loader
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Destroying ad break coordinator");
        self.destroy_manager().await;
        if let Some(loader) = self.loader.lock().await.take() {
            loader.destroy();
        }
    }

    async fn on_manager_loaded(&self, manager: Arc<dyn AdsManager>) {
        self.log.append(SessionEvent::AdsManagerLoaded {
            timestamp: time::now(),
        });
        *self.manager.lock().await = Some(manager.clone());
        self.set_ad_state(AdState::Loaded).await;

        // Geometry and view mode are read now, not at request time
        let viewport = self.surface.viewport();
        let mode = if self.surface.is_fullscreen() {
            ViewMode::Fullscreen
        } else {
            ViewMode::Normal
        };
        if let Err(error) = manager.init(viewport.width, viewport.height, mode, true) {
            warn!("Ads manager init failed: {}", error);
            self.handle_ad_error(error).await;
            return;
        }
        if let Err(error) = manager.start() {
            warn!("Ads manager start failed: {}", error);
            self.handle_ad_error(error).await;
        }
    }

    async fn on_all_ads_completed(&self) {
        debug!("All ads completed");
        self.set_ad_state(AdState::Completed).await;
        self.destroy_manager().await;
        // Never leave the viewer paused after a break
        if self.playback.is_paused() {
            self.playback.resume_after_ad();
        }
        self.log.append(SessionEvent::AdBreakCompleted {
            timestamp: time::now(),
        });
        self.set_ad_state(AdState::Idle).await;
    }

    /// Absorb an ad failure: tear down the break and fall back to content
    ///
    /// Content resume happens in the same handling cycle as the error, and
    /// exactly once.
    async fn handle_ad_error(&self, error: AdErrorInfo) {
        self.destroy_manager().await;
        self.set_ad_state(AdState::Error).await;
        self.log.append(SessionEvent::AdError {
            timestamp: time::now(),
            code: error.code,
            message: error.message,
        });
        self.playback.resume_after_ad();
        self.set_ad_state(AdState::Idle).await;
    }

    async fn destroy_manager(&self) {
        // Take-then-destroy; a never-built manager makes this a no-op
        if let Some(manager) = self.manager.lock().await.take() {
            manager.destroy();
        }
    }

    async fn set_ad_state(&self, new_state: AdState) {
        let old_state = {
            let mut state = self.ad_state.write().await;
            let old = *state;
            *state = new_state;
            old
        };
        if old_state != new_state {
            debug!("Ad state: {} -> {}", old_state, new_state);
            self.log.append(SessionEvent::AdStateChanged {
                timestamp: time::now(),
                old_state,
                new_state,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_check_admits() {
        let mut window = ThrottleWindow::new(Duration::from_secs(300));
        assert_eq!(window.try_admit(Instant::now()), ThrottleDecision::Admit);
    }

    #[test]
    fn test_window_throttles_then_reopens() {
        let mut window = ThrottleWindow::new(Duration::from_secs(300));
        let start = Instant::now();
        assert_eq!(window.try_admit(start), ThrottleDecision::Admit);

        // 60 seconds later: inside the window
        match window.try_admit(start + Duration::from_secs(60)) {
            ThrottleDecision::Throttled { remaining } => {
                assert_eq!(remaining, Duration::from_secs(240));
            }
            other => panic!("expected Throttled, got {:?}", other),
        }

        // 301 seconds after the first admission: window reopened
        assert_eq!(
            window.try_admit(start + Duration::from_secs(301)),
            ThrottleDecision::Admit
        );

        // The new window counts from the second admission
        match window.try_admit(start + Duration::from_secs(302)) {
            ThrottleDecision::Throttled { remaining } => {
                assert_eq!(remaining, Duration::from_secs(299));
            }
            other => panic!("expected Throttled, got {:?}", other),
        }
    }

    #[test]
    fn test_refused_checks_do_not_rearm() {
        let mut window = ThrottleWindow::new(Duration::from_secs(300));
        let start = Instant::now();
        window.try_admit(start);

        // Repeated refusals never push the window forward
        for offset in [60, 120, 299] {
            assert!(matches!(
                window.try_admit(start + Duration::from_secs(offset)),
                ThrottleDecision::Throttled { .. }
            ));
        }
        assert_eq!(
            window.try_admit(start + Duration::from_secs(300)),
            ThrottleDecision::Admit
        );
    }

    #[test]
    fn test_interval_boundary_admits() {
        let mut window = ThrottleWindow::new(Duration::from_secs(300));
        let start = Instant::now();
        window.try_admit(start);
        // Exactly at the boundary counts as outside the window
        assert_eq!(
            window.try_admit(start + Duration::from_secs(300)),
            ThrottleDecision::Admit
        );
    }
}
