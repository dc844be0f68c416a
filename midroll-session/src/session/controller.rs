//! Session controller
//!
//! Owns the event pump that serializes every state mutation in the
//! session. Content engine events, ad engine events, and the progress
//! ticker all flow through one `select!` loop, so handlers never race each
//! other and pause/resume always happen in the same cycle as the event
//! that caused them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use midroll_common::events::{
    CloseReason, PlaybackState, SessionEvent, SessionState, SessionStatusInfo,
};
use midroll_common::{human_time, time, EventLog};

use crate::engine::{AdEngine, AdEvent, ContentEngine, ContentEvent, VideoSurface};
use crate::error::{Error, Result};
use crate::session::ad_break::AdBreakCoordinator;
use crate::session::playback::PlaybackSession;

/// Keys that close the session
const CLOSE_KEYS: [&str; 3] = ["Escape", "Back", "Backspace"];

/// Options for mounting a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Content URI loaded at mount
    pub content_uri: String,
    /// VAST ad tag URL
    pub ad_tag_url: String,
    /// Minimum spacing between ad requests
    pub min_ad_interval: Duration,
    /// Interval between playback progress events
    pub progress_interval: Duration,
}

pub struct SessionController {
    session_id: Uuid,
    playback: Arc<PlaybackSession>,
    ads: Arc<AdBreakCoordinator>,
    log: Arc<EventLog>,
    session_state: RwLock<SessionState>,
    latest_metadata: RwLock<Option<serde_json::Value>>,
    close_tx: watch::Sender<Option<CloseReason>>,
    shutdown_tx: std::sync::Mutex<Option<oneshot::Sender<()>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    closing: AtomicBool,
    destroyed: AtomicBool,
}

impl SessionController {
    /// Build the session, bind the ad runtime, start the event pump, and
    /// kick off the initial content load
    ///
    /// Fails fast when the environment cannot host the content engine or
    /// the content URI is empty. An ad runtime failure never fails the
    /// mount; the session degrades to content-only instead.
    pub async fn mount(
        content_engine: Arc<dyn ContentEngine>,
        ad_engine: Option<Arc<dyn AdEngine>>,
        surface: Arc<dyn VideoSurface>,
        log: Arc<EventLog>,
        options: SessionOptions,
    ) -> Result<Arc<Self>> {
        if options.content_uri.trim().is_empty() {
            return Err(Error::InvalidInput(
                "content uri must not be empty".to_string(),
            ));
        }

        let playback = Arc::new(PlaybackSession::new(
            content_engine.clone(),
            surface.clone(),
            log.clone(),
        )?);
        let ads = Arc::new(AdBreakCoordinator::new(
            playback.clone(),
            surface,
            log.clone(),
            options.ad_tag_url.clone(),
            options.min_ad_interval,
        ));

        let (close_tx, _) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let controller = Arc::new(Self {
            session_id: Uuid::new_v4(),
            playback,
            ads,
            log: log.clone(),
            session_state: RwLock::new(SessionState::ContentOnly),
            latest_metadata: RwLock::new(None),
            close_tx,
            shutdown_tx: std::sync::Mutex::new(Some(shutdown_tx)),
            pump: Mutex::new(None),
            closing: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        });

        // Ad runtime binding is independent of content: a failure here
        // only degrades the session to content-only
        let (ad_tx, ad_rx) = mpsc::unbounded_channel();
        controller.ads.initialize(ad_engine, ad_tx).await;

        // Subscribe before the initial load so no engine event is missed
        let content_rx = content_engine.subscribe();
        let pump = tokio::spawn(Self::event_pump(
            controller.clone(),
            content_rx,
            ad_rx,
            shutdown_rx,
            options.progress_interval,
        ));
        *controller.pump.lock().await = Some(pump);

        log.append(SessionEvent::SessionStarted {
            timestamp: time::now(),
            session_id: controller.session_id,
            content_uri: options.content_uri.clone(),
        });
        controller.playback.load(&options.content_uri).await?;

        Ok(controller)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Load new content; also the recovery path after a content error
    pub async fn load(&self, uri: &str) -> Result<()> {
        self.playback.load(uri).await
    }

    pub async fn play(&self) -> Result<()> {
        self.playback.play().await
    }

    pub async fn pause(&self) -> Result<()> {
        self.playback.pause().await
    }

    pub async fn toggle_play(&self) -> Result<()> {
        self.playback.toggle_play().await
    }

    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        self.playback.seek(position_ms).await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.playback.set_volume(volume).await
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.playback.toggle_mute().await
    }

    pub async fn toggle_fullscreen(&self) -> Result<()> {
        self.playback.toggle_fullscreen().await
    }

    pub fn volume(&self) -> f32 {
        self.playback.volume()
    }

    pub fn is_muted(&self) -> bool {
        self.playback.is_muted()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.playback.is_fullscreen()
    }

    /// Most recent timed metadata payload, kept opaque
    pub async fn latest_metadata(&self) -> Option<serde_json::Value> {
        self.latest_metadata.read().await.clone()
    }

    /// Route a key press; designated close keys end the session
    ///
    /// Returns whether the key was handled.
    pub async fn on_key_input(&self, key: &str) -> bool {
        if !CLOSE_KEYS.contains(&key) {
            debug!("Ignoring key '{}'", key);
            return false;
        }
        self.close(CloseReason::UserInput).await;
        true
    }

    /// Wind the session down: pause content, stop any running break, and
    /// signal watchers
    ///
    /// Resource teardown itself happens in [`SessionController::shutdown`];
    /// close only resolves the session outcome.
    pub async fn close(&self, reason: CloseReason) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Closing session: {:?}", reason);
        if self.playback.state().await == PlaybackState::Playing {
            let _ = self.playback.pause().await;
        }
        self.ads.stop_active_break().await;
        self.log.append(SessionEvent::SessionClosed {
            timestamp: time::now(),
            reason,
        });
        let _ = self.close_tx.send(Some(reason));
    }

    /// Watch for session close; the value resolves to the close reason
    pub fn closed(&self) -> watch::Receiver<Option<CloseReason>> {
        self.close_tx.subscribe()
    }

    /// Full teardown; idempotent. The pump stops first, then ads release
    /// the viewport, then the content engine goes away.
    pub async fn shutdown(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down session {}", self.session_id);
        if let Some(tx) = self.shutdown_tx.lock().unwrap().take() {
            let _ = tx.send(());
        }
        if let Some(pump) = self.pump.lock().await.take() {
            if pump.await.is_err() {
                warn!("Event pump ended with a panic");
            }
        }
        self.ads.destroy().await;
        self.playback.destroy().await;
    }

    /// Snapshot of the whole session for the status endpoint
    pub async fn status(&self) -> SessionStatusInfo {
        let playback_state = self.playback.state().await;
        let ad_state = self.ads.ad_state().await;
        let position_ms = self.playback.position_ms();
        SessionStatusInfo {
            session_state: SessionState::derive(playback_state, ad_state),
            playback_state,
            ad_state,
            position_ms,
            duration_ms: self.playback.duration_ms().await,
            position_display: human_time::format_position_ms(position_ms),
            volume: self.playback.volume(),
            muted: self.playback.is_muted(),
            fullscreen: self.playback.is_fullscreen(),
        }
    }

    async fn event_pump(
        controller: Arc<Self>,
        mut content_rx: broadcast::Receiver<ContentEvent>,
        mut ad_rx: mpsc::UnboundedReceiver<AdEvent>,
        mut shutdown_rx: oneshot::Receiver<()>,
        progress_interval: Duration,
    ) {
        let mut progress = interval(progress_interval);
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("Event pump stopping");
                    break;
                }
                event = content_rx.recv() => match event {
                    Ok(event) => controller.on_content_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Content event stream lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("Content engine event channel closed");
                        break;
                    }
                },
                Some(event) = ad_rx.recv() => controller.on_ad_event(event).await,
                _ = progress.tick() => controller.emit_progress().await,
            }
        }
    }

    async fn on_content_event(&self, event: ContentEvent) {
        self.playback.apply_engine_event(&event).await;
        if let ContentEvent::Metadata { payload } = &event {
            self.on_metadata(payload).await;
        }
        self.refresh_session_state().await;
    }

    /// Timed metadata is the heartbeat for ad insertion: retain the
    /// payload and run the ad admission check
    async fn on_metadata(&self, payload: &serde_json::Value) {
        *self.latest_metadata.write().await = Some(payload.clone());
        let playback_state = self.playback.state().await;
        if !playback_state.is_media_active() {
            debug!("Skipping ad check in playback state {}", playback_state);
            return;
        }
        self.ads.maybe_request_ads(Instant::now()).await;
    }

    async fn on_ad_event(&self, event: AdEvent) {
        self.ads.on_ad_event(event).await;
        self.refresh_session_state().await;
    }

    async fn refresh_session_state(&self) {
        let derived =
            SessionState::derive(self.playback.state().await, self.ads.ad_state().await);
        let old_state = {
            let mut state = self.session_state.write().await;
            let old = *state;
            *state = derived;
            old
        };
        if old_state != derived {
            info!("Session state: {} -> {}", old_state, derived);
            self.log.append(SessionEvent::SessionStateChanged {
                timestamp: time::now(),
                old_state,
                new_state: derived,
            });
        }
    }

    async fn emit_progress(&self) {
        let state = self.playback.state().await;
        if !state.is_media_active() {
            return;
        }
        self.log.append(SessionEvent::PlaybackProgress {
            timestamp: time::now(),
            position_ms: self.playback.position_ms(),
            duration_ms: self.playback.duration_ms().await,
            playing: state == PlaybackState::Playing,
        });
    }
}
