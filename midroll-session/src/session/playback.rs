//! Content playback session
//!
//! Owns the content half of a session: transport commands, volume,
//! fullscreen, and the playback state machine. State is mutated only by
//! engine events translated through [`PlaybackSession::apply_engine_event`];
//! command methods talk to the engine and let the resulting events come
//! back around.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use midroll_common::events::{PlaybackState, SessionEvent};
use midroll_common::{time, EventLog};

use crate::engine::{ContentEngine, ContentEvent, VideoSurface};
use crate::error::{Error, Result};

pub struct PlaybackSession {
    engine: Arc<dyn ContentEngine>,
    surface: Arc<dyn VideoSurface>,
    log: Arc<EventLog>,
    state: RwLock<PlaybackState>,
    duration_ms: RwLock<Option<u64>>,
    /// Last volume above zero, restored on unmute
    last_audible_volume: Mutex<f32>,
    destroyed: AtomicBool,
}

impl PlaybackSession {
    /// Probe the environment and construct the session
    ///
    /// Fails fast when the content engine cannot run here; nothing else is
    /// worth building in that case.
    pub fn new(
        engine: Arc<dyn ContentEngine>,
        surface: Arc<dyn VideoSurface>,
        log: Arc<EventLog>,
    ) -> Result<Self> {
        if !engine.is_supported() {
            return Err(Error::UnsupportedEnvironment(
                "content engine cannot run in this environment".to_string(),
            ));
        }
        Ok(Self {
            engine,
            surface,
            log,
            state: RwLock::new(PlaybackState::Idle),
            duration_ms: RwLock::new(None),
            last_audible_volume: Mutex::new(1.0),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Begin loading a content URI
    ///
    /// The only path out of the error state. An empty URI is rejected
    /// without touching the engine.
    pub async fn load(&self, uri: &str) -> Result<()> {
        self.ensure_alive()?;
        if uri.trim().is_empty() {
            return Err(Error::InvalidInput(
                "content uri must not be empty".to_string(),
            ));
        }
        info!("Loading content: {}", uri);
        *self.duration_ms.write().await = None;
        self.set_state(PlaybackState::Loading).await;
        self.log.append(SessionEvent::ContentLoadStarted {
            timestamp: time::now(),
            uri: uri.to_string(),
        });
        self.engine.load(uri);
        Ok(())
    }

    pub async fn play(&self) -> Result<()> {
        self.transport_guard().await?;
        self.engine.play();
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        self.transport_guard().await?;
        self.engine.pause();
        Ok(())
    }

    /// Toggle based on the engine's live paused flag, not cached state
    pub async fn toggle_play(&self) -> Result<()> {
        self.transport_guard().await?;
        if self.engine.is_paused() {
            self.engine.play();
        } else {
            self.engine.pause();
        }
        Ok(())
    }

    /// Seek to an absolute position, clamped to the known duration
    ///
    /// A no-op while the duration is still unknown.
    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        self.transport_guard().await?;
        let Some(duration_ms) = *self.duration_ms.read().await else {
            debug!("Ignoring seek to {}ms, duration unknown", position_ms);
            return Ok(());
        };
        self.engine.seek(position_ms.min(duration_ms));
        Ok(())
    }

    /// Set volume, clamped to 0.0..=1.0; zero means muted
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.ensure_alive()?;
        if !volume.is_finite() {
            return Err(Error::InvalidInput(format!("invalid volume {}", volume)));
        }
        let volume = volume.clamp(0.0, 1.0);
        let old_volume = self.engine.volume();
        self.engine.set_volume(volume);
        if volume > 0.0 {
            *self.last_audible_volume.lock().unwrap() = volume;
        }
        if (old_volume - volume).abs() > f32::EPSILON {
            self.log.append(SessionEvent::VolumeChanged {
                timestamp: time::now(),
                old_volume,
                new_volume: volume,
                muted: volume == 0.0,
            });
        }
        Ok(())
    }

    /// Mute by dropping volume to zero; unmute restores the last audible
    /// level
    pub async fn toggle_mute(&self) -> Result<()> {
        let restore = *self.last_audible_volume.lock().unwrap();
        if self.is_muted() {
            self.set_volume(restore).await
        } else {
            self.set_volume(0.0).await
        }
    }

    pub async fn toggle_fullscreen(&self) -> Result<()> {
        self.ensure_alive()?;
        if self.surface.is_fullscreen() {
            self.surface.exit_fullscreen();
        } else {
            self.surface.request_fullscreen();
        }
        let fullscreen = self.surface.is_fullscreen();
        self.log.append(SessionEvent::FullscreenChanged {
            timestamp: time::now(),
            fullscreen,
        });
        Ok(())
    }

    /// Pause on behalf of the ad engine; bypasses transport guards
    pub fn pause_for_ad(&self) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        self.engine.pause();
    }

    /// Resume on behalf of the ad engine; bypasses transport guards
    pub fn resume_after_ad(&self) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        self.engine.play();
    }

    pub async fn state(&self) -> PlaybackState {
        *self.state.read().await
    }

    pub async fn duration_ms(&self) -> Option<u64> {
        *self.duration_ms.read().await
    }

    pub fn position_ms(&self) -> u64 {
        self.engine.position_ms()
    }

    pub fn is_paused(&self) -> bool {
        self.engine.is_paused()
    }

    pub fn volume(&self) -> f32 {
        self.engine.volume()
    }

    pub fn is_muted(&self) -> bool {
        self.engine.volume() == 0.0
    }

    pub fn is_fullscreen(&self) -> bool {
        self.surface.is_fullscreen()
    }

    /// Translate one engine event into playback state
    ///
    /// The single mutation point for [`PlaybackState`]. Engine events
    /// arriving after a fatal content error are dropped until an explicit
    /// reload resets the machine.
    pub async fn apply_engine_event(&self, event: &ContentEvent) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        if *self.state.read().await == PlaybackState::Error
            && !matches!(event, ContentEvent::Loading)
        {
            debug!("Dropping engine event in error state: {:?}", event);
            return;
        }
        match event {
            ContentEvent::Loading => self.set_state(PlaybackState::Loading).await,
            ContentEvent::Loaded { duration_ms } => {
                *self.duration_ms.write().await = *duration_ms;
                self.log.append(SessionEvent::ContentLoaded {
                    timestamp: time::now(),
                    duration_ms: *duration_ms,
                });
                self.set_state(PlaybackState::Ready).await;
            }
            ContentEvent::Buffering => self.set_state(PlaybackState::Buffering).await,
            ContentEvent::Playing => self.set_state(PlaybackState::Playing).await,
            ContentEvent::Paused => self.set_state(PlaybackState::Paused).await,
            ContentEvent::Ended => {
                self.set_state(PlaybackState::Ended).await;
                self.log.append(SessionEvent::PlaybackEnded {
                    timestamp: time::now(),
                });
            }
            ContentEvent::Error { code, message } => {
                warn!("Content error {}: {}", code, message);
                self.set_state(PlaybackState::Error).await;
                self.log.append(SessionEvent::PlaybackError {
                    timestamp: time::now(),
                    code: *code,
                    message: message.clone(),
                });
            }
            ContentEvent::Metadata { payload } => {
                self.log.append(SessionEvent::TimedMetadata {
                    timestamp: time::now(),
                    payload: payload.clone(),
                });
            }
        }
    }

    /// Tear down the content side; idempotent
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Destroying playback session");
        self.engine.destroy();
    }

    async fn set_state(&self, new_state: PlaybackState) {
        let old_state = {
            let mut state = self.state.write().await;
            let old = *state;
            *state = new_state;
            old
        };
        if old_state != new_state {
            debug!("Playback state: {} -> {}", old_state, new_state);
            self.log.append(SessionEvent::PlaybackStateChanged {
                timestamp: time::now(),
                old_state,
                new_state,
            });
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(Error::InvalidState("session destroyed".to_string()));
        }
        Ok(())
    }

    /// Transport commands require loaded media and a non-error state
    async fn transport_guard(&self) -> Result<()> {
        self.ensure_alive()?;
        match *self.state.read().await {
            PlaybackState::Error => Err(Error::ContentLoad(
                "content failed; reload required".to_string(),
            )),
            state if state.is_media_active() => Ok(()),
            state => Err(Error::InvalidState(format!(
                "no media to control in state {}",
                state
            ))),
        }
    }
}
