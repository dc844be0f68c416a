//! Simulated engines for development and integration testing
//!
//! These engines reproduce the timing shape of real media and ad runtimes
//! without touching any media: loads resolve after a configurable delay, a
//! ticker advances the playhead, metadata cues fire at fixed spacing, and
//! ad requests resolve to a manager that runs a timed break.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use super::ads::{AdEngine, AdErrorInfo, AdEvent, AdsLoader, AdsManager, AdsRequest, ViewMode};
use super::content::{ContentEngine, ContentEvent};
use super::surface::{SlotGeometry, VideoSurface};
use crate::config::SimConfig;

/// Tick granularity for the simulated playhead
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Event channel capacity for the simulated content engine
const EVENT_CAPACITY: usize = 64;

/// Simulated content engine
///
/// Drives a virtual playhead on a ticker task. Each `load` supersedes the
/// previous one; stale load tasks notice the generation change and exit.
pub struct SimContentEngine {
    inner: Arc<ContentInner>,
}

struct ContentInner {
    events: broadcast::Sender<ContentEvent>,
    playhead: Mutex<Playhead>,
    load_delay: Duration,
    content_duration_ms: u64,
    metadata_interval_ms: u64,
    generation: AtomicU64,
    destroyed: AtomicBool,
}

#[derive(Debug)]
struct Playhead {
    loaded: bool,
    paused: bool,
    position_ms: u64,
    volume: f32,
    last_cue: Option<u64>,
}

impl Default for Playhead {
    fn default() -> Self {
        Self {
            loaded: false,
            paused: true,
            position_ms: 0,
            volume: 1.0,
            last_cue: None,
        }
    }
}

impl SimContentEngine {
    pub fn new(config: &SimConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ContentInner {
                events,
                playhead: Mutex::new(Playhead::default()),
                load_delay: config.load_delay(),
                content_duration_ms: config.content_duration_ms,
                metadata_interval_ms: config.metadata_interval_ms.max(1),
                generation: AtomicU64::new(0),
                destroyed: AtomicBool::new(false),
            }),
        }
    }
}

impl ContentInner {
    fn lock_playhead(&self) -> MutexGuard<'_, Playhead> {
        self.playhead.lock().unwrap()
    }

    fn stale(&self, generation: u64) -> bool {
        self.destroyed.load(Ordering::SeqCst)
            || self.generation.load(Ordering::SeqCst) != generation
    }

    fn emit(&self, event: ContentEvent) {
        // Delivery is best-effort; an engine nobody listens to is idle
        let _ = self.events.send(event);
    }
}

impl ContentEngine for SimContentEngine {
    fn is_supported(&self) -> bool {
        true
    }

    fn load(&self, uri: &str) {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return;
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut playhead = self.inner.lock_playhead();
            playhead.loaded = false;
            playhead.paused = true;
            playhead.position_ms = 0;
            playhead.last_cue = None;
        }
        self.inner.emit(ContentEvent::Loading);

        let inner = self.inner.clone();
        let uri = uri.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(inner.load_delay).await;
            if inner.stale(generation) {
                return;
            }
            if !uri.contains("://") {
                inner.emit(ContentEvent::Error {
                    code: 1002,
                    message: format!("cannot load '{}'", uri),
                });
                return;
            }
            inner.lock_playhead().loaded = true;
            inner.emit(ContentEvent::Loaded {
                duration_ms: Some(inner.content_duration_ms),
            });

            // Drive the playhead until the media ends or the load is
            // superseded
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if inner.stale(generation) {
                    return;
                }
                let mut cue = None;
                let mut ended = false;
                {
                    let mut playhead = inner.lock_playhead();
                    if !playhead.paused {
                        playhead.position_ms = (playhead.position_ms
                            + TICK_INTERVAL.as_millis() as u64)
                            .min(inner.content_duration_ms);
                        let idx = playhead.position_ms / inner.metadata_interval_ms;
                        if playhead.last_cue != Some(idx) {
                            playhead.last_cue = Some(idx);
                            cue = Some(playhead.position_ms);
                        }
                        if playhead.position_ms >= inner.content_duration_ms {
                            playhead.paused = true;
                            ended = true;
                        }
                    }
                }
                if let Some(position_ms) = cue {
                    inner.emit(ContentEvent::Metadata {
                        payload: serde_json::json!({
                            "cue": "sim",
                            "position_ms": position_ms,
                        }),
                    });
                }
                if ended {
                    inner.emit(ContentEvent::Ended);
                    return;
                }
            }
        });
    }

    fn play(&self) {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return;
        }
        let started = {
            let mut playhead = self.inner.lock_playhead();
            if playhead.loaded && playhead.paused {
                playhead.paused = false;
                true
            } else {
                false
            }
        };
        if started {
            self.inner.emit(ContentEvent::Playing);
        }
    }

    fn pause(&self) {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return;
        }
        let paused = {
            let mut playhead = self.inner.lock_playhead();
            if playhead.loaded && !playhead.paused {
                playhead.paused = true;
                true
            } else {
                false
            }
        };
        if paused {
            self.inner.emit(ContentEvent::Paused);
        }
    }

    fn seek(&self, position_ms: u64) {
        let mut playhead = self.inner.lock_playhead();
        if playhead.loaded {
            playhead.position_ms = position_ms.min(self.inner.content_duration_ms);
            // The cue at the landing position counts as consumed
            playhead.last_cue = Some(playhead.position_ms / self.inner.metadata_interval_ms);
        }
    }

    fn set_volume(&self, volume: f32) {
        self.inner.lock_playhead().volume = volume.clamp(0.0, 1.0);
    }

    fn position_ms(&self) -> u64 {
        self.inner.lock_playhead().position_ms
    }

    fn duration_ms(&self) -> Option<u64> {
        let playhead = self.inner.lock_playhead();
        playhead.loaded.then_some(self.inner.content_duration_ms)
    }

    fn is_paused(&self) -> bool {
        self.inner.lock_playhead().paused
    }

    fn volume(&self) -> f32 {
        self.inner.lock_playhead().volume
    }

    fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.inner.events.subscribe()
    }

    fn destroy(&self) {
        self.inner.destroyed.store(true, Ordering::SeqCst);
        debug!("sim content engine destroyed");
    }
}

/// Simulated ad engine runtime
pub struct SimAdEngine {
    response_delay: Duration,
    ad_duration: Duration,
    available: bool,
}

impl SimAdEngine {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            response_delay: config.ad_response_delay(),
            ad_duration: config.ad_duration(),
            available: config.ad_runtime_available,
        }
    }
}

impl AdEngine for SimAdEngine {
    fn create_loader(
        &self,
        events: mpsc::UnboundedSender<AdEvent>,
    ) -> Result<Box<dyn AdsLoader>, AdErrorInfo> {
        if !self.available {
            return Err(AdErrorInfo::new(None, "ad runtime not available"));
        }
        Ok(Box::new(SimAdsLoader {
            events,
            response_delay: self.response_delay,
            ad_duration: self.ad_duration,
            destroyed: Arc::new(AtomicBool::new(false)),
        }))
    }
}

struct SimAdsLoader {
    events: mpsc::UnboundedSender<AdEvent>,
    response_delay: Duration,
    ad_duration: Duration,
    destroyed: Arc<AtomicBool>,
}

impl AdsLoader for SimAdsLoader {
    fn initialize_container(&self) {
        debug!("sim ad container initialized");
    }

    fn request_ads(&self, request: &AdsRequest) {
        debug!(tag_url = %request.tag_url, "sim ad request");
        let events = self.events.clone();
        let destroyed = self.destroyed.clone();
        let response_delay = self.response_delay;
        let ad_duration = self.ad_duration;
        tokio::spawn(async move {
            tokio::time::sleep(response_delay).await;
            if destroyed.load(Ordering::SeqCst) {
                return;
            }
            let manager: Arc<dyn AdsManager> =
                Arc::new(SimAdsManager::new(events.clone(), ad_duration));
            let _ = events.send(AdEvent::ManagerLoaded { manager });
        });
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

/// Manager for one simulated ad break
///
/// Runs the break on a task: requests a content pause, reports the ad
/// started, waits out the configured duration (or an early stop), then
/// releases the viewport and completes.
struct SimAdsManager {
    events: mpsc::UnboundedSender<AdEvent>,
    ad_duration: Duration,
    stopped: Arc<AtomicBool>,
    init: Mutex<Option<(u32, u32, ViewMode)>>,
}

impl SimAdsManager {
    fn new(events: mpsc::UnboundedSender<AdEvent>, ad_duration: Duration) -> Self {
        Self {
            events,
            ad_duration,
            stopped: Arc::new(AtomicBool::new(false)),
            init: Mutex::new(None),
        }
    }
}

impl AdsManager for SimAdsManager {
    fn init(
        &self,
        width: u32,
        height: u32,
        mode: ViewMode,
        _restore_content_on_complete: bool,
    ) -> Result<(), AdErrorInfo> {
        debug!(width, height, ?mode, "sim ads manager init");
        *self.init.lock().unwrap() = Some((width, height, mode));
        Ok(())
    }

    fn start(&self) -> Result<(), AdErrorInfo> {
        if self.init.lock().unwrap().is_none() {
            return Err(AdErrorInfo::new(None, "start before init"));
        }
        let events = self.events.clone();
        let stopped = self.stopped.clone();
        let ad_duration = self.ad_duration;
        tokio::spawn(async move {
            let _ = events.send(AdEvent::ContentPauseRequested);
            let _ = events.send(AdEvent::Started);
            // Sleep in slices so stop() can cut the break short
            let slice = Duration::from_millis(50);
            let mut remaining = ad_duration;
            while !stopped.load(Ordering::SeqCst) && !remaining.is_zero() {
                let step = remaining.min(slice);
                tokio::time::sleep(step).await;
                remaining = remaining.saturating_sub(step);
            }
            let _ = events.send(AdEvent::ContentResumeRequested);
            let _ = events.send(AdEvent::AllAdsCompleted);
        });
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn destroy(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Geometry presented while fullscreen
const FULLSCREEN_GEOMETRY: SlotGeometry = SlotGeometry {
    width: 1920,
    height: 1080,
};

/// Simulated video surface
pub struct SimSurface {
    state: Mutex<SurfaceState>,
}

#[derive(Debug)]
struct SurfaceState {
    normal: SlotGeometry,
    fullscreen: bool,
}

impl SimSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                normal: SlotGeometry::new(width, height),
                fullscreen: false,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap()
    }
}

impl Default for SimSurface {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl VideoSurface for SimSurface {
    fn viewport(&self) -> SlotGeometry {
        let state = self.lock_state();
        if state.fullscreen {
            FULLSCREEN_GEOMETRY
        } else {
            state.normal
        }
    }

    fn is_fullscreen(&self) -> bool {
        self.lock_state().fullscreen
    }

    fn request_fullscreen(&self) {
        self.lock_state().fullscreen = true;
    }

    fn exit_fullscreen(&self) {
        self.lock_state().fullscreen = false;
    }
}
