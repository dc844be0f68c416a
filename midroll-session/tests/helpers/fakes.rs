//! Scripted engine fakes for session integration tests
//!
//! Unlike the simulated engines in the crate, these never act on their own
//! clock: tests inject engine events explicitly and then assert on the calls
//! the session made. Transport calls echo the state change a real engine
//! would report (play emits Playing, pause emits Paused) so the session's
//! event pump observes a consistent engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};

use midroll_session::engine::{
    AdEngine, AdErrorInfo, AdEvent, AdsLoader, AdsManager, AdsRequest, ContentEngine,
    ContentEvent, ViewMode,
};

// ================================================================================================
// FakeContentEngine
// ================================================================================================

/// Content engine spy: records transport calls, emits only what tests inject
pub struct FakeContentEngine {
    events: broadcast::Sender<ContentEvent>,
    supported: bool,
    state: Mutex<FakeContentState>,
    play_calls: AtomicUsize,
    pause_calls: AtomicUsize,
    destroy_calls: AtomicUsize,
    load_calls: Mutex<Vec<String>>,
    seek_calls: Mutex<Vec<u64>>,
}

struct FakeContentState {
    paused: bool,
    position_ms: u64,
    duration_ms: Option<u64>,
    volume: f32,
}

impl FakeContentEngine {
    pub fn new() -> Arc<Self> {
        Self::with_support(true)
    }

    /// An engine whose environment check fails; mounting on it must error
    pub fn unsupported() -> Arc<Self> {
        Self::with_support(false)
    }

    fn with_support(supported: bool) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            events,
            supported,
            state: Mutex::new(FakeContentState {
                paused: true,
                position_ms: 0,
                duration_ms: None,
                volume: 1.0,
            }),
            play_calls: AtomicUsize::new(0),
            pause_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
            load_calls: Mutex::new(Vec::new()),
            seek_calls: Mutex::new(Vec::new()),
        })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, FakeContentState> {
        self.state.lock().unwrap()
    }

    /// Inject an engine event, mirroring the state a real engine would hold
    /// at the moment it reports it
    pub fn emit(&self, event: ContentEvent) {
        match &event {
            ContentEvent::Loaded { duration_ms } => {
                let mut state = self.lock_state();
                state.duration_ms = *duration_ms;
                state.position_ms = 0;
                state.paused = true;
            }
            ContentEvent::Playing => self.lock_state().paused = false,
            ContentEvent::Paused | ContentEvent::Ended => self.lock_state().paused = true,
            _ => {}
        }
        let _ = self.events.send(event);
    }

    /// Move the reported playhead without emitting anything
    pub fn set_position(&self, position_ms: u64) {
        self.lock_state().position_ms = position_ms;
    }

    pub fn play_count(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn pause_count(&self) -> usize {
        self.pause_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_count(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    /// URIs handed to `load`, in order
    pub fn loads(&self) -> Vec<String> {
        self.load_calls.lock().unwrap().clone()
    }

    /// Positions handed to `seek`, in order
    pub fn seeks(&self) -> Vec<u64> {
        self.seek_calls.lock().unwrap().clone()
    }
}

impl ContentEngine for FakeContentEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn load(&self, uri: &str) {
        self.load_calls.lock().unwrap().push(uri.to_string());
        let mut state = self.lock_state();
        state.duration_ms = None;
        state.position_ms = 0;
        state.paused = true;
    }

    fn play(&self) {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        let transitioned = {
            let mut state = self.lock_state();
            let was_paused = state.paused;
            state.paused = false;
            was_paused
        };
        if transitioned {
            let _ = self.events.send(ContentEvent::Playing);
        }
    }

    fn pause(&self) {
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        let transitioned = {
            let mut state = self.lock_state();
            let was_playing = !state.paused;
            state.paused = true;
            was_playing
        };
        if transitioned {
            let _ = self.events.send(ContentEvent::Paused);
        }
    }

    fn seek(&self, position_ms: u64) {
        self.seek_calls.lock().unwrap().push(position_ms);
        self.lock_state().position_ms = position_ms;
    }

    fn set_volume(&self, volume: f32) {
        self.lock_state().volume = volume;
    }

    fn position_ms(&self) -> u64 {
        self.lock_state().position_ms
    }

    fn duration_ms(&self) -> Option<u64> {
        self.lock_state().duration_ms
    }

    fn is_paused(&self) -> bool {
        self.lock_state().paused
    }

    fn volume(&self) -> f32 {
        self.lock_state().volume
    }

    fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.events.subscribe()
    }

    fn destroy(&self) {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ================================================================================================
// FakeAdEngine
// ================================================================================================

/// Ad engine spy: the loader records requests, responses come from the test
///
/// `create_loader` captures the session's ad event sender so tests can
/// inject `AdEvent`s as if the runtime produced them.
pub struct FakeAdEngine {
    available: bool,
    shared: Arc<FakeAdShared>,
    events: Mutex<Option<mpsc::UnboundedSender<AdEvent>>>,
}

/// Call records shared between the engine handle and its loader
#[derive(Default)]
pub struct FakeAdShared {
    requests: Mutex<Vec<AdsRequest>>,
    container_inits: AtomicUsize,
    loader_destroys: AtomicUsize,
}

impl FakeAdEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            available: true,
            shared: Arc::new(FakeAdShared::default()),
            events: Mutex::new(None),
        })
    }

    /// A runtime that refuses to create a loader; the session must degrade
    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            available: false,
            shared: Arc::new(FakeAdShared::default()),
            events: Mutex::new(None),
        })
    }

    /// Inject an ad event on the channel captured at loader creation
    pub fn inject(&self, event: AdEvent) {
        let sender = self
            .events
            .lock()
            .unwrap()
            .clone()
            .expect("loader was never created");
        sender.send(event).expect("ad event channel closed");
    }

    pub fn request_count(&self) -> usize {
        self.shared.requests.lock().unwrap().len()
    }

    /// Requests issued through the loader, in order
    pub fn requests(&self) -> Vec<AdsRequest> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn container_init_count(&self) -> usize {
        self.shared.container_inits.load(Ordering::SeqCst)
    }

    pub fn loader_destroy_count(&self) -> usize {
        self.shared.loader_destroys.load(Ordering::SeqCst)
    }
}

impl AdEngine for FakeAdEngine {
    fn create_loader(
        &self,
        events: mpsc::UnboundedSender<AdEvent>,
    ) -> Result<Box<dyn AdsLoader>, AdErrorInfo> {
        if !self.available {
            return Err(AdErrorInfo::new(None, "scripted runtime unavailable"));
        }
        *self.events.lock().unwrap() = Some(events);
        Ok(Box::new(FakeAdsLoader {
            shared: self.shared.clone(),
        }))
    }
}

struct FakeAdsLoader {
    shared: Arc<FakeAdShared>,
}

impl AdsLoader for FakeAdsLoader {
    fn initialize_container(&self) {
        self.shared.container_inits.fetch_add(1, Ordering::SeqCst);
    }

    fn request_ads(&self, request: &AdsRequest) {
        self.shared.requests.lock().unwrap().push(request.clone());
    }

    fn destroy(&self) {
        self.shared.loader_destroys.fetch_add(1, Ordering::SeqCst);
    }
}

// ================================================================================================
// FakeAdsManager
// ================================================================================================

/// Ads manager spy with scriptable init/start outcomes
pub struct FakeAdsManager {
    init_error: Option<AdErrorInfo>,
    start_error: Option<AdErrorInfo>,
    init_calls: Mutex<Vec<(u32, u32, ViewMode, bool)>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    destroy_calls: AtomicUsize,
}

impl FakeAdsManager {
    pub fn ok() -> Arc<Self> {
        Self::with_outcomes(None, None)
    }

    pub fn failing_init(error: AdErrorInfo) -> Arc<Self> {
        Self::with_outcomes(Some(error), None)
    }

    pub fn failing_start(error: AdErrorInfo) -> Arc<Self> {
        Self::with_outcomes(None, Some(error))
    }

    fn with_outcomes(
        init_error: Option<AdErrorInfo>,
        start_error: Option<AdErrorInfo>,
    ) -> Arc<Self> {
        Arc::new(Self {
            init_error,
            start_error,
            init_calls: Mutex::new(Vec::new()),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
        })
    }

    /// `(width, height, mode, restore_content_on_complete)` per init call
    pub fn inits(&self) -> Vec<(u32, u32, ViewMode, bool)> {
        self.init_calls.lock().unwrap().clone()
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_count(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }
}

impl AdsManager for FakeAdsManager {
    fn init(
        &self,
        width: u32,
        height: u32,
        mode: ViewMode,
        restore_content_on_complete: bool,
    ) -> Result<(), AdErrorInfo> {
        self.init_calls
            .lock()
            .unwrap()
            .push((width, height, mode, restore_content_on_complete));
        match &self.init_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn start(&self) -> Result<(), AdErrorInfo> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        match &self.start_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&self) {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
    }
}
