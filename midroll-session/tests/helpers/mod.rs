//! Test helper modules for session daemon integration tests
//!
//! Provides reusable test infrastructure components:
//! - Fake engines: scripted content/ad engines that record session calls
//! - mount_test_session: wire fakes into a mounted SessionController
//! - wait_for_event: await a matching event on the session event log

pub mod fakes;

// Re-export commonly used types
pub use fakes::{FakeAdEngine, FakeAdsManager, FakeContentEngine};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use midroll_common::{EventLog, SessionEvent};
use midroll_session::engine::sim::SimSurface;
use midroll_session::session::{SessionController, SessionOptions};

pub const TEST_URI: &str = "https://example.com/content/master.m3u8";
pub const TEST_TAG: &str = "https://ads.example.com/vast?slot=preroll&correlator=";

pub fn test_options() -> SessionOptions {
    SessionOptions {
        content_uri: TEST_URI.to_string(),
        ad_tag_url: TEST_TAG.to_string(),
        min_ad_interval: Duration::from_secs(300),
        progress_interval: Duration::from_secs(1),
    }
}

/// A mounted session with handles to its fakes and event stream
pub struct TestSession {
    pub controller: Arc<SessionController>,
    pub content: Arc<FakeContentEngine>,
    pub ads: Arc<FakeAdEngine>,
    pub log: Arc<EventLog>,
    /// Subscribed before mount, so every session event is observable
    pub events: broadcast::Receiver<SessionEvent>,
}

pub async fn mount_test_session() -> TestSession {
    mount_test_session_with(FakeAdEngine::new(), test_options()).await
}

pub async fn mount_test_session_with(
    ads: Arc<FakeAdEngine>,
    options: SessionOptions,
) -> TestSession {
    let content = FakeContentEngine::new();
    let log = Arc::new(EventLog::new(256));
    let events = log.subscribe();
    let controller = SessionController::mount(
        content.clone(),
        Some(ads.clone()),
        Arc::new(SimSurface::default()),
        log.clone(),
        options,
    )
    .await
    .expect("session mount failed");
    TestSession {
        controller,
        content,
        ads,
        log,
        events,
    }
}

/// Wait until an event matching the predicate arrives, skipping others
///
/// Panics after five seconds so a missing event fails the test instead of
/// hanging it.
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<SessionEvent>,
    mut predicate: F,
) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("session event channel closed");
        if predicate(&event) {
            return event;
        }
    }
}
