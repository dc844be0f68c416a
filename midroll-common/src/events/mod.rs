//! Event types for the midroll event system
//!
//! Provides the session event definitions, the EventBus, and the EventLog
//! recent-event ring shared by the orchestration core and the API surface.

// Sub-modules (supporting types)
mod log;
mod session_types;

pub use log::EventLog;
pub use session_types::{
    AdSkipReason, AdState, CloseReason, PlaybackState, SessionState, SessionStatusInfo,
};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Session orchestration events
///
/// Every lifecycle signal the orchestrator produces flows through this enum:
/// content-engine transitions, ad-break progress, transport changes, and
/// session teardown. Events are appended to the EventLog, broadcast via the
/// EventBus, and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A playback session was mounted
    ///
    /// Triggers:
    /// - SSE: Announce the session to connected clients
    SessionStarted {
        /// Session UUID
        session_id: Uuid,
        /// Content URI the session was mounted with
        content_uri: String,
        /// When the session started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Content playback state changed
    ///
    /// Emitted for every transition of the playback state machine
    /// (Idle/Loading/Ready/Playing/Paused/Buffering/Ended/Error).
    ///
    /// Triggers:
    /// - SSE: Update transport controls
    /// - Session state derivation
    PlaybackStateChanged {
        /// Playback state before change
        old_state: PlaybackState,
        /// Playback state after change
        new_state: PlaybackState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A content load was issued to the engine
    ContentLoadStarted {
        /// URI handed to the content engine
        uri: String,
        /// When the load was issued
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The content engine finished loading and reported a duration
    ContentLoaded {
        /// Content duration in milliseconds, if the engine reported one
        duration_ms: Option<u64>,
        /// When the load completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback position update (sent every 1s while media is loaded)
    ///
    /// Triggers:
    /// - SSE: Update progress bar
    PlaybackProgress {
        /// Current position in milliseconds
        position_ms: u64,
        /// Total duration in milliseconds (None until loaded)
        duration_ms: Option<u64>,
        /// Whether currently playing (vs paused)
        playing: bool,
        /// Progress update timestamp
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Timed metadata arrived from the content engine
    ///
    /// The payload is opaque to the orchestrator; its arrival is what
    /// triggers the ad-eligibility check.
    TimedMetadata {
        /// Raw metadata payload as reported by the engine
        payload: serde_json::Value,
        /// When the metadata arrived
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Content playback reached the end of the media
    PlaybackEnded {
        /// When playback ended
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Content playback failed
    ///
    /// Terminal for the current load; only an explicit reload recovers.
    ///
    /// Triggers:
    /// - SSE: Show error state
    /// - Session state derivation (session enters Error)
    PlaybackError {
        /// Engine error code
        code: u32,
        /// Error message details
        message: String,
        /// When the error occurred
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume changed
    ///
    /// Triggers:
    /// - SSE: Update volume slider / mute indicator
    VolumeChanged {
        /// Previous volume (0.0-1.0)
        old_volume: f32,
        /// New volume (0.0-1.0)
        new_volume: f32,
        /// Whether the new volume means muted (exactly 0)
        muted: bool,
        /// When volume changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Fullscreen toggled on the rendering surface
    FullscreenChanged {
        /// Whether the surface is now fullscreen
        fullscreen: bool,
        /// When the toggle happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Ad subsystem state changed
    ///
    /// Triggers:
    /// - SSE: Update ad indicator
    /// - Session state derivation
    AdStateChanged {
        /// Ad state before change
        old_state: AdState,
        /// Ad state after change
        new_state: AdState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An ad request was issued to the ad engine
    ///
    /// The throttle window arms at this moment, not at response time.
    AdRequested {
        /// Ad tag URL the request was issued with (correlator included)
        tag_url: String,
        /// When the request was issued
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An ad check ran but no request was issued
    AdRequestSkipped {
        /// Why the check was a no-op
        reason: AdSkipReason,
        /// Remaining throttle time in milliseconds (Throttled only)
        remaining_ms: Option<u64>,
        /// When the check ran
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The ad engine delivered an ads manager for a requested break
    AdsManagerLoaded {
        /// When the manager arrived
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An ad break started rendering (content paused)
    AdBreakStarted {
        /// When the break started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An ad break finished and content was resumed
    AdBreakCompleted {
        /// When the break completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The ad engine reported an error (loader or manager)
    ///
    /// Always recovered by resuming content; never escalates to the session.
    AdError {
        /// Engine error code, if one was reported
        code: Option<u32>,
        /// Error message details
        message: String,
        /// When the error occurred
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The ad runtime never became available
    ///
    /// The ad subsystem degrades to a permanent no-op; content is unaffected.
    AdRuntimeUnavailable {
        /// Why the runtime is unavailable
        message: String,
        /// When unavailability was determined
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Derived session-level state changed
    SessionStateChanged {
        /// Session state before change
        old_state: SessionState,
        /// Session state after change
        new_state: SessionState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The session closed
    ///
    /// Triggers:
    /// - Embedder teardown (the close watch channel resolves)
    SessionClosed {
        /// Why the session closed
        reason: CloseReason,
        /// When the session closed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Initial state sent on SSE connection
    InitialState {
        /// When the snapshot was taken
        timestamp: chrono::DateTime<chrono::Utc>,
        /// Full session status at subscription time
        status: SessionStatusInfo,
    },
}

impl SessionEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            SessionEvent::SessionStarted { .. } => "SessionStarted",
            SessionEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            SessionEvent::ContentLoadStarted { .. } => "ContentLoadStarted",
            SessionEvent::ContentLoaded { .. } => "ContentLoaded",
            SessionEvent::PlaybackProgress { .. } => "PlaybackProgress",
            SessionEvent::TimedMetadata { .. } => "TimedMetadata",
            SessionEvent::PlaybackEnded { .. } => "PlaybackEnded",
            SessionEvent::PlaybackError { .. } => "PlaybackError",
            SessionEvent::VolumeChanged { .. } => "VolumeChanged",
            SessionEvent::FullscreenChanged { .. } => "FullscreenChanged",
            SessionEvent::AdStateChanged { .. } => "AdStateChanged",
            SessionEvent::AdRequested { .. } => "AdRequested",
            SessionEvent::AdRequestSkipped { .. } => "AdRequestSkipped",
            SessionEvent::AdsManagerLoaded { .. } => "AdsManagerLoaded",
            SessionEvent::AdBreakStarted { .. } => "AdBreakStarted",
            SessionEvent::AdBreakCompleted { .. } => "AdBreakCompleted",
            SessionEvent::AdError { .. } => "AdError",
            SessionEvent::AdRuntimeUnavailable { .. } => "AdRuntimeUnavailable",
            SessionEvent::SessionStateChanged { .. } => "SessionStateChanged",
            SessionEvent::SessionClosed { .. } => "SessionClosed",
            SessionEvent::InitialState { .. } => "InitialState",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for session-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use midroll_common::events::{EventBus, SessionEvent, PlaybackState};
/// use std::sync::Arc;
///
/// let event_bus = Arc::new(EventBus::new(1000));
///
/// // Subscribe to events
/// let mut rx = event_bus.subscribe();
///
/// // Emit an event
/// event_bus.emit(SessionEvent::PlaybackStateChanged {
///     old_state: PlaybackState::Paused,
///     new_state: PlaybackState::Playing,
///     timestamp: chrono::Utc::now(),
/// }).ok();
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Used for events where it is acceptable if no component is currently
    /// listening (progress ticks, metadata, state changes before the first
    /// SSE client connects).
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    ///
    /// Useful for debugging and monitoring
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(10);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_eventbus_emit() {
        use std::sync::Arc;
        let bus = Arc::new(EventBus::new(10));
        let mut rx = bus.subscribe();

        let event = SessionEvent::PlaybackStateChanged {
            old_state: PlaybackState::Paused,
            new_state: PlaybackState::Playing,
            timestamp: chrono::Utc::now(),
        };

        bus.emit(event.clone()).expect("emit should succeed");

        let received = rx.try_recv().expect("Should receive event");
        assert_eq!(received.event_type(), "PlaybackStateChanged");
    }

    #[test]
    fn test_eventbus_emit_lossy() {
        use std::sync::Arc;
        let bus = Arc::new(EventBus::new(2)); // Small capacity
        let mut _rx = bus.subscribe(); // Subscribe but don't receive

        // Fill the channel well past capacity
        for i in 0..10 {
            let event = SessionEvent::PlaybackProgress {
                position_ms: i * 1000,
                duration_ms: Some(180000),
                playing: true,
                timestamp: chrono::Utc::now(),
            };
            bus.emit_lossy(event); // Should not panic even when full
        }

        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        use std::sync::Arc;
        let bus = Arc::new(EventBus::new(10));
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        let mut rx3 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 3);

        let event = SessionEvent::AdBreakStarted {
            timestamp: chrono::Utc::now(),
        };

        bus.emit(event.clone()).expect("emit should succeed");

        let r1 = rx1.try_recv().expect("rx1 should receive");
        let r2 = rx2.try_recv().expect("rx2 should receive");
        let r3 = rx3.try_recv().expect("rx3 should receive");

        assert_eq!(r1.event_type(), "AdBreakStarted");
        assert_eq!(r2.event_type(), "AdBreakStarted");
        assert_eq!(r3.event_type(), "AdBreakStarted");
    }

    #[test]
    fn test_event_type_method() {
        let events = vec![
            (
                SessionEvent::PlaybackStateChanged {
                    old_state: PlaybackState::Idle,
                    new_state: PlaybackState::Loading,
                    timestamp: chrono::Utc::now(),
                },
                "PlaybackStateChanged",
            ),
            (
                SessionEvent::AdRequested {
                    tag_url: "https://ads.example/tag".to_string(),
                    timestamp: chrono::Utc::now(),
                },
                "AdRequested",
            ),
            (
                SessionEvent::AdRequestSkipped {
                    reason: AdSkipReason::Throttled,
                    remaining_ms: Some(240_000),
                    timestamp: chrono::Utc::now(),
                },
                "AdRequestSkipped",
            ),
            (
                SessionEvent::AdError {
                    code: Some(303),
                    message: "VAST response empty".to_string(),
                    timestamp: chrono::Utc::now(),
                },
                "AdError",
            ),
            (
                SessionEvent::SessionClosed {
                    reason: CloseReason::UserInput,
                    timestamp: chrono::Utc::now(),
                },
                "SessionClosed",
            ),
        ];

        for (event, expected_type) in events {
            assert_eq!(event.event_type(), expected_type);
        }
    }

    #[test]
    fn test_event_serialization_tag() {
        let event = SessionEvent::AdStateChanged {
            old_state: AdState::Requesting,
            new_state: AdState::Loaded,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("Event serialization should succeed");
        assert!(json.contains("\"type\":\"AdStateChanged\""));
        assert!(json.contains("\"old_state\":\"requesting\""));
        assert!(json.contains("\"new_state\":\"loaded\""));

        let deserialized: SessionEvent =
            serde_json::from_str(&json).expect("Event deserialization should succeed");
        match deserialized {
            SessionEvent::AdStateChanged {
                old_state,
                new_state,
                ..
            } => {
                assert_eq!(old_state, AdState::Requesting);
                assert_eq!(new_state, AdState::Loaded);
            }
            _ => panic!("Wrong event type deserialized"),
        }
    }

    #[test]
    fn test_metadata_payload_roundtrip() {
        let payload = serde_json::json!({
            "cue": "midroll-opportunity",
            "offset_ms": 42_000,
        });

        let event = SessionEvent::TimedMetadata {
            payload: payload.clone(),
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("serialization should succeed");
        let back: SessionEvent =
            serde_json::from_str(&json).expect("deserialization should succeed");
        match back {
            SessionEvent::TimedMetadata { payload: p, .. } => assert_eq!(p, payload),
            _ => panic!("Wrong event type deserialized"),
        }
    }
}
