//! Session event log
//!
//! Append-only sink in front of the EventBus. Every orchestration event goes
//! through `append`, which records a tracing line, keeps a capped ring of
//! recent entries for inspection over HTTP, and broadcasts to subscribers.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::debug;

use super::{EventBus, SessionEvent};

/// Default number of recent events retained for `recent()` snapshots
pub const DEFAULT_RECENT_CAPACITY: usize = 256;

/// Process-wide append sink for session events
///
/// Owns the EventBus plus a bounded ring of the most recent entries. The ring
/// exists so late-joining observers (HTTP clients, tests) can see what led up
/// to the current state without having been subscribed the whole time.
pub struct EventLog {
    bus: EventBus,
    recent: Mutex<VecDeque<SessionEvent>>,
    recent_capacity: usize,
}

impl EventLog {
    /// Create an event log with the given broadcast capacity and the default
    /// recent-ring capacity.
    pub fn new(bus_capacity: usize) -> Self {
        Self::with_recent_capacity(bus_capacity, DEFAULT_RECENT_CAPACITY)
    }

    /// Create an event log with explicit broadcast and ring capacities.
    pub fn with_recent_capacity(bus_capacity: usize, recent_capacity: usize) -> Self {
        Self {
            bus: EventBus::new(bus_capacity),
            recent: Mutex::new(VecDeque::with_capacity(recent_capacity)),
            recent_capacity,
        }
    }

    /// Append an event: trace it, retain it in the ring, broadcast it.
    ///
    /// Broadcast is lossy; an event with no subscribers is still retained in
    /// the ring and visible via `recent()`.
    pub fn append(&self, event: SessionEvent) {
        debug!(event_type = event.event_type(), "session event");

        {
            let mut recent = self.recent.lock().unwrap();
            if recent.len() >= self.recent_capacity {
                recent.pop_front();
            }
            recent.push_back(event.clone());
        }

        self.bus.emit_lossy(event);
    }

    /// Snapshot of the retained recent events, oldest first.
    pub fn recent(&self) -> Vec<SessionEvent> {
        let recent = self.recent.lock().unwrap();
        recent.iter().cloned().collect()
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// Number of active broadcast subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// Ring capacity this log was created with.
    pub fn recent_capacity(&self) -> usize {
        self.recent_capacity
    }
}
