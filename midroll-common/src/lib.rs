//! # Midroll Common Library
//!
//! Shared code for the midroll playback-session daemon including:
//! - Event types (SessionEvent enum) and the EventBus
//! - Session/playback/ad state enums
//! - The EventLog recent-event ring
//! - SSE stream utilities
//! - Timestamp and time-display helpers

pub mod events;
pub mod human_time;
pub mod sse;
pub mod time;

pub use events::{EventBus, EventLog, SessionEvent};
