//! Content engine abstraction
//!
//! The session layer drives content playback exclusively through the
//! [`ContentEngine`] trait. Engines deliver lifecycle changes as events on
//! a broadcast channel; the session controller translates those events into
//! playback state.

use tokio::sync::broadcast;

/// Lifecycle events emitted by a content engine
#[derive(Debug, Clone)]
pub enum ContentEvent {
    /// A load attempt has started
    Loading,
    /// Media is ready; duration is present once the engine knows it
    Loaded { duration_ms: Option<u64> },
    /// Playback stalled waiting for data
    Buffering,
    /// Playback is advancing
    Playing,
    /// Playback is paused
    Paused,
    /// Playback reached the end of the media
    Ended,
    /// The engine failed; fatal for the current load
    Error { code: u32, message: String },
    /// In-band timed metadata cue
    Metadata { payload: serde_json::Value },
}

/// Abstraction over the underlying media engine
///
/// Command methods are fire-and-forget: completion and failure arrive as
/// [`ContentEvent`]s on the subscription channel. Accessors read live
/// engine state and never block.
pub trait ContentEngine: Send + Sync {
    /// Whether the engine can run in the current environment
    ///
    /// Probed once when the session mounts. A false result is fatal for
    /// the whole session.
    fn is_supported(&self) -> bool;

    /// Begin loading the given URI
    fn load(&self, uri: &str);

    fn play(&self);

    fn pause(&self);

    /// Seek to an absolute position
    fn seek(&self, position_ms: u64);

    /// Set volume in the range 0.0 to 1.0
    fn set_volume(&self, volume: f32);

    /// Current playhead position
    fn position_ms(&self) -> u64;

    /// Media duration, once known
    fn duration_ms(&self) -> Option<u64>;

    fn is_paused(&self) -> bool;

    fn volume(&self) -> f32;

    /// Subscribe to the engine's event stream
    fn subscribe(&self) -> broadcast::Receiver<ContentEvent>;

    /// Release engine resources; subsequent calls are no-ops
    fn destroy(&self);
}
