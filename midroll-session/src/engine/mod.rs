//! Engine abstractions and simulated implementations
//!
//! The session layer is engine-agnostic: content playback, the ad runtime,
//! and the video surface are traits injected when the session mounts.
//! Production builds bind real engines; tests and the bundled daemon bind
//! the simulated ones.

pub mod ads;
pub mod content;
pub mod sim;
pub mod surface;

pub use ads::{AdEngine, AdErrorInfo, AdEvent, AdsLoader, AdsManager, AdsRequest, ViewMode};
pub use content::{ContentEngine, ContentEvent};
pub use surface::{SlotGeometry, VideoSurface};
