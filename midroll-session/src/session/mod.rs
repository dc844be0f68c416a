//! Session orchestration
//!
//! Couples a content engine and an ad engine into one coordinated playback
//! session. [`PlaybackSession`] owns content transport and playback state,
//! [`AdBreakCoordinator`] owns the ad break lifecycle and the request
//! throttle, and [`SessionController`] owns the event pump that serializes
//! every state mutation.

pub mod ad_break;
pub mod controller;
pub mod playback;

pub use ad_break::{AdBreakCoordinator, ThrottleDecision, ThrottleWindow};
pub use controller::{SessionController, SessionOptions};
pub use playback::PlaybackSession;
