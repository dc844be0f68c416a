//! Video surface abstraction
//!
//! The surface owns viewport geometry and fullscreen state. Geometry is
//! read at call time whenever an ad slot is sized; cached values go stale
//! across window resizes and fullscreen changes.

/// Viewport rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGeometry {
    pub width: u32,
    pub height: u32,
}

impl SlotGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Abstraction over the element hosting video and ad rendering
pub trait VideoSurface: Send + Sync {
    /// Current viewport size, read live
    fn viewport(&self) -> SlotGeometry;

    fn is_fullscreen(&self) -> bool;

    fn request_fullscreen(&self);

    fn exit_fullscreen(&self);
}
