//! # Midroll Session Library (midroll-session)
//!
//! Coupled content playback and ad insertion for a single viewing session.
//!
//! **Purpose:** Mount a playback session over injected content and ad
//! engines, keep the playback, ad, and session state machines coherent,
//! and expose an HTTP/SSE control surface.
//!
//! **Architecture:** Engine traits at the bottom, a session layer that
//! serializes every state mutation through one event pump, and an axum
//! API on top.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;

pub use error::{Error, Result};
pub use session::controller::{SessionController, SessionOptions};
