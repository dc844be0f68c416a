//! Error types for the playback session daemon

use thiserror::Error;

/// Session error type
///
/// Ad-side failures are deliberately absent: ad request and ad playback
/// errors never surface as `Err` values. They are absorbed by the ad break
/// coordinator, which falls back to content playback and reports them on
/// the event stream.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    #[error("Content load error: {0}")]
    ContentLoad(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
