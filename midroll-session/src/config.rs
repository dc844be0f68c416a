//! Configuration management for the midroll session daemon
//!
//! Single-tier TOML bootstrap configuration. Settings cannot change during
//! runtime; the application must restart to pick up changes to the file.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--port, --content-uri, --ad-tag-url)
//! 2. Environment variables (MIDROLL_PORT, MIDROLL_CONTENT_URI, MIDROLL_AD_TAG_URL)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use midroll_common::time::millis_to_duration;

/// Bootstrap configuration loaded from TOML file
///
/// **Minimal by design** - transport state, ad state, and volume live in the
/// session controller, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Content URI loaded when the session mounts
    #[serde(default = "default_content_uri")]
    pub content_uri: String,

    /// Interval between playback progress events
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Ad insertion configuration
    #[serde(default)]
    pub ads: AdsConfig,

    /// Simulated engine timings
    #[serde(default)]
    pub sim: SimConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            content_uri: default_content_uri(),
            progress_interval_ms: default_progress_interval_ms(),
            ads: AdsConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

/// Ad insertion configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdsConfig {
    /// VAST ad tag URL; a fresh correlator is appended per request
    #[serde(default = "default_ad_tag_url")]
    pub tag_url: String,

    /// Minimum spacing between ad requests, in seconds
    #[serde(default = "default_min_ad_interval_secs")]
    pub min_interval_secs: u64,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            tag_url: default_ad_tag_url(),
            min_interval_secs: default_min_ad_interval_secs(),
        }
    }
}

impl AdsConfig {
    /// Minimum ad request spacing as Duration
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }
}

/// Timing configuration for the simulated content and ad engines
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// Delay before a load attempt resolves
    #[serde(default = "default_sim_load_delay_ms")]
    pub load_delay_ms: u64,

    /// Duration reported for loaded content
    #[serde(default = "default_sim_content_duration_ms")]
    pub content_duration_ms: u64,

    /// Spacing of timed metadata cues during playback
    #[serde(default = "default_sim_metadata_interval_ms")]
    pub metadata_interval_ms: u64,

    /// Delay before an ad request resolves to a loaded manager
    #[serde(default = "default_sim_ad_response_delay_ms")]
    pub ad_response_delay_ms: u64,

    /// Length of a simulated ad break
    #[serde(default = "default_sim_ad_duration_ms")]
    pub ad_duration_ms: u64,

    /// When false, the ad runtime reports itself unavailable and the
    /// session runs content-only
    #[serde(default = "default_sim_ad_runtime_available")]
    pub ad_runtime_available: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            load_delay_ms: default_sim_load_delay_ms(),
            content_duration_ms: default_sim_content_duration_ms(),
            metadata_interval_ms: default_sim_metadata_interval_ms(),
            ad_response_delay_ms: default_sim_ad_response_delay_ms(),
            ad_duration_ms: default_sim_ad_duration_ms(),
            ad_runtime_available: default_sim_ad_runtime_available(),
        }
    }
}

impl SimConfig {
    pub fn load_delay(&self) -> Duration {
        millis_to_duration(self.load_delay_ms)
    }

    pub fn metadata_interval(&self) -> Duration {
        millis_to_duration(self.metadata_interval_ms)
    }

    pub fn ad_response_delay(&self) -> Duration {
        millis_to_duration(self.ad_response_delay_ms)
    }

    pub fn ad_duration(&self) -> Duration {
        millis_to_duration(self.ad_duration_ms)
    }
}

fn default_port() -> u16 {
    5750
}

fn default_content_uri() -> String {
    // Public HLS test stream
    "https://storage.googleapis.com/shaka-demo-assets/angel-one-hls-apple/master.m3u8".to_string()
}

fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_ad_tag_url() -> String {
    // Public VAST sample tag; the trailing correlator parameter is filled
    // in per request
    "https://pubads.g.doubleclick.net/gampad/ads?iu=/21775744923/external/single_ad_samples&sz=640x480&cust_params=sample_ct%3Dlinear&ciu_szs=300x250%2C728x90&gdfp_req=1&output=vast&unviewed_position_start=1&env=vp&impl=s&correlator=".to_string()
}

fn default_min_ad_interval_secs() -> u64 {
    crate::session::ad_break::DEFAULT_MIN_AD_INTERVAL.as_secs()
}

fn default_sim_load_delay_ms() -> u64 {
    400
}

fn default_sim_content_duration_ms() -> u64 {
    600_000
}

fn default_sim_metadata_interval_ms() -> u64 {
    10_000
}

fn default_sim_ad_response_delay_ms() -> u64 {
    500
}

fn default_sim_ad_duration_ms() -> u64 {
    8_000
}

fn default_sim_ad_runtime_available() -> bool {
    true
}

/// Complete application configuration after overrides are applied
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub port: u16,

    /// Content URI loaded when the session mounts
    pub content_uri: String,

    /// Interval between playback progress events
    pub progress_interval_ms: u64,

    /// Ad insertion configuration
    pub ads: AdsConfig,

    /// Simulated engine timings
    pub sim: SimConfig,
}

impl Config {
    /// Default config file location (`<config_dir>/midroll/session.toml`)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("midroll")
            .join("session.toml")
    }

    /// Load configuration from TOML and apply CLI overrides
    ///
    /// An explicitly requested file must exist. When no path is given, the
    /// default location is tried and a missing file falls back to built-in
    /// defaults.
    pub async fn load(toml_path: Option<&Path>, cli_overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match toml_path {
            Some(path) => {
                let toml_str = tokio::fs::read_to_string(path).await.map_err(|e| {
                    Error::Config(format!("Failed to read config file {:?}: {}", path, e))
                })?;
                parse_toml(&toml_str, path)?
            }
            None => {
                let path = Self::default_path();
                match tokio::fs::read_to_string(&path).await {
                    Ok(toml_str) => parse_toml(&toml_str, &path)?,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        info!("No config file at {:?}, using built-in defaults", path);
                        TomlConfig::default()
                    }
                    Err(e) => {
                        return Err(Error::Config(format!(
                            "Failed to read config file {:?}: {}",
                            path, e
                        )))
                    }
                }
            }
        };

        // Apply CLI overrides
        let port = cli_overrides.port.unwrap_or(toml_config.port);
        let content_uri = cli_overrides.content_uri.unwrap_or(toml_config.content_uri);
        let mut ads = toml_config.ads;
        if let Some(tag_url) = cli_overrides.ad_tag_url {
            ads.tag_url = tag_url;
        }

        Ok(Config {
            port,
            content_uri,
            progress_interval_ms: toml_config.progress_interval_ms,
            ads,
            sim: toml_config.sim,
        })
    }

    /// Progress event interval as Duration
    pub fn progress_interval(&self) -> Duration {
        millis_to_duration(self.progress_interval_ms)
    }
}

fn parse_toml(toml_str: &str, path: &Path) -> Result<TomlConfig> {
    let config = toml::from_str(toml_str)
        .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
    info!("Loaded TOML configuration from {:?}", path);
    Ok(config)
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub content_uri: Option<String>,
    pub ad_tag_url: Option<String>,
}
