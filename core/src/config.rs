//! Directory configuration loading
//!
//! Loads configuration from `~/.config/poimap/poimap.toml` (or the
//! `POIMAP_CONFIG` env var). Every field has a default, so an absent file is
//! a valid, fallback-only configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{PoiError, Result};
use crate::model::Coordinates;

/// Root configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PoiMapConfig {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub fallback: FallbackConfig,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Remote directory and search service endpoints
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    /// Base URL serving `GET/POST /directory`. Absent means fallback-only.
    #[serde(default)]
    pub directory_url: Option<String>,

    /// Base URL serving `GET /search`. Defaults to `directory_url`.
    #[serde(default)]
    pub search_url: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            directory_url: None,
            search_url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn resolved_search_url(&self) -> Option<&str> {
        self.search_url
            .as_deref()
            .or(self.directory_url.as_deref())
    }
}

/// Backoff settings for idempotent remote reads
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 disables retrying.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f32,
}

fn default_max_attempts() -> usize {
    2
}
fn default_initial_backoff_ms() -> u64 {
    100
}
fn default_max_backoff_ms() -> u64 {
    2_000
}
fn default_backoff_multiplier() -> f32 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FallbackConfig {
    /// Local dataset read when the remote directory is unavailable
    #[serde(default = "default_fallback_path")]
    pub path: String,
}

fn default_fallback_path() -> String {
    "restaurants.csv".to_string()
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            path: default_fallback_path(),
        }
    }
}

/// Initial viewport and marker fitting
#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    #[serde(default = "default_center_lng")]
    pub center_lng: f64,

    #[serde(default = "default_zoom")]
    pub zoom: i32,

    /// Zoom levels subtracted after fitting bounds, to ease crowding
    #[serde(default = "default_zoom_out_step")]
    pub zoom_out_step: i32,
}

// Seoul City Hall
fn default_center_lat() -> f64 {
    37.5665
}
fn default_center_lng() -> f64 {
    126.9780
}
fn default_zoom() -> i32 {
    14
}
fn default_zoom_out_step() -> i32 {
    1
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lng: default_center_lng(),
            zoom: default_zoom(),
            zoom_out_step: default_zoom_out_step(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Divisor turning the search provider's fixed-point coordinates into
    /// decimal degrees
    #[serde(default = "default_coordinate_scale")]
    pub coordinate_scale: f64,
}

fn default_coordinate_scale() -> f64 {
    10_000_000.0
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            coordinate_scale: default_coordinate_scale(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_export_file_name")]
    pub file_name: String,
}

fn default_export_file_name() -> String {
    "restaurants_updated.csv".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: default_export_file_name(),
        }
    }
}

impl PoiMapConfig {
    pub const ENV_CONFIG_PATH: &'static str = "POIMAP_CONFIG";
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "poimap.toml";

    /// Load from the env-provided or default location.
    ///
    /// A missing default file yields the default configuration; a missing
    /// file named by the env var is an error.
    pub fn load() -> Result<Self> {
        let from_env = std::env::var_os(Self::ENV_CONFIG_PATH).is_some();
        let path = Self::resolve_config_path();
        if !from_env && !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PoiError::config_with_source(format!("failed to read {}", path.display()), e)
        })?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: PoiMapConfig = toml::from_str(contents)
            .map_err(|e| PoiError::config_with_source("failed to parse config", e))?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|dir| dir.join("poimap").join(Self::DEFAULT_CONFIG_FILENAME))
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.search.coordinate_scale.is_finite() && self.search.coordinate_scale > 0.0) {
            return Err(PoiError::config(format!(
                "search.coordinate_scale must be positive, got {}",
                self.search.coordinate_scale
            )));
        }

        if self.remote.timeout_ms == 0 {
            return Err(PoiError::config("remote.timeout_ms must be non-zero"));
        }

        if self.map_center().is_none() {
            return Err(PoiError::config(format!(
                "map center ({}, {}) is not a valid coordinate",
                self.map.center_lat, self.map.center_lng
            )));
        }

        if self.map.zoom.saturating_sub(self.map.zoom_out_step) < 0 {
            tracing::warn!(
                zoom = self.map.zoom,
                zoom_out_step = self.map.zoom_out_step,
                "zoom_out_step larger than initial zoom; fitted views may clamp at 0"
            );
        }

        Ok(())
    }

    pub fn map_center(&self) -> Option<Coordinates> {
        Coordinates::new(self.map.center_lat, self.map.center_lng)
    }

    /// Expand a leading `~/` in the fallback path.
    pub fn resolved_fallback_path(&self) -> PathBuf {
        let path = &self.fallback.path;
        if let Some(stripped) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(stripped);
        }
        PathBuf::from(path)
    }
}
