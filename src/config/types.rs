//! Configuration section types

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Internal proxy endpoint (aggregates the paid provider)
    pub proxy_url: String,
    /// Public fallback endpoint (CoinGecko market chart)
    pub public_url: String,
    /// Per-adapter request timeout in seconds
    pub request_timeout_secs: u64,
    /// Earliest date accepted from any provider (YYYY-MM-DD)
    pub date_floor: String,
    /// Allow the public fallback adapter
    pub public_enabled: bool,
}

impl SourcesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn date_floor(&self) -> Option<NaiveDate> {
        crate::dates::parse_iso(&self.date_floor)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Persist the last accepted series on disk
    pub enabled: bool,
    /// Directory holding cache records
    pub dir: String,
    /// Schema version baked into the record key
    pub version: u32,
    /// Entries older than this are stale
    pub max_age_hours: u64,
}

impl CacheConfig {
    pub fn key(&self) -> String {
        format!("price_cache_v{}", self.version)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours * 3600)
    }

    pub fn dir(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    /// Fewer points than this and a series is not trusted
    pub min_acceptable_len: usize,
    /// Default wait for `wait_for_data`
    pub wait_timeout_ms: u64,
    /// Refresh in the background after serving from cache
    pub background_refresh: bool,
}

impl LoaderConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct YieldsConfig {
    pub enabled: bool,
    /// Provider ratios endpoint
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}
