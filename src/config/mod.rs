//! Configuration management for btcfeed
//!
//! Loads from TOML files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{anyhow, bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::acquisition::sources::EmbeddedSource;

/// Environment variable holding the provider credential for the proxy
pub const API_KEY_VAR: &str = "MASSIVE_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub loader: LoaderConfig,
    pub yields: YieldsConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::builder_with_defaults()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (BTCFEED__*)
            .add_source(Environment::with_prefix("BTCFEED").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Defaults only, no files or environment
    pub fn defaults() -> Result<Self> {
        let config = Self::builder_with_defaults()?
            .build()
            .context("Failed to build default configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize default configuration")
    }

    fn builder_with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = Config::builder()
            // Source defaults
            .set_default("sources.proxy_url", "http://localhost:3000/api/btc-prices")?
            .set_default(
                "sources.public_url",
                "https://api.coingecko.com/api/v3/coins/bitcoin/market_chart?vs_currency=usd&days=max&interval=daily",
            )?
            .set_default("sources.request_timeout_secs", 30)?
            .set_default("sources.date_floor", "2014-01-01")?
            .set_default("sources.public_enabled", true)?
            // Cache defaults
            .set_default("cache.enabled", true)?
            .set_default("cache.dir", "./data/cache")?
            .set_default("cache.version", 3)?
            .set_default("cache.max_age_hours", 24)?
            // Loader defaults
            .set_default("loader.min_acceptable_len", 100)?
            .set_default("loader.wait_timeout_ms", 15000)?
            .set_default("loader.background_refresh", true)?
            // Yield defaults
            .set_default("yields.enabled", true)?
            .set_default(
                "yields.url",
                "https://api.massive.com/stocks/financials/v1/ratios?limit=500",
            )?
            // Logging defaults
            .set_default("logging.json", false)?;
        Ok(builder)
    }

    /// Sanity checks that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let Some(floor) = self.sources.date_floor() else {
            bail!(
                "sources.date_floor must be YYYY-MM-DD, got {:?}",
                self.sources.date_floor
            );
        };
        if self.loader.min_acceptable_len == 0 {
            bail!("loader.min_acceptable_len must be at least 1");
        }
        // The bundled series is the last resort and must always be accepted
        let bundled = EmbeddedSource::len_since(floor)
            .map_err(|e| anyhow!("bundled series unreadable: {}", e))?;
        if bundled < self.loader.min_acceptable_len {
            bail!(
                "bundled series has {} points from {}, below loader.min_acceptable_len = {}",
                bundled,
                floor,
                self.loader.min_acceptable_len
            );
        }
        if self.cache.max_age_hours == 0 {
            bail!("cache.max_age_hours must be at least 1");
        }
        Ok(())
    }

    /// Provider credential, if configured. Absent means the proxy adapter is skipped.
    pub fn api_key() -> Option<String> {
        std::env::var(API_KEY_VAR)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "proxy={} public_enabled={} floor={} cache={} ({}h, key={}) min_len={}",
            self.sources.proxy_url,
            self.sources.public_enabled,
            self.sources.date_floor,
            self.cache.enabled,
            self.cache.max_age_hours,
            self.cache.key(),
            self.loader.min_acceptable_len,
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
