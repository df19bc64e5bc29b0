//! Series source implementations (proxy, CoinGecko, embedded)

mod coingecko;
mod embedded;
mod proxy;

pub use coingecko::CoinGeckoClient;
pub use embedded::EmbeddedSource;
pub use proxy::ProxyClient;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::types::{DateRange, Series, SourceId};

/// Trait for historical series providers.
///
/// Implementations validate their own payload and convert it to canonical
/// points; a bad response is an `Err`, never a panic.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Identifier stamped on every series this source produces
    fn id(&self) -> SourceId;

    /// Fetch daily points within `range`
    async fn fetch(&self, range: DateRange) -> Result<Series, FetchError>;
}

/// Shared HTTP client for the network adapters
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("btcfeed/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Build the fallback chain in priority order: proxy, public, embedded.
///
/// The proxy is only included when a credential is configured.
pub fn default_chain(config: &AppConfig, api_key: Option<String>) -> Vec<Arc<dyn SeriesSource>> {
    let mut chain: Vec<Arc<dyn SeriesSource>> = Vec::new();
    let timeout = config.sources.request_timeout();

    match api_key {
        Some(key) => chain.push(Arc::new(ProxyClient::new(
            &config.sources.proxy_url,
            key,
            timeout,
        ))),
        None => tracing::info!(
            source = %SourceId::Proxy,
            "No provider credential configured, skipping proxy source"
        ),
    }

    if config.sources.public_enabled {
        chain.push(Arc::new(CoinGeckoClient::new(
            &config.sources.public_url,
            timeout,
        )));
    }

    chain.push(Arc::new(EmbeddedSource::new()));
    chain
}
