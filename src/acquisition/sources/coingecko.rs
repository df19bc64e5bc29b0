//! CoinGecko public API client
//!
//! Fetches the daily BTC/USD market chart. The payload is a list of
//! `[timestamp_ms, price]` pairs.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::acquisition::sources::{http_client, SeriesSource};
use crate::dates;
use crate::error::FetchError;
use crate::types::{DateRange, Series, SeriesPoint, SourceId};

#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: reqwest::Client,
    url: String,
}

impl CoinGeckoClient {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            url: url.to_string(),
        }
    }

    /// Decode a market chart body, keeping only days inside `range`
    pub(crate) fn parse_response(body: &str, range: DateRange) -> Result<Series, FetchError> {
        let chart: MarketChart = serde_json::from_str(body)
            .map_err(|e| FetchError::malformed(format!("market chart: {}", e)))?;

        let mut points = Vec::with_capacity(chart.prices.len());
        for (ts, price) in chart.prices {
            if !ts.is_finite() {
                return Err(FetchError::malformed("non-finite timestamp"));
            }
            let date = dates::date_from_millis(ts as i64)
                .ok_or_else(|| FetchError::malformed(format!("timestamp out of range: {}", ts)))?;
            let point = SeriesPoint::from_price(date, price)
                .ok_or_else(|| FetchError::malformed(format!("bad price on {}", date)))?;
            if range.contains(date) {
                points.push(point);
            }
        }

        Ok(Series::new(SourceId::CoinGecko, points))
    }
}

#[async_trait]
impl SeriesSource for CoinGeckoClient {
    fn id(&self) -> SourceId {
        SourceId::CoinGecko
    }

    async fn fetch(&self, range: DateRange) -> Result<Series, FetchError> {
        tracing::info!(
            source = %SourceId::CoinGecko,
            url = %self.url.split('?').next().unwrap_or(self.url.as_str()),
            "📥 Fetching series from CoinGecko..."
        );

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Self::parse_response(&body, range)
    }
}
