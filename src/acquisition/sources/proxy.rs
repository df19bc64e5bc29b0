//! Internal price proxy client
//!
//! The proxy fronts the paid provider and answers with a flat
//! `{success, source, count, data: [{date, price}]}` document. Dates are ISO,
//! though some upstreams still send the compact `17-Sep-14` form.

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::time::Duration;

use crate::acquisition::sources::{http_client, SeriesSource};
use crate::dates;
use crate::error::FetchError;
use crate::types::{DateRange, Series, SeriesPoint, SourceId};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    success: bool,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    data: Vec<ProxyPoint>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyPoint {
    date: String,
    price: f64,
}

#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl ProxyClient {
    pub fn new(url: &str, api_key: String, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            url: url.to_string(),
            api_key,
        }
    }

    /// Decode a proxy body into a series restricted to `range`
    pub(crate) fn parse_response(body: &str, range: DateRange) -> Result<Series, FetchError> {
        let response: ProxyResponse = serde_json::from_str(body)
            .map_err(|e| FetchError::malformed(format!("proxy body: {}", e)))?;

        if !response.success {
            return Err(FetchError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "success=false".to_string()),
            ));
        }

        if let Some(count) = response.count {
            if count != response.data.len() {
                tracing::debug!(
                    source = %SourceId::Proxy,
                    declared = count,
                    actual = response.data.len(),
                    "Proxy count field disagrees with payload"
                );
            }
        }

        let mut points = Vec::with_capacity(response.data.len());
        for item in &response.data {
            let date = dates::parse_any(&item.date)
                .ok_or_else(|| FetchError::malformed(format!("bad date {:?}", item.date)))?;
            let point = SeriesPoint::from_price(date, item.price)
                .ok_or_else(|| FetchError::malformed(format!("bad price on {}", item.date)))?;
            if range.contains(date) {
                points.push(point);
            }
        }

        tracing::debug!(
            source = %SourceId::Proxy,
            upstream = response.source.as_deref().unwrap_or("unknown"),
            count = points.len(),
            "Proxy payload decoded"
        );

        Ok(Series::new(SourceId::Proxy, points))
    }
}

#[async_trait]
impl SeriesSource for ProxyClient {
    fn id(&self) -> SourceId {
        SourceId::Proxy
    }

    async fn fetch(&self, range: DateRange) -> Result<Series, FetchError> {
        tracing::info!(
            source = %SourceId::Proxy,
            url = %self.url,
            "📥 Fetching series from proxy..."
        );

        let response = self
            .client
            .get(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if let Some(cache_control) = response.headers().get(CACHE_CONTROL) {
            tracing::debug!(
                source = %SourceId::Proxy,
                cache_control = ?cache_control,
                "Proxy cache policy"
            );
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Self::parse_response(&body, range)
    }
}
