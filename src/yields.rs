//! Preferred-share yield rates
//!
//! Reads dividend yields for the STR* preferreds from the provider's ratios
//! endpoint. Any ticker the provider does not report usably gets a fixed
//! fallback rate, so this never fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::acquisition::sources::http_client;
use crate::error::FetchError;

/// Tickers we report, with the rate used when the provider has none
pub const FALLBACK_RATES: [(&str, f64); 4] = [
    ("SATA", 0.12),
    ("STRC", 0.10),
    ("STRD", 0.13),
    ("STRF", 0.0958),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateOrigin {
    Provider,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldRate {
    pub ticker: String,
    /// Decimal fraction (0.12 = 12%)
    pub rate: f64,
    pub origin: RateOrigin,
}

#[derive(Debug, Clone, Serialize)]
pub struct YieldSnapshot {
    pub rates: Vec<YieldRate>,
    pub fetched_at: DateTime<Utc>,
    /// Why the provider could not be used at all
    pub error: Option<String>,
}

impl YieldSnapshot {
    pub fn rate(&self, ticker: &str) -> Option<f64> {
        self.rates
            .iter()
            .find(|r| r.ticker == ticker)
            .map(|r| r.rate)
    }

    /// "provider" if any rate came from the provider, else "fallback"
    pub fn source(&self) -> &'static str {
        if self.rates.iter().any(|r| r.origin == RateOrigin::Provider) {
            "provider"
        } else {
            "fallback"
        }
    }

    fn all_fallback(error: Option<String>) -> Self {
        Self {
            rates: FALLBACK_RATES
                .iter()
                .map(|(ticker, rate)| YieldRate {
                    ticker: ticker.to_string(),
                    rate: *rate,
                    origin: RateOrigin::Fallback,
                })
                .collect(),
            fetched_at: Utc::now(),
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatiosResponse {
    status: String,
    #[serde(default)]
    results: Option<Vec<RatioRow>>,
}

#[derive(Debug, Deserialize)]
struct RatioRow {
    ticker: String,
    #[serde(default)]
    dividend_yield: Option<f64>,
}

pub struct YieldClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl YieldClient {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            url: url.to_string(),
            api_key,
        }
    }

    /// Current rates for every tracked ticker
    pub async fn fetch_rates(&self) -> YieldSnapshot {
        let Some(api_key) = self.api_key.as_deref() else {
            info!("No provider credential configured, using fallback yield rates");
            return YieldSnapshot::all_fallback(Some("credential not configured".to_string()));
        };

        let body = match self.fetch_body(api_key).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Yield fetch failed, using fallback rates");
                return YieldSnapshot::all_fallback(Some(e.to_string()));
            }
        };

        match Self::resolve(&body) {
            Ok(rates) => YieldSnapshot {
                rates,
                fetched_at: Utc::now(),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Yield payload unusable, using fallback rates");
                YieldSnapshot::all_fallback(Some(e.to_string()))
            }
        }
    }

    async fn fetch_body(&self, api_key: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("apiKey", api_key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// Pick our tickers out of a ratios payload.
    ///
    /// A missing, non-finite, zero or negative yield counts as "not
    /// reported": the provider's contract does not say zero is a real
    /// value, so the fallback is used and the substitution is logged.
    pub(crate) fn resolve(body: &str) -> Result<Vec<YieldRate>, FetchError> {
        let response: RatiosResponse = serde_json::from_str(body)
            .map_err(|e| FetchError::malformed(format!("ratios body: {}", e)))?;

        if response.status != "OK" {
            return Err(FetchError::Rejected(format!("status {}", response.status)));
        }
        let results = response
            .results
            .ok_or_else(|| FetchError::malformed("ratios without results"))?;

        let rates = FALLBACK_RATES
            .iter()
            .map(|(ticker, fallback)| {
                let reported = results
                    .iter()
                    .find(|row| row.ticker == *ticker)
                    .and_then(|row| row.dividend_yield);

                match reported {
                    Some(rate) if rate.is_finite() && rate > 0.0 => YieldRate {
                        ticker: ticker.to_string(),
                        rate,
                        origin: RateOrigin::Provider,
                    },
                    other => {
                        warn!(
                            ticker = *ticker,
                            reported = ?other,
                            fallback = *fallback,
                            "Yield not reported usably, substituting fallback"
                        );
                        YieldRate {
                            ticker: ticker.to_string(),
                            rate: *fallback,
                            origin: RateOrigin::Fallback,
                        }
                    }
                }
            })
            .collect();

        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_rates_are_used_when_positive() {
        let body = serde_json::json!({
            "status": "OK",
            "results": [
                {"ticker": "SATA", "dividend_yield": 0.125},
                {"ticker": "STRC", "dividend_yield": 0.0},
                {"ticker": "STRD", "dividend_yield": -0.01},
                {"ticker": "AAPL", "dividend_yield": 0.005}
            ]
        });

        let rates = YieldClient::resolve(&body.to_string()).unwrap();
        assert_eq!(rates.len(), 4);
        assert_eq!(rates[0].rate, 0.125);
        assert_eq!(rates[0].origin, RateOrigin::Provider);
        // zero and negative are treated as missing
        assert_eq!(rates[1].rate, 0.10);
        assert_eq!(rates[1].origin, RateOrigin::Fallback);
        assert_eq!(rates[2].rate, 0.13);
        // absent ticker
        assert_eq!(rates[3].rate, 0.0958);
        assert_eq!(rates[3].origin, RateOrigin::Fallback);
    }

    #[test]
    fn bad_status_or_shape_is_an_error() {
        assert!(YieldClient::resolve(r#"{"status": "ERROR"}"#).is_err());
        assert!(YieldClient::resolve(r#"{"status": "OK"}"#).is_err());
        assert!(YieldClient::resolve("<html>").is_err());
    }

    #[tokio::test]
    async fn missing_credential_returns_fallback_snapshot() {
        let client = YieldClient::new("http://127.0.0.1:9/ratios", None, Duration::from_secs(1));
        let snapshot = client.fetch_rates().await;
        assert_eq!(snapshot.source(), "fallback");
        assert_eq!(snapshot.rate("STRF"), Some(0.0958));
        assert!(snapshot.error.is_some());
    }
}
