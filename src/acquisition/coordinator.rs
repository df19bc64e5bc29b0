//! Fallback Coordinator - Tries sources in priority order
//!
//! Walks the chain (proxy, public, embedded) one source at a time and keeps
//! the first adequate series. Priority encodes a quality preference, so
//! sources are never raced.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use crate::acquisition::sources::SeriesSource;
use crate::error::FetchError;
use crate::types::{DateRange, Series};

pub struct FallbackCoordinator {
    /// Sources in priority order
    sources: Vec<Arc<dyn SeriesSource>>,
    /// Earliest date requested from any source
    date_floor: NaiveDate,
    /// Minimum points for a series to be accepted
    min_len: usize,
    /// Upper bound on a single source call
    fetch_timeout: Duration,
}

impl FallbackCoordinator {
    pub fn new(
        sources: Vec<Arc<dyn SeriesSource>>,
        date_floor: NaiveDate,
        min_len: usize,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            date_floor,
            min_len,
            fetch_timeout,
        }
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Run the whole chain. Never fails: the worst case is an empty series
    /// tagged `none`.
    pub async fn acquire(&self) -> Series {
        self.run(false).await
    }

    /// Same chain without offline sources, for background refreshes
    pub async fn acquire_network(&self) -> Series {
        self.run(true).await
    }

    async fn run(&self, network_only: bool) -> Series {
        let range = DateRange::since(self.date_floor);

        for source in &self.sources {
            let id = source.id();
            if network_only && !id.is_network() {
                continue;
            }

            match self.try_source(source.as_ref(), range).await {
                Ok(series) => {
                    tracing::info!(
                        source = %id,
                        count = series.len(),
                        "✅ Series accepted"
                    );
                    return series;
                }
                Err(e) => {
                    tracing::warn!(source = %id, error = %e, "Source failed, trying next");
                }
            }
        }

        tracing::error!(network_only, "❌ Every source failed, no series available");
        Series::empty()
    }

    /// One bounded attempt: fetch, canonicalize, check adequacy
    async fn try_source(
        &self,
        source: &dyn SeriesSource,
        range: DateRange,
    ) -> Result<Series, FetchError> {
        let fetched = tokio::time::timeout(self.fetch_timeout, source.fetch(range))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;

        let mut series = fetched.canonicalize();
        series.source = source.id();

        if !series.is_adequate(self.min_len) {
            return Err(FetchError::InsufficientData {
                got: series.len(),
                need: self.min_len,
            });
        }
        Ok(series)
    }
}
