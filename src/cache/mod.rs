//! Freshness Cache - Last accepted series, persisted between runs
//!
//! Records are stored under a versioned key (`price_cache_v<N>`) so a schema
//! change simply stops reading old records. Validity is decided when the
//! record is read, never when it is written.

mod store;

pub use store::{CacheStore, FileStore, MemoryStore};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::types::{Series, SeriesPoint, SourceId};

/// On-disk layout: `{ data, timestamp, source }`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    data: Vec<SeriesPoint>,
    /// Epoch milliseconds
    timestamp: i64,
    source: SourceId,
}

/// A cached series with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub series: Series,
    pub cached_at: DateTime<Utc>,
    pub source: SourceId,
}

impl CacheEntry {
    /// Milliseconds elapsed since the entry was written
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.cached_at).num_milliseconds()
    }
}

/// When a cached entry may be served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: Duration,
    pub min_len: usize,
}

impl CachePolicy {
    pub fn new(max_age: Duration, min_len: usize) -> Self {
        Self { max_age, min_len }
    }

    /// `0 <= age < max_age` and at least `min_len` points.
    ///
    /// A timestamp in the future means the record cannot be trusted.
    pub fn is_valid(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let age = entry.age_ms(now);
        let max_age = self.max_age.as_millis() as i64;
        age >= 0 && age < max_age && entry.series.len() >= self.min_len
    }
}

pub struct FreshnessCache {
    store: Arc<dyn CacheStore>,
    key: String,
    policy: CachePolicy,
}

impl FreshnessCache {
    pub fn new(store: Arc<dyn CacheStore>, key: impl Into<String>, policy: CachePolicy) -> Self {
        Self {
            store,
            key: key.into(),
            policy,
        }
    }

    /// File-backed cache when enabled, process-local otherwise
    pub fn from_config(config: &CacheConfig, min_len: usize) -> Self {
        let store: Arc<dyn CacheStore> = if config.enabled {
            Arc::new(FileStore::new(config.dir()))
        } else {
            Arc::new(MemoryStore::new())
        };
        Self::new(store, config.key(), CachePolicy::new(config.max_age(), min_len))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// A valid entry, or `None` if absent, stale, too small or unreadable
    pub async fn read(&self) -> Option<CacheEntry> {
        self.read_at(Utc::now()).await
    }

    pub async fn read_at(&self, now: DateTime<Utc>) -> Option<CacheEntry> {
        let entry = self.peek().await?;

        if !self.policy.is_valid(&entry, now) {
            tracing::debug!(
                key = %self.key,
                age_ms = entry.age_ms(now),
                count = entry.series.len(),
                "Cache entry not usable"
            );
            return None;
        }

        tracing::info!(
            key = %self.key,
            source = %entry.source,
            count = entry.series.len(),
            age_h = entry.age_ms(now) / 3_600_000,
            "📦 Serving series from cache"
        );
        Some(entry)
    }

    /// The stored entry regardless of freshness
    pub async fn peek(&self) -> Option<CacheEntry> {
        let raw = match self.store.load(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Cache read failed, treating as empty");
                return None;
            }
        };

        match Self::decode(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Cache record corrupt, ignoring");
                None
            }
        }
    }

    /// Replace the stored entry with `series`, stamped now
    pub async fn write(&self, series: &Series) -> Result<(), CacheError> {
        self.write_at(series, Utc::now()).await
    }

    pub async fn write_at(&self, series: &Series, now: DateTime<Utc>) -> Result<(), CacheError> {
        let record = CacheRecord {
            data: series.points.clone(),
            timestamp: now.timestamp_millis(),
            source: series.source,
        };
        let json = serde_json::to_string(&record)?;
        self.store.save(&self.key, &json).await?;
        tracing::info!(
            key = %self.key,
            source = %series.source,
            count = series.len(),
            "💾 Series cached"
        );
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store.remove(&self.key).await
    }

    fn decode(raw: &str) -> Result<CacheEntry, CacheError> {
        let record: CacheRecord = serde_json::from_str(raw)?;
        let cached_at = Utc
            .timestamp_millis_opt(record.timestamp)
            .single()
            .ok_or_else(|| corrupt("timestamp out of range"))?;

        let series = Series {
            source: record.source,
            fetched_at: cached_at,
            points: record.data,
        };
        if !series.is_canonical() {
            return Err(corrupt("points not in ascending date order"));
        }

        Ok(CacheEntry {
            series,
            cached_at,
            source: record.source,
        })
    }
}

fn corrupt(msg: &str) -> CacheError {
    CacheError::Corrupt(serde::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    const DAY_MS: u64 = 24 * 3600 * 1000;

    fn series(n: usize) -> Series {
        let start = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
        Series::new(
            SourceId::CoinGecko,
            (0..n)
                .map(|i| {
                    SeriesPoint::new(
                        start + chrono::Duration::days(i as i64),
                        Decimal::from(i as i64),
                    )
                })
                .collect(),
        )
    }

    fn cache(store: Arc<dyn CacheStore>) -> FreshnessCache {
        FreshnessCache::new(
            store,
            "price_cache_v3",
            CachePolicy::new(Duration::from_millis(DAY_MS), 100),
        )
    }

    #[tokio::test]
    async fn validity_boundaries() {
        let cache = cache(Arc::new(MemoryStore::new()));
        let written = Utc::now();
        cache.write_at(&series(100), written).await.unwrap();

        let just_fresh = written + chrono::Duration::milliseconds(DAY_MS as i64 - 1);
        let just_stale = written + chrono::Duration::milliseconds(DAY_MS as i64 + 1);
        assert!(cache.read_at(just_fresh).await.is_some());
        assert!(cache.read_at(just_stale).await.is_none());

        cache.write_at(&series(99), written).await.unwrap();
        assert!(cache.read_at(just_fresh).await.is_none());
        // still there, just not usable
        assert!(cache.peek().await.is_some());
    }

    #[tokio::test]
    async fn future_timestamp_is_not_valid() {
        let cache = cache(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        cache
            .write_at(&series(200), now + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert!(cache.read_at(now).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_record_reads_as_absent() {
        let store = Arc::new(MemoryStore::new());
        store.save("price_cache_v3", "{not json").await.unwrap();
        assert!(cache(store.clone()).read().await.is_none());

        // out-of-order points are rejected too
        let record = serde_json::json!({
            "data": [
                {"date": "2024-01-02", "value": "2"},
                {"date": "2024-01-01", "value": "1"}
            ],
            "timestamp": Utc::now().timestamp_millis(),
            "source": "proxy"
        });
        store.save("price_cache_v3", &record.to_string()).await.unwrap();
        assert!(cache(store).peek().await.is_none());
    }

    #[tokio::test]
    async fn entry_round_trips_source_and_points() {
        let cache = cache(Arc::new(MemoryStore::new()));
        let original = series(150);
        cache.write(&original).await.unwrap();

        let entry = cache.read().await.expect("fresh entry");
        assert_eq!(entry.source, SourceId::CoinGecko);
        assert_eq!(entry.series.points, original.points);
    }

    #[tokio::test]
    async fn other_version_keys_are_ignored() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
        let old = FreshnessCache::new(
            store.clone(),
            "price_cache_v2",
            CachePolicy::new(Duration::from_millis(DAY_MS), 100),
        );
        old.write(&series(150)).await.unwrap();
        assert!(cache(store).read().await.is_none());
    }

    #[tokio::test]
    async fn unreadable_directory_reads_as_absent() {
        // a regular file where the cache directory should be
        let path =
            std::env::temp_dir().join(format!("btcfeed_cache_file_{}", uuid::Uuid::new_v4()));
        std::fs::write(&path, "x").unwrap();

        let cache = cache(Arc::new(FileStore::new(&path)));
        assert!(cache.read().await.is_none());
        assert!(cache.write(&series(150)).await.is_err());
        let _ = std::fs::remove_file(&path);
    }
}
