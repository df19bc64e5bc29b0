//! Core types used throughout btcfeed
//!
//! Defines the canonical price point, the tagged series and the source
//! identifiers shared by adapters, cache and loader.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which adapter produced a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Internal proxy in front of the paid provider
    Proxy,
    /// CoinGecko public API
    CoinGecko,
    /// Series bundled into the binary
    Embedded,
    /// Nothing could be loaded
    None,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Proxy => "proxy",
            SourceId::CoinGecko => "coingecko",
            SourceId::Embedded => "embedded",
            SourceId::None => "none",
        }
    }

    /// Sources that need the network; only these are refreshed and cached
    pub fn is_network(&self) -> bool {
        matches!(self, SourceId::Proxy | SourceId::CoinGecko)
    }
}

impl Default for SourceId {
    fn default() -> Self {
        SourceId::None
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One daily observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: Decimal) -> Self {
        Self { date, value }
    }

    /// Build a price point from a raw provider number.
    ///
    /// Returns `None` for NaN, infinities and negative prices. The value is
    /// rounded to cents (half away from zero) so comparisons downstream are
    /// stable.
    pub fn from_price(date: NaiveDate, price: f64) -> Option<Self> {
        if !price.is_finite() || price < 0.0 {
            return None;
        }
        let value = Decimal::from_f64(price)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Some(Self { date, value })
    }

    pub fn value_f64(&self) -> f64 {
        self.value.to_f64().unwrap_or(f64::NAN)
    }
}

/// Inclusive date range requested from a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// From `start` up to today (UTC)
    pub fn since(start: NaiveDate) -> Self {
        Self {
            start,
            end: Utc::now().date_naive(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// A price series tagged with the adapter that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub source: SourceId,
    pub fetched_at: DateTime<Utc>,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn new(source: SourceId, points: Vec<SeriesPoint>) -> Self {
        Self {
            source,
            fetched_at: Utc::now(),
            points,
        }
    }

    /// The terminal "nothing loaded" series
    pub fn empty() -> Self {
        Self::new(SourceId::None, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_adequate(&self, min_len: usize) -> bool {
        self.points.len() >= min_len
    }

    /// Sort ascending by date and drop duplicate dates.
    ///
    /// On duplicates the later point in provider order wins.
    pub fn canonicalize(mut self) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for point in self.points.drain(..) {
            by_date.insert(point.date, point.value);
        }
        self.points = by_date
            .into_iter()
            .map(|(date, value)| SeriesPoint { date, value })
            .collect();
        self
    }

    /// True when dates strictly increase
    pub fn is_canonical(&self) -> bool {
        self.points.windows(2).all(|w| w[0].date < w[1].date)
    }

    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// First and last date, if any
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.first()?.date, self.last()?.date))
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Points whose year falls in `start_year..=end_year`
    pub fn between_years(&self, start_year: i32, end_year: i32) -> Vec<SeriesPoint> {
        self.points
            .iter()
            .filter(|p| (start_year..=end_year).contains(&p.date.year()))
            .copied()
            .collect()
    }

    /// Daily log returns, dated at the later point.
    ///
    /// Pairs involving a non-positive price are skipped.
    pub fn log_returns(&self) -> Vec<(NaiveDate, f64)> {
        self.points
            .windows(2)
            .filter_map(|w| {
                let prev = w[0].value_f64();
                let curr = w[1].value_f64();
                if prev > 0.0 && curr > 0.0 {
                    Some((w[1].date, (curr / prev).ln()))
                } else {
                    None
                }
            })
            .collect()
    }
}
