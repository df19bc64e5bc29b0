//! Series bundled into the binary at build time
//!
//! Monthly closes in the compact `D-Mon-YY` CSV layout. Always available
//! offline; the last link of the fallback chain.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::acquisition::sources::SeriesSource;
use crate::dates;
use crate::error::FetchError;
use crate::types::{DateRange, Series, SeriesPoint, SourceId};

const EMBEDDED_CSV: &str = include_str!("../../../data/btc_embedded.csv");

#[derive(Debug, Deserialize)]
struct EmbeddedRow {
    d: String,
    c: f64,
}

#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource;

impl EmbeddedSource {
    pub fn new() -> Self {
        Self
    }

    /// Every bundled point, in file order
    pub fn points() -> Result<Vec<SeriesPoint>, FetchError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(EMBEDDED_CSV.as_bytes());

        let mut points = Vec::new();
        for row in reader.deserialize::<EmbeddedRow>() {
            let row = row.map_err(|e| FetchError::malformed(format!("embedded csv: {}", e)))?;
            let date = dates::parse_compact(&row.d)
                .ok_or_else(|| FetchError::malformed(format!("embedded date {:?}", row.d)))?;
            let point = SeriesPoint::from_price(date, row.c)
                .ok_or_else(|| FetchError::malformed(format!("embedded price on {}", row.d)))?;
            points.push(point);
        }
        Ok(points)
    }

    /// Bundled points dated on or after `floor`
    pub fn len_since(floor: NaiveDate) -> Result<usize, FetchError> {
        Ok(Self::points()?.iter().filter(|p| p.date >= floor).count())
    }
}

#[async_trait]
impl SeriesSource for EmbeddedSource {
    fn id(&self) -> SourceId {
        SourceId::Embedded
    }

    async fn fetch(&self, range: DateRange) -> Result<Series, FetchError> {
        let points: Vec<SeriesPoint> = Self::points()?
            .into_iter()
            .filter(|p| range.contains(p.date))
            .collect();

        tracing::info!(
            source = %SourceId::Embedded,
            count = points.len(),
            "Loaded bundled series"
        );
        Ok(Series::new(SourceId::Embedded, points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_data_is_canonical_and_adequate() {
        let points = EmbeddedSource::points().expect("bundled csv must parse");
        let series = Series::new(SourceId::Embedded, points);
        assert!(series.is_canonical());
        assert!(series.is_adequate(100));
        assert_eq!(
            series.first().map(|p| p.date),
            NaiveDate::from_ymd_opt(2014, 1, 1)
        );
    }

    #[tokio::test]
    async fn fetch_filters_to_range() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        );
        let series = EmbeddedSource::new().fetch(range).await.unwrap();
        assert_eq!(series.len(), 12);
        assert_eq!(series.source, SourceId::Embedded);
    }

    #[test]
    fn len_since_counts_points_from_floor() {
        let jan_2014 = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
        let jan_2017 = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
        assert_eq!(EmbeddedSource::len_since(jan_2014).unwrap(), 133);
        assert_eq!(EmbeddedSource::len_since(jan_2017).unwrap(), 97);
    }
}
