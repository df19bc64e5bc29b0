//! Series Aligner - maps sparse indicator series onto a denser date axis
//!
//! Values between two anchors are linearly interpolated; dates outside the
//! anchors take the nearest boundary value. Nothing is extrapolated.

mod macro_data;

pub use macro_data::{macro_aligned, macro_indicators, DXY, GOLD, RATES, SP500};

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::IndicatorError;
use crate::types::Series;

/// Indicator name → one value per target date, in target order
pub type AlignedIndicators = BTreeMap<String, Vec<f64>>;

/// Lower-frequency indicator series sharing one date axis
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    dates: Vec<NaiveDate>,
    indicators: BTreeMap<String, Vec<f64>>,
}

impl IndicatorSet {
    /// Validate and build.
    ///
    /// The axis must be non-empty and non-decreasing, and every indicator
    /// needs exactly one finite value per date.
    pub fn new(
        dates: Vec<NaiveDate>,
        indicators: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, IndicatorError> {
        if dates.is_empty() {
            return Err(IndicatorError::Empty);
        }
        if let Some(i) = dates.windows(2).position(|w| w[1] < w[0]) {
            return Err(IndicatorError::Unsorted(i + 1));
        }
        for (name, values) in &indicators {
            if values.len() != dates.len() {
                return Err(IndicatorError::LengthMismatch {
                    name: name.clone(),
                    expected: dates.len(),
                    got: values.len(),
                });
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(IndicatorError::NonFinite(name.clone()));
            }
        }
        Ok(Self { dates, indicators })
    }

    /// Single-indicator set taken from a price series
    pub fn from_series(name: &str, series: &Series) -> Result<Self, IndicatorError> {
        let mut indicators = BTreeMap::new();
        indicators.insert(
            name.to_string(),
            series.points.iter().map(|p| p.value_f64()).collect(),
        );
        Self::new(series.dates(), indicators)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.indicators.keys().map(|k| k.as_str())
    }

    pub fn values(&self, name: &str) -> Option<&[f64]> {
        self.indicators.get(name).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Where a target date falls on the anchor axis
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bracket {
    before: usize,
    after: usize,
    t: f64,
}

impl Bracket {
    fn locate(axis: &[NaiveDate], target: NaiveDate) -> Self {
        let last = axis.len() - 1;
        if target <= axis[0] {
            return Self::at(0);
        }
        if target >= axis[last] {
            return Self::at(last);
        }

        // axis[before] <= target < axis[after]
        let after = axis.partition_point(|d| *d <= target);
        let before = after - 1;
        let total = (axis[after] - axis[before]).num_days();
        let since = (target - axis[before]).num_days();
        let t = if total > 0 {
            since as f64 / total as f64
        } else {
            0.0
        };
        Self { before, after, t }
    }

    fn at(index: usize) -> Self {
        Self {
            before: index,
            after: index,
            t: 0.0,
        }
    }

    fn apply(&self, values: &[f64]) -> f64 {
        let before = values[self.before];
        let after = values[self.after];
        before + self.t * (after - before)
    }
}

/// Interpolate every indicator in `set` at each of `targets`.
///
/// The output vectors have `targets.len()` entries in the same order as
/// `targets`, which need not be sorted. `set` is left untouched.
pub fn align(set: &IndicatorSet, targets: &[NaiveDate]) -> AlignedIndicators {
    let brackets: Vec<Bracket> = targets
        .iter()
        .map(|t| Bracket::locate(&set.dates, *t))
        .collect();

    set.indicators
        .iter()
        .map(|(name, values)| {
            let aligned = brackets.iter().map(|b| b.apply(values)).collect();
            (name.clone(), aligned)
        })
        .collect()
}

/// Interpolate a single series at `targets`; `None` for an empty series
pub fn interpolate(series: &Series, targets: &[NaiveDate]) -> Option<Vec<f64>> {
    if series.is_empty() {
        return None;
    }
    let axis = series.dates();
    let values: Vec<f64> = series.points.iter().map(|p| p.value_f64()).collect();
    Some(
        targets
            .iter()
            .map(|t| Bracket::locate(&axis, *t).apply(&values))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SeriesPoint, SourceId};
    use rust_decimal::Decimal;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    fn two_anchor_set() -> IndicatorSet {
        let mut indicators = BTreeMap::new();
        indicators.insert("x".to_string(), vec![100.0, 200.0]);
        IndicatorSet::new(vec![day(0), day(10)], indicators).unwrap()
    }

    #[test]
    fn interpolation_is_exact_at_and_between_anchors() {
        let aligned = align(&two_anchor_set(), &[day(0), day(5), day(10)]);
        assert_eq!(aligned["x"], vec![100.0, 150.0, 200.0]);
    }

    #[test]
    fn targets_outside_anchors_clamp_to_boundary() {
        let aligned = align(&two_anchor_set(), &[day(-30), day(11), day(400)]);
        assert_eq!(aligned["x"], vec![100.0, 200.0, 200.0]);
    }

    #[test]
    fn output_follows_target_order() {
        let aligned = align(&two_anchor_set(), &[day(10), day(0), day(5)]);
        assert_eq!(aligned["x"], vec![200.0, 100.0, 150.0]);
    }

    #[test]
    fn picks_the_right_interval_on_a_longer_axis() {
        let mut indicators = BTreeMap::new();
        indicators.insert("a".to_string(), vec![0.0, 10.0, 10.0, 40.0]);
        indicators.insert("b".to_string(), vec![1.0, 1.0, 1.0, 1.0]);
        let set = IndicatorSet::new(vec![day(0), day(10), day(20), day(30)], indicators).unwrap();

        let aligned = align(&set, &[day(15), day(20), day(25)]);
        assert_eq!(aligned["a"], vec![10.0, 10.0, 25.0]);
        assert_eq!(aligned["b"], vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn repeated_anchor_dates_do_not_divide_by_zero() {
        let mut indicators = BTreeMap::new();
        indicators.insert("x".to_string(), vec![1.0, 5.0, 9.0]);
        let set = IndicatorSet::new(vec![day(0), day(0), day(4)], indicators).unwrap();

        let aligned = align(&set, &[day(0), day(2)]);
        assert_eq!(aligned["x"], vec![1.0, 7.0]);
        assert!(aligned["x"].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn single_anchor_is_constant() {
        let mut indicators = BTreeMap::new();
        indicators.insert("x".to_string(), vec![42.0]);
        let set = IndicatorSet::new(vec![day(3)], indicators).unwrap();
        assert_eq!(align(&set, &[day(0), day(3), day(9)])["x"], vec![42.0; 3]);
    }

    #[test]
    fn construction_rejects_bad_sets() {
        assert_eq!(
            IndicatorSet::new(Vec::new(), BTreeMap::new()).unwrap_err(),
            IndicatorError::Empty
        );

        let mut short = BTreeMap::new();
        short.insert("x".to_string(), vec![1.0]);
        assert!(matches!(
            IndicatorSet::new(vec![day(0), day(1)], short).unwrap_err(),
            IndicatorError::LengthMismatch { .. }
        ));

        let mut ok = BTreeMap::new();
        ok.insert("x".to_string(), vec![1.0, 2.0]);
        assert_eq!(
            IndicatorSet::new(vec![day(1), day(0)], ok).unwrap_err(),
            IndicatorError::Unsorted(1)
        );

        let mut nan = BTreeMap::new();
        nan.insert("x".to_string(), vec![1.0, f64::NAN]);
        assert!(matches!(
            IndicatorSet::new(vec![day(0), day(1)], nan).unwrap_err(),
            IndicatorError::NonFinite(_)
        ));
    }

    #[test]
    fn interpolate_series_and_empty_series() {
        let series = Series::new(
            SourceId::Embedded,
            vec![
                SeriesPoint::new(day(0), Decimal::from(100)),
                SeriesPoint::new(day(10), Decimal::from(200)),
            ],
        );
        assert_eq!(interpolate(&series, &[day(5)]), Some(vec![150.0]));
        assert_eq!(interpolate(&Series::empty(), &[day(5)]), None);
    }

    #[test]
    fn align_leaves_source_set_unchanged() {
        let set = two_anchor_set();
        let before = set.clone();
        let _ = align(&set, &[day(3)]);
        assert_eq!(set, before);
    }
}
