//! Bundled monthly macro indicators (S&P 500, gold, DXY, 10Y yield)

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{align, AlignedIndicators, IndicatorSet};
use crate::dates;
use crate::error::IndicatorError;

pub const SP500: &str = "sp500";
pub const GOLD: &str = "gold";
pub const DXY: &str = "dxy";
/// 10-year Treasury yield, percent
pub const RATES: &str = "rates";

const MACRO_JSON: &str = include_str!("../../data/macro_monthly.json");

#[derive(Debug, Deserialize)]
struct MacroFile {
    dates: Vec<String>,
    indicators: BTreeMap<String, Vec<f64>>,
}

/// Monthly indicator set, first of each month from 2014-01
pub fn macro_indicators() -> Result<IndicatorSet, IndicatorError> {
    let file: MacroFile =
        serde_json::from_str(MACRO_JSON).map_err(|e| IndicatorError::Decode(e.to_string()))?;

    let dates = file
        .dates
        .iter()
        .map(|raw| dates::parse_iso(raw).ok_or_else(|| IndicatorError::BadDate(raw.clone())))
        .collect::<Result<Vec<NaiveDate>, _>>()?;

    IndicatorSet::new(dates, file.indicators)
}

/// Macro indicators interpolated onto `targets` (usually the BTC dates)
pub fn macro_aligned(targets: &[NaiveDate]) -> Result<AlignedIndicators, IndicatorError> {
    let set = macro_indicators()?;
    tracing::debug!(
        anchors = set.len(),
        targets = targets.len(),
        "Aligning macro indicators"
    );
    Ok(align(&set, targets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_set_is_well_formed() {
        let set = macro_indicators().expect("bundled macro data must load");
        assert_eq!(set.len(), 133);
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, vec![DXY, GOLD, RATES, SP500]);
        assert_eq!(set.values(SP500).unwrap()[0], 1782.0);
        assert_eq!(set.dates()[0], NaiveDate::from_ymd_opt(2014, 1, 1).unwrap());
    }

    #[test]
    fn aligned_values_hit_monthly_anchors() {
        let first = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
        let mid_jan = NaiveDate::from_ymd_opt(2014, 1, 16).unwrap();
        let aligned = macro_aligned(&[first, mid_jan]).unwrap();

        let gold = &aligned[GOLD];
        assert_eq!(gold[0], 1251.0);
        // Jan 1 → Feb 1 is 31 days, 15 days in
        let expected = 1251.0 + (15.0 / 31.0) * (1326.0 - 1251.0);
        assert!((gold[1] - expected).abs() < 1e-9);
    }
}
