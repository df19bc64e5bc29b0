//! Date parsing for the formats our data arrives in
//!
//! The embedded data uses the compact `17-Sep-14` form; providers use ISO
//! `2014-09-17` or epoch milliseconds.

use chrono::{DateTime, Datelike, NaiveDate};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse `D-Mon-YY`. Two-digit years below 50 are 20xx, the rest 19xx.
pub fn parse_compact(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.trim().split('-');
    let day: u32 = parts.next()?.parse().ok()?;
    let month_name = parts.next()?;
    let year_part = parts.next()?;
    if parts.next().is_some() || year_part.len() != 2 {
        return None;
    }
    let month = MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(month_name))? as u32
        + 1;
    let yy: i32 = year_part.parse().ok()?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn format_compact(date: NaiveDate) -> String {
    format!(
        "{}-{}-{:02}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year().rem_euclid(100)
    )
}

pub fn parse_iso(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// ISO first, then compact
pub fn parse_any(raw: &str) -> Option<NaiveDate> {
    parse_iso(raw).or_else(|| parse_compact(raw))
}

/// UTC calendar day of an epoch-millisecond timestamp
pub fn date_from_millis(ts_ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ts_ms).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_round_trip_for_known_dates() {
        let date = parse_compact("17-Sep-14").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2014, 9, 17).unwrap());
        assert_eq!(format_compact(date), "17-Sep-14");

        let jan = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(format_compact(jan), "1-Jan-25");
    }

    #[test]
    fn compact_century_pivot() {
        assert_eq!(parse_compact("1-oct-49").unwrap().year(), 2049);
        assert_eq!(parse_compact("1-Oct-50").unwrap().year(), 1950);
    }

    #[test]
    fn compact_rejects_garbage() {
        assert!(parse_compact("32-Jan-14").is_none());
        assert!(parse_compact("1-Foo-14").is_none());
        assert!(parse_compact("1-Jan-2014").is_none());
        assert!(parse_compact("2014-01-01").is_none());
    }

    #[test]
    fn parse_any_accepts_both_forms() {
        let expected = NaiveDate::from_ymd_opt(2014, 1, 1);
        assert_eq!(parse_any("2014-01-01"), expected);
        assert_eq!(parse_any("1-Jan-14"), expected);
    }

    #[test]
    fn millis_map_to_utc_day() {
        // 2014-01-01T23:59:59.999Z
        assert_eq!(
            date_from_millis(1_388_620_799_999),
            NaiveDate::from_ymd_opt(2014, 1, 1)
        );
    }
}
