//! Date range parsing and filtering of raw series.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::alphavantage::{RawBar, RawSeries};
use crate::error::ChartError;
use crate::series::TimestampFormat;

/// Format of the start/end fields submitted by the form.
pub const FORM_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_form_date(raw: &str) -> Result<NaiveDate, ChartError> {
    NaiveDate::parse_from_str(raw.trim(), FORM_DATE_FORMAT).map_err(|_| ChartError::InvalidDates)
}

/// Inclusive calendar range. Both bounds sit at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parse both form fields; either one failing rejects the pair.
    pub fn from_form(start: &str, end: &str) -> Result<Self, ChartError> {
        Ok(Self::new(parse_form_date(start)?, parse_form_date(end)?))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let start = self.start.and_time(NaiveTime::MIN);
        let end = self.end.and_time(NaiveTime::MIN);
        start <= at && at <= end
    }
}

/// Records that fell inside a [`DateRange`]. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredSeries {
    entries: Vec<(String, RawBar)>,
}

impl FilteredSeries {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawBar)> {
        self.entries.iter().map(|(ts, bar)| (ts.as_str(), bar))
    }

    pub fn timestamps(&self) -> Vec<&str> {
        self.entries.iter().map(|(ts, _)| ts.as_str()).collect()
    }
}

/// Keep the records whose timestamp lies within `range`, in provider order.
///
/// Every key must parse under `format`, including ones outside the range.
pub fn filter_range(
    raw: RawSeries,
    format: TimestampFormat,
    range: &DateRange,
) -> Result<FilteredSeries, ChartError> {
    let total = raw.len();
    let mut entries = Vec::new();
    for (timestamp, bar) in raw.into_entries() {
        let at = format
            .parse(&timestamp)
            .ok_or_else(|| ChartError::MalformedTimestamp(timestamp.clone()))?;
        if range.contains(at) {
            entries.push((timestamp, bar));
        }
    }

    debug!(
        "Kept {} of {} records between {} and {}",
        entries.len(),
        total,
        range.start(),
        range.end()
    );

    if entries.is_empty() {
        return Err(ChartError::EmptyRange);
    }
    Ok(FilteredSeries { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(price: &str) -> RawBar {
        RawBar {
            open: price.to_string(),
            high: price.to_string(),
            low: price.to_string(),
            close: price.to_string(),
        }
    }

    fn daily(keys: &[&str]) -> RawSeries {
        keys.iter().map(|k| (k.to_string(), bar("1.0"))).collect()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::from_form(start, end).unwrap()
    }

    #[test]
    fn test_form_dates_reject_impossible_calendar_days() {
        assert!(matches!(
            DateRange::from_form("2024-13-40", "2024-01-03"),
            Err(ChartError::InvalidDates)
        ));
        assert!(matches!(
            DateRange::from_form("2024-01-01", "01/03/2024"),
            Err(ChartError::InvalidDates)
        ));
        assert!(matches!(parse_form_date(""), Err(ChartError::InvalidDates)));
        assert_eq!(
            parse_form_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let raw = daily(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        let filtered =
            filter_range(raw, TimestampFormat::Date, &range("2024-01-01", "2024-01-02")).unwrap();
        assert_eq!(filtered.timestamps(), vec!["2024-01-01", "2024-01-02"]);
    }

    #[test]
    fn test_no_overlap_is_empty_range() {
        let raw = daily(&["2024-01-01", "2024-01-02"]);
        let err = filter_range(raw, TimestampFormat::Date, &range("2023-06-01", "2023-06-30"))
            .unwrap_err();
        assert!(matches!(err, ChartError::EmptyRange));
    }

    #[test]
    fn test_reversed_range_is_empty_range() {
        let raw = daily(&["2024-01-01", "2024-01-02"]);
        let err = filter_range(raw, TimestampFormat::Date, &range("2024-01-02", "2024-01-01"))
            .unwrap_err();
        assert!(matches!(err, ChartError::EmptyRange));
    }

    #[test]
    fn test_provider_order_is_kept() {
        let raw = daily(&["2024-01-03", "2024-01-10", "2024-01-01", "2024-01-02"]);
        let filtered =
            filter_range(raw, TimestampFormat::Date, &range("2024-01-01", "2024-01-03")).unwrap();
        assert_eq!(
            filtered.timestamps(),
            vec!["2024-01-03", "2024-01-01", "2024-01-02"]
        );
    }

    #[test]
    fn test_unparseable_key_fails_even_outside_range() {
        let raw = daily(&["2024-01-01", "yesterday"]);
        let err = filter_range(raw, TimestampFormat::Date, &range("2024-01-01", "2024-01-01"))
            .unwrap_err();
        match err {
            ChartError::MalformedTimestamp(ts) => assert_eq!(ts, "yesterday"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_intraday_end_bound_is_midnight() {
        let raw: RawSeries = [
            "2024-01-02 00:00:00",
            "2024-01-02 15:00:00",
            "2024-01-01 10:00:00",
        ]
        .iter()
        .map(|k| (k.to_string(), bar("1.0")))
        .collect();
        let filtered = filter_range(
            raw,
            TimestampFormat::DateTime,
            &range("2024-01-01", "2024-01-02"),
        )
        .unwrap();
        assert_eq!(
            filtered.timestamps(),
            vec!["2024-01-02 00:00:00", "2024-01-01 10:00:00"]
        );
    }
}
