//! Granularity selection for the market-data provider.
//!
//! Each granularity fixes the provider function, the optional interval
//! qualifier, the key the series is returned under, and how its timestamps
//! are written.

use chrono::{NaiveDate, NaiveDateTime};

/// Interval used for intraday requests.
pub const INTRADAY_INTERVAL: &str = "60min";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Intraday,
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Intraday,
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
    ];

    /// Map a form code (`1`..`4`) to a granularity.
    ///
    /// Unrecognized codes fall back to `Daily`.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => Granularity::Intraday,
            "2" => Granularity::Daily,
            "3" => Granularity::Weekly,
            "4" => Granularity::Monthly,
            _ => Granularity::Daily,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Granularity::Intraday => "1",
            Granularity::Daily => "2",
            Granularity::Weekly => "3",
            Granularity::Monthly => "4",
        }
    }

    pub fn function(&self) -> &'static str {
        match self {
            Granularity::Intraday => "TIME_SERIES_INTRADAY",
            Granularity::Daily => "TIME_SERIES_DAILY",
            Granularity::Weekly => "TIME_SERIES_WEEKLY",
            Granularity::Monthly => "TIME_SERIES_MONTHLY",
        }
    }

    pub fn interval(&self) -> Option<&'static str> {
        match self {
            Granularity::Intraday => Some(INTRADAY_INTERVAL),
            _ => None,
        }
    }

    pub fn response_key(&self) -> &'static str {
        match self {
            Granularity::Intraday => "Time Series (60min)",
            Granularity::Daily => "Time Series (Daily)",
            Granularity::Weekly => "Weekly Time Series",
            Granularity::Monthly => "Monthly Time Series",
        }
    }

    pub fn timestamp_format(&self) -> TimestampFormat {
        match self {
            Granularity::Intraday => TimestampFormat::DateTime,
            _ => TimestampFormat::Date,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Intraday => "Intraday",
            Granularity::Daily => "Daily",
            Granularity::Weekly => "Weekly",
            Granularity::Monthly => "Monthly",
        }
    }

    /// Query parameters for the provider, excluding symbol and credential.
    pub fn query_params(&self) -> Vec<(&'static str, &'static str)> {
        let mut params = vec![("function", self.function())];
        if let Some(interval) = self.interval() {
            params.push(("interval", interval));
        }
        params
    }
}

/// How the provider writes the keys of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime,
    /// `YYYY-MM-DD`
    Date,
}

impl TimestampFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            TimestampFormat::DateTime => "%Y-%m-%d %H:%M:%S",
            TimestampFormat::Date => "%Y-%m-%d",
        }
    }

    /// Parse a provider timestamp. Plain dates resolve to midnight.
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        match self {
            TimestampFormat::DateTime => NaiveDateTime::parse_from_str(raw, self.pattern()).ok(),
            TimestampFormat::Date => NaiveDate::parse_from_str(raw, self.pattern())
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}
