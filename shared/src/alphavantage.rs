//! Alpha Vantage time-series client and response classification.
//!
//! Fetching and classifying are split: [`QuoteSource`] performs the single
//! outbound call and hands back the decoded body untouched, while
//! [`classify_response`] decides what that body means. Tests substitute their
//! own `QuoteSource`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ChartError;
use crate::series::Granularity;

/// Keys the provider uses to report usage limits.
const RATE_LIMIT_KEYS: [&str; 2] = ["Note", "Information"];
const ERROR_KEY: &str = "Error Message";

/// One OHLC record as the provider writes it: decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    #[serde(rename = "1. open")]
    pub open: String,
    #[serde(rename = "2. high")]
    pub high: String,
    #[serde(rename = "3. low")]
    pub low: String,
    #[serde(rename = "4. close")]
    pub close: String,
}

/// Timestamp-keyed records in the order the provider returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSeries {
    entries: Vec<(String, RawBar)>,
}

impl RawSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timestamp: impl Into<String>, bar: RawBar) {
        self.entries.push((timestamp.into(), bar));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawBar)> {
        self.entries.iter().map(|(ts, bar)| (ts.as_str(), bar))
    }

    pub fn into_entries(self) -> Vec<(String, RawBar)> {
        self.entries
    }
}

impl FromIterator<(String, RawBar)> for RawSeries {
    fn from_iter<I: IntoIterator<Item = (String, RawBar)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Provider seam: one call per request, no retries.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the raw response body for `symbol` at `granularity`.
    async fn time_series(&self, symbol: &str, granularity: Granularity)
        -> Result<Value, ChartError>;
}

/// Fetch and classify in one step.
pub async fn fetch_series(
    source: &dyn QuoteSource,
    symbol: &str,
    granularity: Granularity,
) -> Result<RawSeries, ChartError> {
    let body = source.time_series(symbol, granularity).await?;
    classify_response(granularity, body)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    InvalidSymbol,
    RateLimited,
    ShapeMismatch,
    Success,
}

type Rule = fn(&Map<String, Value>, Granularity) -> bool;

fn has_error(body: &Map<String, Value>, _: Granularity) -> bool {
    body.contains_key(ERROR_KEY)
}

fn has_rate_limit_note(body: &Map<String, Value>, _: Granularity) -> bool {
    RATE_LIMIT_KEYS.iter().any(|key| body.contains_key(*key))
}

fn lacks_series(body: &Map<String, Value>, granularity: Granularity) -> bool {
    !body
        .get(granularity.response_key())
        .is_some_and(Value::is_object)
}

/// Evaluated top to bottom, first match wins. Nothing matching means success.
const RULES: [(Rule, Classification); 3] = [
    (has_error, Classification::InvalidSymbol),
    (has_rate_limit_note, Classification::RateLimited),
    (lacks_series, Classification::ShapeMismatch),
];

/// Decide what a provider body means without looking at its series data.
pub fn classify(granularity: Granularity, body: &Value) -> Classification {
    let Some(body) = body.as_object() else {
        return Classification::ShapeMismatch;
    };
    RULES
        .iter()
        .find(|(rule, _)| rule(body, granularity))
        .map(|(_, outcome)| *outcome)
        .unwrap_or(Classification::Success)
}

/// Classify a provider body and, on success, extract its series.
pub fn classify_response(granularity: Granularity, body: Value) -> Result<RawSeries, ChartError> {
    match classify(granularity, &body) {
        Classification::InvalidSymbol => {
            warn!("Provider rejected the symbol: {}", body[ERROR_KEY]);
            Err(ChartError::InvalidSymbol)
        }
        Classification::RateLimited => {
            warn!("Provider usage limit reached");
            Err(ChartError::RateLimited)
        }
        Classification::ShapeMismatch => {
            warn!(
                "Provider response has no {:?} series",
                granularity.response_key()
            );
            Err(ChartError::ShapeMismatch(granularity))
        }
        Classification::Success => decode_series(granularity, body),
    }
}

fn decode_series(granularity: Granularity, body: Value) -> Result<RawSeries, ChartError> {
    let Value::Object(mut top) = body else {
        return Err(ChartError::ShapeMismatch(granularity));
    };
    let Some(Value::Object(series)) = top.remove(granularity.response_key()) else {
        return Err(ChartError::ShapeMismatch(granularity));
    };

    let raw = series
        .into_iter()
        .map(|(timestamp, record)| {
            serde_json::from_value::<RawBar>(record)
                .map(|bar| (timestamp, bar))
                .map_err(|e| {
                    warn!("Malformed {} record: {}", granularity.label(), e);
                    ChartError::ShapeMismatch(granularity)
                })
        })
        .collect::<Result<RawSeries, _>>()?;

    info!("Received {} {} records", raw.len(), granularity.label());
    Ok(raw)
}

#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AlphaVantageClient {
    /// `timeout_secs` below 1 is raised to 1.
    pub fn new(api_key: String, base_url: String, timeout_secs: u64) -> Result<Self, ChartError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            api_key,
            base_url,
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ChartError> {
        Self::new(
            config.alphavantage_api_key.clone(),
            config.alphavantage_base_url.clone(),
            config.http_timeout_secs,
        )
    }

    fn query_url(&self) -> String {
        format!("{}/query", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl QuoteSource for AlphaVantageClient {
    async fn time_series(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Value, ChartError> {
        let mut query: Vec<(&str, &str)> = granularity.query_params();
        query.push(("symbol", symbol));
        query.push(("apikey", self.api_key.as_str()));

        info!(
            "Requesting {} series for {} from {}",
            granularity.label(),
            symbol,
            self.base_url
        );
        let response = self
            .client
            .get(self.query_url())
            .query(&query)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Provider answered 429 for {}", symbol);
            return Err(ChartError::RateLimited);
        }

        match response.json::<Value>().await {
            Ok(body) => {
                debug!("Full provider response: {}", body);
                Ok(body)
            }
            Err(e) if e.is_decode() => {
                warn!("Provider body is not JSON: {}", e);
                Err(ChartError::ShapeMismatch(granularity))
            }
            Err(e) => Err(e.into()),
        }
    }
}
