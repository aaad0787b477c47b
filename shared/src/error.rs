use thiserror::Error;

use crate::series::Granularity;

/// Everything that can stop a chart request.
///
/// The `Display` text of each variant is what the user sees in the error view.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Please enter valid start and end dates in YYYY-MM-DD format.")]
    InvalidDates,
    #[error("Please enter a stock symbol.")]
    MissingSymbol,
    #[error("Invalid stock symbol. Please try again.")]
    InvalidSymbol,
    #[error("API limit reached. Please wait before trying again.")]
    RateLimited,
    #[error("{} data not available. Please try again.", .0.label())]
    ShapeMismatch(Granularity),
    #[error("Error fetching data: {0}")]
    Transport(String),
    #[error("No data available for the selected date range.")]
    EmptyRange,
    #[error("Received malformed data from the market data provider (timestamp {0:?}).")]
    MalformedTimestamp(String),
    #[error("Received malformed data from the market data provider ({field} {value:?} at {timestamp}).")]
    MalformedPrice {
        timestamp: String,
        field: &'static str,
        value: String,
    },
    #[error("chart rendering failed: {0}")]
    Render(String),
}

impl ChartError {
    /// Whether the request handler should show this error to the user instead of failing the request.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, ChartError::Render(_))
    }
}

impl From<reqwest::Error> for ChartError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key.
        ChartError::Transport(err.without_url().to_string())
    }
}

impl From<std::io::Error> for ChartError {
    fn from(err: std::io::Error) -> Self {
        ChartError::Render(err.to_string())
    }
}

impl From<askama::Error> for ChartError {
    fn from(err: askama::Error) -> Self {
        ChartError::Render(err.to_string())
    }
}
