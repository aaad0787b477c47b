pub mod alphavantage;
pub mod chart;
pub mod config;
pub mod error;
pub mod range;
pub mod series;
pub mod templates;

pub use alphavantage::{
    classify, classify_response, fetch_series, AlphaVantageClient, Classification, QuoteSource, RawBar,
    RawSeries,
};
pub use chart::{ArtifactNaming, ChartArtifact, ChartBuilder, ChartKind, ChartRenderer, ChartSpec};
pub use config::Config;
pub use error::ChartError;
pub use range::{filter_range, parse_form_date, DateRange, FilteredSeries};
pub use series::{Granularity, TimestampFormat};
pub use templates::SvgChartRenderer;
