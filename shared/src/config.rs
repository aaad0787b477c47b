use dotenv::dotenv;

use crate::chart::ArtifactNaming;

pub const DEFAULT_ALPHAVANTAGE_BASE_URL: &str = "https://www.alphavantage.co";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CHART_RETENTION: usize = 5;

pub struct Config {
    pub alphavantage_api_key: String,
    pub alphavantage_base_url: String,
    pub http_timeout_secs: u64,
    pub charts_dir: String,
    pub charts_base_path: String,
    pub chart_naming: ArtifactNaming,
    pub chart_retention: usize,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        Ok(Config {
            alphavantage_api_key: std::env::var("ALPHAVANTAGE_API_KEY")?,
            alphavantage_base_url: std::env::var("ALPHAVANTAGE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ALPHAVANTAGE_BASE_URL.to_string()),
            http_timeout_secs: parse_timeout_secs(std::env::var("HTTP_TIMEOUT_SECS").ok().as_deref()),
            charts_dir: std::env::var("CHARTS_DIR").unwrap_or_else(|_| "./static".to_string()),
            charts_base_path: std::env::var("CHARTS_BASE_PATH")
                .unwrap_or_else(|_| "/static".to_string()),
            chart_naming: std::env::var("CHART_NAMING")
                .map(|v| ArtifactNaming::from_setting(&v))
                .unwrap_or_default(),
            chart_retention: parse_retention(std::env::var("CHART_RETENTION").ok().as_deref()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
        })
    }
}

/// Seconds to wait for the provider. A zero timeout would fail every call, so the floor is 1.
pub fn parse_timeout_secs(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
        .max(1)
}

/// Per-request charts kept per symbol. At least the chart just written survives.
pub fn parse_retention(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_CHART_RETENTION)
        .max(1)
}
