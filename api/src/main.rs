use std::sync::Arc;

use anyhow::Result;
use api::{create_router, AppState};
use shared::{AlphaVantageClient, ChartBuilder, Config};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting stock chart server...");

    let config = Config::from_env()?;
    let quotes = AlphaVantageClient::from_config(&config)?;
    info!(
        "Market data from {} (timeout {}s)",
        config.alphavantage_base_url, config.http_timeout_secs
    );

    let charts_dir = std::path::Path::new(&config.charts_dir);
    info!("Writing charts to: {:?} ({:?} naming)", charts_dir, config.chart_naming);
    if let Err(e) = std::fs::create_dir_all(charts_dir) {
        error!("Failed to create charts directory: {}", e);
    }

    let state = Arc::new(AppState::new(
        Arc::new(quotes),
        ChartBuilder::from_config(&config),
    ));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Stock chart server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
