pub mod handlers;
pub mod views;

use std::sync::Arc;

use axum::{routing::get, Router};
use shared::{ChartBuilder, QuoteSource};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub quotes: Arc<dyn QuoteSource>,
    pub charts: ChartBuilder,
}

impl AppState {
    pub fn new(quotes: Arc<dyn QuoteSource>, charts: ChartBuilder) -> Self {
        Self { quotes, charts }
    }
}

/// `/` serves the form (GET) and runs a query (POST); rendered charts are
/// served from the chart builder's output directory under its base path.
pub fn create_router(state: Arc<AppState>) -> Router {
    let charts = ServeDir::new(state.charts.output_dir())
        .append_index_html_on_directories(false);
    let prefix = state.charts.base_path().trim_matches('/');

    let router = Router::new()
        .route("/", get(handlers::index).post(handlers::submit))
        .route("/health", get(handlers::health_check));

    // Nesting at "/" is rejected by axum; a root prefix serves charts as the fallback.
    let router = if prefix.is_empty() {
        router.fallback_service(charts)
    } else {
        router.nest_service(&format!("/{}", prefix), charts)
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
