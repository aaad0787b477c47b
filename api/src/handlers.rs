use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use axum_extra::extract::Form;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    fetch_series, filter_range, ChartArtifact, ChartError, ChartKind, DateRange, Granularity,
};
use tracing::{error, info, warn};

use crate::views::IndexTemplate;
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ChartForm {
    pub symbol: String,
    pub chart_type: String,
    pub time_series: String,
    pub start_date: String,
    pub end_date: String,
}

pub async fn index() -> Response {
    render(IndexTemplate::empty())
}

pub async fn submit(State(state): State<Arc<AppState>>, Form(form): Form<ChartForm>) -> Response {
    match run_query(&state, &form).await {
        Ok(artifact) => render(IndexTemplate::success(&form, artifact.url)),
        Err(e) if e.is_user_facing() => {
            warn!("Chart request for {:?} failed: {}", form.symbol, e);
            render(IndexTemplate::failure(&form, e.to_string()))
        }
        Err(e) => {
            error!("Chart rendering failed for {:?}: {}", form.symbol, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error while rendering the chart.",
            )
                .into_response()
        }
    }
}

/// Dates are checked before anything else so a bad range never reaches the provider.
pub async fn run_query(state: &AppState, form: &ChartForm) -> Result<ChartArtifact, ChartError> {
    let range = DateRange::from_form(&form.start_date, &form.end_date)?;
    let symbol = form.symbol.trim();
    if symbol.is_empty() {
        return Err(ChartError::MissingSymbol);
    }
    let granularity = Granularity::from_code(&form.time_series);
    let kind = ChartKind::from_flag(&form.chart_type);

    info!(
        "Chart request: {} {} {} to {}",
        symbol,
        granularity.label(),
        range.start(),
        range.end()
    );

    let raw = fetch_series(&*state.quotes, symbol, granularity).await?;
    let filtered = filter_range(raw, granularity.timestamp_format(), &range)?;
    state.charts.build(symbol, &range, kind, &filtered)
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": env!("GIT_HASH"),
        "build_time": env!("BUILD_TIME"),
    }))
}

fn render(template: IndexTemplate) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render index view: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
