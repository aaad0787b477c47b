//! Tests for the real provider client against a local axum server.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shared::{fetch_series, AlphaVantageClient, ChartError, Granularity, QuoteSource};
use tokio::net::TcpListener;

// ============================================================================
// Test Fixtures
// ============================================================================

type SeenQueries = Arc<Mutex<Vec<String>>>;

async fn record_query(
    State(seen): State<SeenQueries>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    seen.lock().unwrap().push(query.unwrap_or_default());
    Json(json!({
        "Meta Data": { "2. Symbol": "ACME" },
        "Time Series (Daily)": {
            "2024-01-02": {
                "1. open": "102.0000", "2. high": "103.0000",
                "3. low": "101.0000", "4. close": "102.5000", "5. volume": "1000"
            },
            "2024-01-01": {
                "1. open": "101.0000", "2. high": "102.0000",
                "3. low": "100.0000", "4. close": "101.5000", "5. volume": "1000"
            }
        }
    }))
}

/// Start a fake provider and return its address plus the query strings it received.
async fn start_provider() -> (SocketAddr, SeenQueries) {
    let seen = SeenQueries::default();

    let app = Router::new()
        .route("/query", get(record_query))
        .route(
            "/limited/query",
            get(|| async { StatusCode::TOO_MANY_REQUESTS }),
        )
        .route(
            "/html/query",
            get(|| async { Html("<html><body>Service Unavailable</body></html>") }),
        )
        .route(
            "/slow/query",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({}))
            }),
        )
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, seen)
}

fn client(addr: SocketAddr, prefix: &str, timeout_secs: u64) -> AlphaVantageClient {
    AlphaVantageClient::new(
        "KEY".to_string(),
        format!("http://{}{}", addr, prefix),
        timeout_secs,
    )
    .unwrap()
}

// ============================================================================
// Query String
// ============================================================================

#[tokio::test]
async fn test_intraday_query_carries_interval() {
    let (addr, seen) = start_provider().await;

    client(addr, "", 5)
        .time_series("ACME", Granularity::Intraday)
        .await
        .unwrap();

    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["function=TIME_SERIES_INTRADAY&interval=60min&symbol=ACME&apikey=KEY"]
    );
}

#[tokio::test]
async fn test_daily_query_has_no_interval_and_decodes() {
    let (addr, seen) = start_provider().await;

    // Trailing slash on the base URL must not double up.
    let quotes = client(addr, "/", 5);
    let series = fetch_series(&quotes, "ACME", Granularity::Daily).await.unwrap();

    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["function=TIME_SERIES_DAILY&symbol=ACME&apikey=KEY"]
    );
    assert_eq!(series.len(), 2);
    let timestamps: Vec<&str> = series.iter().map(|(ts, _)| ts).collect();
    assert_eq!(timestamps, vec!["2024-01-02", "2024-01-01"]);
}

// ============================================================================
// Failure Classification
// ============================================================================

#[tokio::test]
async fn test_too_many_requests_is_rate_limited() {
    let (addr, _) = start_provider().await;

    let err = client(addr, "/limited", 5)
        .time_series("ACME", Granularity::Daily)
        .await
        .unwrap_err();

    assert!(matches!(err, ChartError::RateLimited));
}

#[tokio::test]
async fn test_html_body_is_shape_mismatch() {
    let (addr, _) = start_provider().await;

    let err = client(addr, "/html", 5)
        .time_series("ACME", Granularity::Daily)
        .await
        .unwrap_err();

    assert!(matches!(err, ChartError::ShapeMismatch(Granularity::Daily)));
}

#[tokio::test]
async fn test_slow_provider_is_transport_failure() {
    let (addr, _) = start_provider().await;

    let err = client(addr, "/slow", 1)
        .time_series("ACME", Granularity::Daily)
        .await
        .unwrap_err();

    match err {
        ChartError::Transport(cause) => assert!(!cause.contains("KEY")),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_timeout_still_reaches_provider() {
    let (addr, seen) = start_provider().await;

    client(addr, "", 0)
        .time_series("ACME", Granularity::Daily)
        .await
        .unwrap();

    assert_eq!(seen.lock().unwrap().len(), 1);
}
