//! Momentum backtest server
//!
//! HTTP surface for the backtest core: accepts a price panel (or a crypto
//! symbol list to download) plus strategy parameters, returns the result
//! series and summary statistics for a dashboard to render.
//!
//! Run: cargo run --release --bin server

use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use momentum_backtest::data::binance;
use momentum_backtest::{
    run_momentum_backtest, summary_stats, BacktestParams, BacktestResult, Panel, SummaryStats,
};

// ============================================================================
// State
// ============================================================================

struct AppState {
    http: reqwest::Client,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct BacktestRequest {
    prices: Panel,
    #[serde(default)]
    params: BacktestParams,
    /// 365 for crypto, 252 for business-day markets.
    #[serde(default = "default_periods_per_year")]
    periods_per_year: usize,
}

#[derive(Deserialize)]
struct CryptoBacktestRequest {
    symbols: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    #[serde(default)]
    params: BacktestParams,
}

fn default_periods_per_year() -> usize {
    365
}

#[derive(Serialize)]
struct BacktestResponse {
    stats: SummaryStats,
    result: BacktestResult,
    compute_ms: f64,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

fn run_and_summarize(
    prices: &Panel,
    params: &BacktestParams,
    periods_per_year: usize,
) -> Result<BacktestResponse, (StatusCode, String)> {
    let start = Instant::now();

    match run_momentum_backtest(prices, params) {
        Ok(result) => {
            let stats = summary_stats(&result.net_ret, &result.equity, periods_per_year);
            let compute_ms = start.elapsed().as_secs_f64() * 1000.0;
            eprintln!("[BT] Backtest completed in {:.2}ms", compute_ms);
            Ok(BacktestResponse {
                stats,
                result,
                compute_ms,
            })
        }
        Err(e) => {
            eprintln!("[BT] Backtest error: {}", e);
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

/// Backtest over an inline price panel.
async fn run_backtest_inline(
    Json(req): Json<BacktestRequest>,
) -> Result<Json<BacktestResponse>, (StatusCode, String)> {
    run_and_summarize(&req.prices, &req.params, req.periods_per_year).map(Json)
}

/// Download daily closes from Binance, then backtest.
async fn run_backtest_crypto(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    Json(req): Json<CryptoBacktestRequest>,
) -> Result<Json<BacktestResponse>, (StatusCode, String)> {
    let symbols: Vec<String> = req.symbols.iter().map(|s| s.to_uppercase()).collect();

    let prices = binance::build_close_panel(
        &state.http,
        &symbols,
        "1d",
        Utc.from_utc_datetime(&req.start.and_hms_opt(0, 0, 0).unwrap()),
        Utc.from_utc_datetime(&req.end.and_hms_opt(0, 0, 0).unwrap()),
        Duration::from_millis(200),
    )
    .await
    .map_err(|e| {
        eprintln!("[DATA] Download error: {}", e);
        (StatusCode::BAD_GATEWAY, e.to_string())
    })?;

    run_and_summarize(&prices, &req.params, 365).map(Json)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let state = Arc::new(AppState {
        http: reqwest::Client::new(),
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/backtest", post(run_backtest_inline))
        .route("/backtest/crypto", post(run_backtest_crypto))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3030));
    println!("Momentum backtest server on http://{}", addr);
    println!("  GET  /health           - liveness check");
    println!("  POST /backtest         - backtest an inline price panel");
    println!("  POST /backtest/crypto  - download Binance closes, then backtest");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
