//! Crypto momentum backtest CLI
//!
//! Usage: momentum [symbols] [start] [end] [lookback] [rebalance_days] [top_n] [bottom_n]
//!
//! Downloads daily closes from Binance, runs the cross-sectional momentum
//! backtest and prints the summary statistics.

use chrono::{NaiveDate, TimeZone, Utc};
use std::time::Duration;

use momentum_backtest::data::binance::build_close_panel;
use momentum_backtest::{run_momentum_backtest, summary_stats, BacktestParams};

const DEFAULT_SYMBOLS: &str = "BTCUSDT,ETHUSDT,BNBUSDT,SOLUSDT,XRPUSDT";

fn parse_date(s: &str) -> NaiveDate {
    s.parse().unwrap_or_else(|_| {
        eprintln!("Invalid date '{}', expected YYYY-MM-DD", s);
        std::process::exit(1);
    })
}

/// Parse an optional count argument; a present-but-malformed value is an
/// error, not a silent fallback to the default.
fn parse_count(arg: Option<&String>, name: &str, default: usize) -> Result<usize, String> {
    match arg {
        Some(s) => s
            .parse()
            .map_err(|_| format!("Invalid {} '{}', expected a positive integer", name, s)),
        None => Ok(default),
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let symbols: Vec<String> = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_SYMBOLS)
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    let start = parse_date(args.get(2).map(|s| s.as_str()).unwrap_or("2022-01-01"));
    let end = parse_date(args.get(3).map(|s| s.as_str()).unwrap_or("2024-12-31"));

    let count = |i: usize, name: &str, default: usize| -> usize {
        parse_count(args.get(i), name, default).unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(1);
        })
    };
    let params = BacktestParams {
        lookback: count(4, "lookback", 60),
        rebalance_days: count(5, "rebalance_days", 21),
        top_n: count(6, "top_n", 2),
        bottom_n: count(7, "bottom_n", 2),
        ..Default::default()
    };

    eprintln!("[DATA] Downloading {} symbols, {} to {}", symbols.len(), start, end);

    let client = reqwest::Client::new();
    let prices = build_close_panel(
        &client,
        &symbols,
        "1d",
        Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).unwrap()),
        Utc.from_utc_datetime(&end.and_hms_opt(0, 0, 0).unwrap()),
        Duration::from_millis(200),
    )
    .await
    .unwrap_or_else(|e| {
        eprintln!("Download failed: {}", e);
        std::process::exit(1);
    });

    eprintln!(
        "[BT] Panel: {} dates x {} instruments",
        prices.num_rows(),
        prices.num_instruments()
    );

    let result = run_momentum_backtest(&prices, &params).unwrap_or_else(|e| {
        eprintln!("Backtest failed: {}", e);
        std::process::exit(1);
    });

    // Crypto trades every calendar day.
    let stats = summary_stats(&result.net_ret, &result.equity, 365);

    println!("=== Summary (Crypto) ===");
    println!("{}", stats);
    println!(
        "{:10}: {:.4}",
        "Equity",
        result.equity.last().copied().unwrap_or(1.0)
    );
    println!(
        "{:10}: {:.4}",
        "B&H eq.",
        result.bh_equity.last().copied().unwrap_or(1.0)
    );
    println!("{:10}: {}", "Rebalances", result.rebalance_dates.len());
}

#[cfg(test)]
mod tests {
    use super::parse_count;

    #[test]
    fn test_parse_count_absent_uses_default() {
        assert_eq!(parse_count(None, "lookback", 60), Ok(60));
    }

    #[test]
    fn test_parse_count_present_value_wins() {
        let arg = "15".to_string();
        assert_eq!(parse_count(Some(&arg), "top_n", 2), Ok(15));
    }

    #[test]
    fn test_parse_count_malformed_is_an_error() {
        let arg = "abc".to_string();
        let err = parse_count(Some(&arg), "rebalance_days", 21).unwrap_err();
        assert!(err.contains("rebalance_days"));
        assert!(err.contains("abc"));
    }
}
