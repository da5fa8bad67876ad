// src/data/binance.rs
// Binance Spot klines fetcher - paginated download into a wide close panel

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::BacktestError;
use crate::panel::Panel;

const BINANCE_BASE_URL: &str = "https://api.binance.com";
/// Binance caps klines pages at 1000 rows.
const PAGE_LIMIT: u32 = 1000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One symbol's klines query.
#[derive(Debug, Clone)]
pub struct KlinesRequest {
    /// e.g. "BTCUSDT"
    pub symbol: String,
    /// e.g. "1d", "1h"
    pub interval: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Fetch (open_time_ms, close) pairs for one symbol, following Binance's
/// pagination: each page starts one millisecond after the previous page's
/// last open time, until the window is exhausted or a page comes back empty.
///
/// `pause` is the delay between pages, keeping request rates polite.
pub async fn fetch_klines(
    client: &reqwest::Client,
    req: &KlinesRequest,
    pause: Duration,
) -> Result<Vec<(i64, f64)>, BacktestError> {
    let url = format!("{}/api/v3/klines", BINANCE_BASE_URL);
    let start_ms = req.start.timestamp_millis();
    let end_ms = req.end.timestamp_millis();

    let mut rows: Vec<(i64, f64)> = Vec::new();
    let mut cur_start = start_ms;

    while cur_start < end_ms {
        let body: Value = client
            .get(&url)
            .query(&[
                ("symbol", req.symbol.to_uppercase()),
                ("interval", req.interval.clone()),
                ("startTime", cur_start.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let page = parse_klines_page(&body)?;
        if page.is_empty() {
            break;
        }

        let last_open_time = page.last().map(|&(t, _)| t).unwrap_or(cur_start);
        rows.extend(page);

        // Next page starts 1 ms after the last row we saw.
        cur_start = last_open_time + 1;
        tokio::time::sleep(pause).await;
    }

    // Drop duplicate timestamps across page boundaries.
    rows.sort_by_key(|&(t, _)| t);
    rows.dedup_by_key(|&mut (t, _)| t);

    Ok(rows)
}

/// Parse one klines response page into (open_time_ms, close) pairs.
///
/// Binance returns heterogeneous arrays: open time is a number, the close
/// price is a decimal string.
fn parse_klines_page(body: &Value) -> Result<Vec<(i64, f64)>, BacktestError> {
    let rows = body
        .as_array()
        .ok_or_else(|| BacktestError::Http(format!("unexpected klines response: {body}")))?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let open_time = row.get(0).and_then(Value::as_i64);
        let close = row
            .get(4)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok());
        match (open_time, close) {
            (Some(t), Some(c)) => out.push((t, c)),
            _ => {
                return Err(BacktestError::Http(format!(
                    "malformed kline row: {row}"
                )))
            }
        }
    }
    Ok(out)
}

/// Download daily closes for many symbols and align them into a wide panel:
/// rows = dates (union over symbols), columns = symbols, NaN where a symbol
/// has no bar. Symbols with no data in the window drop out entirely.
pub async fn build_close_panel(
    client: &reqwest::Client,
    symbols: &[String],
    interval: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    pause: Duration,
) -> Result<Panel, BacktestError> {
    let mut series = Vec::new();

    for symbol in symbols {
        let req = KlinesRequest {
            symbol: symbol.clone(),
            interval: interval.to_string(),
            start,
            end,
        };
        let rows = fetch_klines(client, &req, pause).await?;
        eprintln!("[DATA] {}: {} bars", symbol.to_uppercase(), rows.len());
        if rows.is_empty() {
            continue;
        }

        let mut closes = BTreeMap::new();
        for (open_time_ms, close) in rows {
            if let Some(ts) = DateTime::<Utc>::from_timestamp_millis(open_time_ms) {
                // Same-date collisions (sub-daily intervals) keep the last bar.
                closes.insert(ts.date_naive(), close);
            }
        }
        series.push((symbol.to_uppercase(), closes));
    }

    Panel::from_series(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_klines_page() {
        let body = json!([
            [1700000000000i64, "100.0", "101.0", "99.0", "100.5", "12.3",
             1700086399999i64, "0", 10, "0", "0", "0"],
            [1700086400000i64, "100.5", "102.0", "100.0", "101.5", "9.8",
             1700172799999i64, "0", 8, "0", "0", "0"]
        ]);
        let rows = parse_klines_page(&body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], (1700000000000, 100.5));
        assert_eq!(rows[1].1, 101.5);
    }

    #[test]
    fn test_parse_empty_page() {
        let rows = parse_klines_page(&json!([])).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_klines_page(&json!({"code": -1121, "msg": "Invalid symbol."})),
            Err(BacktestError::Http(_))
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_row() {
        let body = json!([[1700000000000i64, "100.0"]]);
        assert!(matches!(
            parse_klines_page(&body),
            Err(BacktestError::Http(_))
        ));
    }
}
