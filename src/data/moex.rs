// src/data/moex.rs
// MOEX ISS fetchers - share price history and the IMOEX index universe
//
// The ISS history endpoint pages through an offset cursor; column positions
// are resolved once per page by exact name (TRADEDATE, CLOSE). The universe
// loader exposes a fixed contract - a sorted ticker list - instead of the
// schema sniffing the upstream tables invite.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::BacktestError;
use crate::panel::Panel;

const MOEX_ISS: &str = "https://iss.moex.com/iss";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch one ticker's daily close history over [from, till].
///
/// Rows with a null close (non-trading board states) are skipped.
pub async fn fetch_history(
    client: &reqwest::Client,
    ticker: &str,
    from: NaiveDate,
    till: NaiveDate,
    pause: Duration,
) -> Result<BTreeMap<NaiveDate, f64>, BacktestError> {
    let url = format!(
        "{}/history/engines/stock/markets/shares/securities/{}.json",
        MOEX_ISS, ticker
    );

    let mut closes = BTreeMap::new();
    let mut offset: u64 = 0;

    loop {
        let body: Value = client
            .get(&url)
            .query(&[
                ("iss.meta", "off".to_string()),
                ("from", from.to_string()),
                ("till", till.to_string()),
                ("start", offset.to_string()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let (rows, next_offset) = parse_history_page(&body)?;
        if rows.is_empty() {
            break;
        }
        closes.extend(rows);

        match next_offset {
            Some(next) => {
                offset = next;
                tokio::time::sleep(pause).await;
            }
            None => break,
        }
    }

    Ok(closes)
}

/// Parse one ISS history page: (date, close) rows plus the next page offset,
/// if the cursor says more rows remain.
fn parse_history_page(
    body: &Value,
) -> Result<(Vec<(NaiveDate, f64)>, Option<u64>), BacktestError> {
    let table = &body["history"];
    let columns = table["columns"]
        .as_array()
        .ok_or_else(|| BacktestError::Http("history.columns missing".to_string()))?;

    let date_idx = column_index(columns, "TRADEDATE")?;
    let close_idx = column_index(columns, "CLOSE")?;

    let mut rows = Vec::new();
    for row in table["data"].as_array().into_iter().flatten() {
        let date = row
            .get(date_idx)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<NaiveDate>().ok());
        let close = row.get(close_idx).and_then(Value::as_f64);
        if let (Some(date), Some(close)) = (date, close) {
            rows.push((date, close));
        }
    }

    // history.cursor: one row of [INDEX, TOTAL, PAGESIZE].
    let cursor = &body["history.cursor"];
    let next = match (cursor["columns"].as_array(), cursor["data"].as_array()) {
        (Some(cols), Some(data)) => {
            let row = data.first().and_then(Value::as_array);
            let field = |name: &str| {
                let idx = cols.iter().position(|c| c.as_str() == Some(name))?;
                row?.get(idx).and_then(Value::as_u64)
            };
            match (field("INDEX"), field("TOTAL"), field("PAGESIZE")) {
                (Some(index), Some(total), Some(page_size))
                    if index + page_size < total =>
                {
                    Some(index + page_size)
                }
                _ => None,
            }
        }
        _ => None,
    };

    Ok((rows, next))
}

fn column_index(columns: &[Value], name: &str) -> Result<usize, BacktestError> {
    columns
        .iter()
        .position(|c| c.as_str() == Some(name))
        .ok_or_else(|| BacktestError::Http(format!("column {name} missing from ISS response")))
}

/// Download daily closes for many tickers into a wide panel over the union
/// of trading dates. Tickers with no history in the window drop out.
pub async fn build_close_panel(
    client: &reqwest::Client,
    tickers: &[String],
    from: NaiveDate,
    till: NaiveDate,
    pause: Duration,
) -> Result<Panel, BacktestError> {
    let mut series = Vec::new();

    for ticker in tickers {
        let closes = fetch_history(client, ticker, from, till, pause).await?;
        eprintln!("[DATA] {}: {} trading days", ticker, closes.len());
        if closes.is_empty() {
            continue;
        }
        series.push((ticker.clone(), closes));
    }

    Panel::from_series(series)
}

/// Load the IMOEX constituent tickers from the ISS index analytics table.
pub async fn fetch_universe(client: &reqwest::Client) -> Result<Vec<String>, BacktestError> {
    let url = format!(
        "{}/statistics/engines/stock/markets/index/analytics/IMOEX.json",
        MOEX_ISS
    );

    let body: Value = client
        .get(&url)
        .query(&[("iss.meta", "off")])
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    parse_universe(&body)
}

fn parse_universe(body: &Value) -> Result<Vec<String>, BacktestError> {
    let table = &body["analytics"];
    let columns = table["columns"]
        .as_array()
        .ok_or_else(|| BacktestError::Http("analytics.columns missing".to_string()))?;
    let secid_idx = column_index(columns, "secids")
        .or_else(|_| column_index(columns, "SECID"))?;

    let mut tickers: Vec<String> = table["data"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|row| row.get(secid_idx))
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    tickers.sort();
    tickers.dedup();
    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_history_page_with_more_pages() {
        let body = json!({
            "history": {
                "columns": ["BOARDID", "TRADEDATE", "SECID", "CLOSE"],
                "data": [
                    ["TQBR", "2024-01-03", "SBER", 270.5],
                    ["TQBR", "2024-01-04", "SBER", 272.1],
                    ["TQBR", "2024-01-05", "SBER", null]
                ]
            },
            "history.cursor": {
                "columns": ["INDEX", "TOTAL", "PAGESIZE"],
                "data": [[0, 250, 100]]
            }
        });
        let (rows, next) = parse_history_page(&body).unwrap();
        // The null close row drops out.
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "2024-01-03".parse::<NaiveDate>().unwrap());
        assert_eq!(rows[1].1, 272.1);
        assert_eq!(next, Some(100));
    }

    #[test]
    fn test_parse_history_last_page_has_no_next() {
        let body = json!({
            "history": {
                "columns": ["TRADEDATE", "CLOSE"],
                "data": [["2024-01-03", 270.5]]
            },
            "history.cursor": {
                "columns": ["INDEX", "TOTAL", "PAGESIZE"],
                "data": [[200, 250, 100]]
            }
        });
        let (rows, next) = parse_history_page(&body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(next, None);
    }

    #[test]
    fn test_parse_history_missing_columns() {
        let body = json!({"history": {"columns": ["OPEN"], "data": []}});
        assert!(matches!(
            parse_history_page(&body),
            Err(BacktestError::Http(_))
        ));
    }

    #[test]
    fn test_parse_universe() {
        let body = json!({
            "analytics": {
                "columns": ["indexid", "secids", "weight"],
                "data": [
                    ["IMOEX", "SBER", 15.2],
                    ["IMOEX", "GAZP", 10.1],
                    ["IMOEX", "SBER", 15.2],
                    ["IMOEX", "", 0.0]
                ]
            }
        });
        let tickers = parse_universe(&body).unwrap();
        assert_eq!(tickers, vec!["GAZP".to_string(), "SBER".to_string()]);
    }
}
