//! Error taxonomy for the backtest core and data fetchers

use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the backtest core.
///
/// Every validation failure aborts the whole run before the simulation walk
/// starts; there is no partial-result contract.
#[derive(Debug, Error)]
pub enum BacktestError {
    /// A non-positive or otherwise nonsensical parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Price panel has no rows or no instruments.
    #[error("empty price panel")]
    EmptyPanel,

    /// Not enough history for a single rebalance date (lookback >= rows).
    #[error("insufficient history: {rows} rows for lookback {lookback}")]
    InsufficientHistory { rows: usize, lookback: usize },

    /// A rebalance date whose score cross-section is entirely missing.
    #[error("no scored instruments on rebalance date {0}")]
    DegenerateCrossSection(NaiveDate),

    /// Panel construction with mismatched or duplicated dimensions.
    #[error("panel shape error: {0}")]
    PanelShape(String),

    /// Upstream data fetch failure (Binance/MOEX collaborators).
    #[error("data fetch failed: {0}")]
    Http(String),
}

impl BacktestError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        BacktestError::InvalidParameter(msg.into())
    }
}

impl From<reqwest::Error> for BacktestError {
    fn from(e: reqwest::Error) -> Self {
        BacktestError::Http(e.to_string())
    }
}
