//! Cross-sectional momentum scoring
//!
//! The score is the trailing total return over a fixed look-back window,
//! computed close-to-close per instrument. Higher = stronger momentum.

use crate::error::BacktestError;
use crate::panel::Panel;

/// Score every instrument by its `lookback`-period trailing return.
///
/// `scores[t][i] = prices[t][i] / prices[t-lookback][i] - 1`. The first
/// `lookback` rows are NaN for every column (insufficient history), as is
/// any cell with a missing price at either end of the window.
///
/// Pure function; assumes the caller already sorted the panel by date.
pub fn compute_momentum(prices: &Panel, lookback: usize) -> Result<Panel, BacktestError> {
    if lookback == 0 {
        return Err(BacktestError::invalid_parameter("lookback must be positive"));
    }

    Ok(prices.pct_change(lookback))
}
