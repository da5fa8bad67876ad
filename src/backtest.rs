//! Momentum backtest simulation engine
//!
//! Drives the date-by-date walk: rebalance scheduling, carry-forward weight
//! materialization, turnover-driven cost accrual, lagged return attribution
//! and equity compounding. The simulation is deterministic and strictly
//! causal: each date's output depends only on data at or before that date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BacktestError;
use crate::momentum::compute_momentum;
use crate::panel::Panel;
use crate::weights::build_long_short_weights;

/// Strategy parameters. Every field has a default and is independently
/// settable, so partial JSON bodies deserialize against the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestParams {
    /// Momentum look-back window in trading periods.
    pub lookback: usize,
    /// Spacing between rebalance events in trading periods.
    pub rebalance_days: usize,
    /// Number of instruments in the long sleeve.
    pub top_n: usize,
    /// Number of instruments in the short sleeve.
    pub bottom_n: usize,
    /// Fraction of traded notional charged per unit of turnover.
    pub transaction_cost: f64,
    /// Target sum of absolute weights (2.0 = 100% long + 100% short).
    pub gross_exposure: f64,
}

impl Default for BacktestParams {
    fn default() -> Self {
        BacktestParams {
            lookback: 20,
            rebalance_days: 21,
            top_n: 5,
            bottom_n: 5,
            transaction_cost: 0.0005,
            gross_exposure: 2.0,
        }
    }
}

/// Immutable result bundle of one backtest run.
///
/// All series are aligned to `prices.dates()`; warm-up entries are NaN.
/// Produced once per run and consumed read-only.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub prices: Panel,
    pub returns: Panel,
    pub scores: Panel,
    pub weights: Panel,
    pub turnover: Vec<f64>,
    pub costs: Vec<f64>,
    pub gross_ret: Vec<f64>,
    pub net_ret: Vec<f64>,
    pub equity: Vec<f64>,
    /// Equal-weight daily-rebalanced buy-and-hold benchmark return.
    pub bh_ret: Vec<f64>,
    pub bh_equity: Vec<f64>,
    pub rebalance_dates: Vec<NaiveDate>,
}

fn validate_params(params: &BacktestParams) -> Result<(), BacktestError> {
    if params.lookback == 0 {
        return Err(BacktestError::invalid_parameter("lookback must be positive"));
    }
    if params.rebalance_days == 0 {
        return Err(BacktestError::invalid_parameter(
            "rebalance_days must be positive",
        ));
    }
    if params.top_n == 0 || params.bottom_n == 0 {
        return Err(BacktestError::invalid_parameter(
            "top_n and bottom_n must be positive",
        ));
    }
    if params.transaction_cost < 0.0 {
        return Err(BacktestError::invalid_parameter(
            "transaction_cost must be non-negative",
        ));
    }
    if params.gross_exposure <= 0.0 {
        return Err(BacktestError::invalid_parameter(
            "gross_exposure must be positive",
        ));
    }
    Ok(())
}

/// Run the full cross-sectional momentum backtest.
///
/// Signals are computed on day t's close and the resulting weights apply to
/// day t+1's return (one-period execution lag, the look-ahead-bias guard).
/// Transaction costs accrue from weight turnover, charged on the day the new
/// weight row appears. Between rebalances weights are held constant, not
/// re-derived from price drift.
///
/// Validation happens entirely before the walk: bad parameters, an empty
/// panel, insufficient history, or an all-missing score cross-section on any
/// rebalance date abort the run with no partial result.
pub fn run_momentum_backtest(
    prices: &Panel,
    params: &BacktestParams,
) -> Result<BacktestResult, BacktestError> {
    validate_params(params)?;

    if prices.is_empty() {
        return Err(BacktestError::EmptyPanel);
    }

    // Defensive: the caller may already have sorted.
    let mut prices = prices.clone();
    prices.sort_by_date();

    let n_rows = prices.num_rows();
    let n_inst = prices.num_instruments();

    if params.lookback >= n_rows {
        return Err(BacktestError::InsufficientHistory {
            rows: n_rows,
            lookback: params.lookback,
        });
    }

    let returns = prices.pct_change(1);
    let scores = compute_momentum(&prices, params.lookback)?;

    // Every rebalance_days-th row, starting at the first fully scored row.
    let rebalance: Vec<usize> = (params.lookback..n_rows)
        .step_by(params.rebalance_days)
        .collect();

    // Validate-then-run: a degenerate rebalance cross-section aborts the run
    // before any simulation state is built.
    for &t in &rebalance {
        if scores.row(t).iter().all(|v| !v.is_finite()) {
            return Err(BacktestError::DegenerateCrossSection(prices.dates()[t]));
        }
    }

    // Carry-forward weight walk over the static universe.
    let mut weights = prices.zero_like();
    let mut current = vec![0.0; n_inst];
    let mut next_rebalance = 0;

    for t in 0..n_rows {
        if next_rebalance < rebalance.len() && rebalance[next_rebalance] == t {
            current = build_long_short_weights(
                scores.row(t),
                params.top_n,
                params.bottom_n,
                params.gross_exposure,
            )?;
            next_rebalance += 1;
        }
        weights.set_row(t, &current);
    }

    // Turnover and costs, indexed to the day the new weight row appears.
    let mut turnover = vec![0.0; n_rows];
    for t in 1..n_rows {
        turnover[t] = weights
            .row(t)
            .iter()
            .zip(weights.row(t - 1))
            .map(|(w, p)| (w - p).abs())
            .sum();
    }
    let costs: Vec<f64> = turnover.iter().map(|t| t * params.transaction_cost).collect();

    // Gross return with execution lag: yesterday's weights times today's
    // returns. Missing returns contribute nothing (no position).
    let mut gross_ret = vec![f64::NAN; n_rows];
    for t in 1..n_rows {
        gross_ret[t] = weights
            .row(t - 1)
            .iter()
            .zip(returns.row(t))
            .filter(|(_, r)| r.is_finite())
            .map(|(w, r)| w * r)
            .sum();
    }

    let net_ret: Vec<f64> = gross_ret
        .iter()
        .zip(&costs)
        .map(|(g, c)| g - c)
        .collect();
    let equity = compound(&net_ret);

    // Equal-weight buy-and-hold baseline, outside the strategy's own
    // weight/turnover accounting.
    let bh_ret: Vec<f64> = (0..n_rows).map(|t| cross_mean(returns.row(t))).collect();
    let bh_equity = compound(&bh_ret);

    let rebalance_dates: Vec<NaiveDate> =
        rebalance.iter().map(|&t| prices.dates()[t]).collect();

    Ok(BacktestResult {
        returns,
        scores,
        weights,
        turnover,
        costs,
        gross_ret,
        net_ret,
        equity,
        bh_ret,
        bh_equity,
        rebalance_dates,
        prices,
    })
}

/// Cumulative product of (1 + r), compounding NaN entries as zero.
fn compound(returns: &[f64]) -> Vec<f64> {
    let mut equity = Vec::with_capacity(returns.len());
    let mut level = 1.0;
    for &r in returns {
        if r.is_finite() {
            level *= 1.0 + r;
        }
        equity.push(level);
    }
    equity
}

/// Cross-sectional mean over defined entries; NaN if none are defined.
fn cross_mean(row: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0;
    for &v in row {
        if v.is_finite() {
            sum += v;
            count += 1;
        }
    }
    if count > 0 {
        sum / count as f64
    } else {
        f64::NAN
    }
}
