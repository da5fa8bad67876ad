//! # Momentum Backtest
//!
//! Cross-sectional momentum backtesting engine: score a universe of
//! instruments by trailing return, go long the leaders and short the
//! laggards on a periodic rebalance schedule, and simulate the strategy net
//! of turnover-driven transaction costs.
//!
//! ## Features
//! - Dense date x instrument price panels with NaN-tolerant semantics
//! - One-period execution lag (no look-ahead bias)
//! - Carry-forward weights between rebalances
//! - Summary statistics (CAGR, Sharpe, max drawdown, volatility)
//! - Binance / MOEX ISS price fetchers as upstream collaborators
//!
//! ## Example
//! ```
//! use momentum_backtest::{run_momentum_backtest, summary_stats, BacktestParams, Panel};
//! use chrono::NaiveDate;
//!
//! let dates: Vec<NaiveDate> = (0..90)
//!     .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i))
//!     .collect();
//! let values: Vec<f64> = (0..90)
//!     .flat_map(|t| vec![100.0 * 1.01f64.powi(t), 100.0 * 0.99f64.powi(t)])
//!     .collect();
//! let prices = Panel::new(dates, vec!["UP".into(), "DOWN".into()], values).unwrap();
//!
//! let params = BacktestParams { lookback: 20, top_n: 1, bottom_n: 1, ..Default::default() };
//! let result = run_momentum_backtest(&prices, &params).unwrap();
//! let stats = summary_stats(&result.net_ret, &result.equity, 365);
//! assert!(stats.cagr > 0.0);
//! ```

pub mod backtest;
pub mod data;
pub mod error;
pub mod metrics;
pub mod momentum;
pub mod panel;
pub mod weights;

// Re-export the core surface at the crate root
pub use backtest::{run_momentum_backtest, BacktestParams, BacktestResult};
pub use error::BacktestError;
pub use metrics::{summary_stats, SummaryStats};
pub use momentum::compute_momentum;
pub use panel::Panel;
pub use weights::build_long_short_weights;
