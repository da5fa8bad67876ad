//! Performance statistics over realized return and equity series
//!
//! All statistics drop undefined (NaN) entries before computing, so the
//! warm-up prefix of a backtest never errors or skews a number.

use serde::Serialize;
use std::fmt;

/// The five summary metrics, serialized under their display names.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SummaryStats {
    #[serde(rename = "CAGR")]
    pub cagr: f64,
    #[serde(rename = "Sharpe")]
    pub sharpe: f64,
    #[serde(rename = "MaxDD")]
    pub max_dd: f64,
    #[serde(rename = "Vol(ann.)")]
    pub vol_ann: f64,
    #[serde(rename = "Mean(ann.)")]
    pub mean_ann: f64,
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:10}: {:.4}", "CAGR", self.cagr)?;
        writeln!(f, "{:10}: {:.4}", "Sharpe", self.sharpe)?;
        writeln!(f, "{:10}: {:.4}", "MaxDD", self.max_dd)?;
        writeln!(f, "{:10}: {:.4}", "Vol(ann.)", self.vol_ann)?;
        write!(f, "{:10}: {:.4}", "Mean(ann.)", self.mean_ann)
    }
}

/// Compute the summary statistics for a realized net return and equity pair.
///
/// `periods_per_year` is 365 for a market trading every calendar day
/// (crypto), 252 for business-day markets (equities).
pub fn summary_stats(net_ret: &[f64], equity: &[f64], periods_per_year: usize) -> SummaryStats {
    let r: Vec<f64> = net_ret.iter().copied().filter(|v| v.is_finite()).collect();
    let ppy = periods_per_year as f64;

    let sd = stdev(&r);
    let mean = if r.is_empty() {
        f64::NAN
    } else {
        r.iter().sum::<f64>() / r.len() as f64
    };

    // The two-pass variance of a constant series rounds to a denormal, not
    // an exact zero, so the zero-volatility check needs a floor at rounding
    // noise scale relative to the mean.
    let sd_floor = f64::EPSILON.sqrt() * mean.abs().max(f64::EPSILON);
    let sharpe = if r.len() < 2 || !sd.is_finite() || sd <= sd_floor {
        f64::NAN
    } else {
        mean / sd * ppy.sqrt()
    };

    SummaryStats {
        cagr: cagr(equity, ppy),
        sharpe,
        max_dd: max_drawdown(equity),
        vol_ann: sd * ppy.sqrt(),
        mean_ann: mean * ppy,
    }
}

/// Annualized compound growth rate of the equity curve.
fn cagr(equity: &[f64], periods_per_year: f64) -> f64 {
    let e: Vec<f64> = equity.iter().copied().filter(|v| v.is_finite()).collect();
    if e.len() < 2 {
        return f64::NAN;
    }
    let years = (e.len() - 1) as f64 / periods_per_year;
    if years <= 0.0 {
        return f64::NAN;
    }
    (e[e.len() - 1] / e[0]).powf(1.0 / years) - 1.0
}

/// Worst peak-to-trough ratio of the equity curve, as a non-positive number.
fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak: Option<f64> = None;
    let mut worst = f64::NAN;

    for &v in equity {
        if !v.is_finite() {
            continue;
        }
        let p = peak.map_or(v, |p| p.max(v));
        peak = Some(p);
        let dd = v / p - 1.0;
        if worst.is_nan() || dd < worst {
            worst = dd;
        }
    }
    worst
}

/// Sample standard deviation (ddof = 1); NaN for fewer than 2 points.
fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}
