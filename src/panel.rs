//! Dense date × instrument panel
//!
//! All derived series in the engine (returns, scores, weights) share this
//! shape: rows are trading dates, columns are instrument identifiers, cells
//! are `f64` with `NaN` as the missing-value marker. Rows are stored
//! row-major over a static instrument universe, so a cross-section is a
//! contiguous slice and weight materialization never re-aligns columns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::BacktestError;

/// A time-ordered table: rows = dates, columns = instruments, NaN = missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    dates: Vec<NaiveDate>,
    instruments: Vec<String>,
    /// Row-major values, `dates.len() * instruments.len()` cells.
    #[serde(with = "nan_as_null")]
    values: Vec<f64>,
}

impl Panel {
    /// Build a panel from raw parts, validating the shape.
    ///
    /// Dates and instruments must be unique; chronological ordering is not
    /// required here (callers use [`Panel::sort_by_date`]).
    pub fn new(
        dates: Vec<NaiveDate>,
        instruments: Vec<String>,
        values: Vec<f64>,
    ) -> Result<Panel, BacktestError> {
        if values.len() != dates.len() * instruments.len() {
            return Err(BacktestError::PanelShape(format!(
                "{} values for {} dates x {} instruments",
                values.len(),
                dates.len(),
                instruments.len()
            )));
        }

        let mut seen_dates = dates.clone();
        seen_dates.sort();
        if seen_dates.windows(2).any(|w| w[0] == w[1]) {
            return Err(BacktestError::PanelShape("duplicate dates".to_string()));
        }

        let mut seen_ids: Vec<&String> = instruments.iter().collect();
        seen_ids.sort();
        if seen_ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(BacktestError::PanelShape(
                "duplicate instrument identifiers".to_string(),
            ));
        }

        Ok(Panel {
            dates,
            instruments,
            values,
        })
    }

    /// Build a wide panel from per-instrument date -> value series.
    ///
    /// Rows span the union of all dates; instruments missing a date get NaN.
    pub fn from_series(
        series: Vec<(String, BTreeMap<NaiveDate, f64>)>,
    ) -> Result<Panel, BacktestError> {
        let mut all_dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|(_, s)| s.keys().copied())
            .collect();
        all_dates.sort();
        all_dates.dedup();

        let instruments: Vec<String> = series.iter().map(|(id, _)| id.clone()).collect();
        let mut values = vec![f64::NAN; all_dates.len() * instruments.len()];

        for (col, (_, s)) in series.iter().enumerate() {
            for (row, date) in all_dates.iter().enumerate() {
                if let Some(&v) = s.get(date) {
                    values[row * instruments.len() + col] = v;
                }
            }
        }

        Panel::new(all_dates, instruments, values)
    }

    /// An empty-shape panel sharing this panel's dates and instruments,
    /// filled with NaN.
    pub fn nan_like(&self) -> Panel {
        Panel {
            dates: self.dates.clone(),
            instruments: self.instruments.clone(),
            values: vec![f64::NAN; self.values.len()],
        }
    }

    /// Reorder rows chronologically. A no-op on already-sorted panels.
    pub fn sort_by_date(&mut self) {
        if self.dates.windows(2).all(|w| w[0] < w[1]) {
            return;
        }

        let n_inst = self.instruments.len();
        let mut order: Vec<usize> = (0..self.dates.len()).collect();
        order.sort_by_key(|&i| self.dates[i]);

        let mut dates = Vec::with_capacity(self.dates.len());
        let mut values = Vec::with_capacity(self.values.len());
        for &i in &order {
            dates.push(self.dates[i]);
            values.extend_from_slice(&self.values[i * n_inst..(i + 1) * n_inst]);
        }
        self.dates = dates;
        self.values = values;
    }

    /// Simple change over `periods` rows: `v[t] / v[t-periods] - 1`.
    ///
    /// The first `periods` rows of the result are NaN, as is any cell whose
    /// current or offset value is missing or whose offset value is zero.
    pub fn pct_change(&self, periods: usize) -> Panel {
        let n_inst = self.instruments.len();
        let mut out = self.nan_like();

        for t in periods..self.dates.len() {
            for i in 0..n_inst {
                let cur = self.values[t * n_inst + i];
                let prev = self.values[(t - periods) * n_inst + i];
                if cur.is_finite() && prev.is_finite() && prev != 0.0 {
                    out.values[t * n_inst + i] = cur / prev - 1.0;
                }
            }
        }
        out
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn num_instruments(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.instruments.is_empty()
    }

    /// One date's cross-section as a contiguous slice.
    pub fn row(&self, t: usize) -> &[f64] {
        let n = self.instruments.len();
        &self.values[t * n..(t + 1) * n]
    }

    pub fn get(&self, t: usize, i: usize) -> f64 {
        self.values[t * self.instruments.len() + i]
    }

    pub(crate) fn set_row(&mut self, t: usize, row: &[f64]) {
        let n = self.instruments.len();
        self.values[t * n..(t + 1) * n].copy_from_slice(row);
    }

    pub(crate) fn zero_like(&self) -> Panel {
        Panel {
            dates: self.dates.clone(),
            instruments: self.instruments.clone(),
            values: vec![0.0; self.values.len()],
        }
    }
}

/// NaN cells cross the JSON boundary as nulls.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], ser: S) -> Result<S::Ok, S::Error> {
        let opts: Vec<Option<f64>> = values
            .iter()
            .map(|&v| if v.is_finite() { Some(v) } else { None })
            .collect();
        opts.serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<f64>, D::Error> {
        let opts = Vec::<Option<f64>>::deserialize(de)?;
        Ok(opts.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample_panel() -> Panel {
        Panel::new(
            vec![date("2024-01-01"), date("2024-01-02"), date("2024-01-03")],
            vec!["A".to_string(), "B".to_string()],
            vec![100.0, 50.0, 110.0, 50.0, 121.0, f64::NAN],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = Panel::new(
            vec![date("2024-01-01")],
            vec!["A".to_string(), "B".to_string()],
            vec![1.0],
        );
        assert!(matches!(err, Err(BacktestError::PanelShape(_))));
    }

    #[test]
    fn test_duplicate_instruments_rejected() {
        let err = Panel::new(
            vec![date("2024-01-01")],
            vec!["A".to_string(), "A".to_string()],
            vec![1.0, 2.0],
        );
        assert!(matches!(err, Err(BacktestError::PanelShape(_))));
    }

    #[test]
    fn test_sort_by_date_reorders_rows() {
        let mut p = Panel::new(
            vec![date("2024-01-03"), date("2024-01-01"), date("2024-01-02")],
            vec!["A".to_string()],
            vec![3.0, 1.0, 2.0],
        )
        .unwrap();
        p.sort_by_date();
        assert_eq!(p.dates()[0], date("2024-01-01"));
        assert_eq!(p.row(0), &[1.0]);
        assert_eq!(p.row(2), &[3.0]);
    }

    #[test]
    fn test_pct_change() {
        let p = sample_panel();
        let r = p.pct_change(1);
        assert!(r.get(0, 0).is_nan());
        assert!((r.get(1, 0) - 0.1).abs() < 1e-12);
        assert!((r.get(2, 0) - 0.1).abs() < 1e-12);
        assert!((r.get(1, 1) - 0.0).abs() < 1e-12);
        // NaN price propagates as NaN return
        assert!(r.get(2, 1).is_nan());
    }

    #[test]
    fn test_from_series_aligns_union_of_dates() {
        let mut a = BTreeMap::new();
        a.insert(date("2024-01-01"), 1.0);
        a.insert(date("2024-01-02"), 2.0);
        let mut b = BTreeMap::new();
        b.insert(date("2024-01-02"), 20.0);
        b.insert(date("2024-01-03"), 30.0);

        let p = Panel::from_series(vec![("A".to_string(), a), ("B".to_string(), b)]).unwrap();
        assert_eq!(p.num_rows(), 3);
        assert!(p.get(0, 1).is_nan());
        assert_eq!(p.get(1, 0), 2.0);
        assert_eq!(p.get(1, 1), 20.0);
        assert!(p.get(2, 0).is_nan());
    }

    #[test]
    fn test_json_round_trip_keeps_nan_as_null() {
        let p = sample_panel();
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("null"));
        let back: Panel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.num_rows(), 3);
        assert!(back.get(2, 1).is_nan());
        assert_eq!(back.get(2, 0), 121.0);
    }
}
