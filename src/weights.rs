//! Long/short weight construction from one date's score cross-section

use crate::error::BacktestError;

/// Build market-neutral long/short weights from a dense score cross-section.
///
/// - Long the `top_n` highest-scoring instruments equally, short the
///   `bottom_n` lowest equally; NaN scores drop out with weight 0.
/// - If fewer instruments are scored than requested, the sleeves shrink:
///   `top_n` caps at the scored count `m`, then `bottom_n` caps at what is
///   left (`m - top_n`, zero if nothing remains). The sleeves never overlap.
/// - The result is scaled so `sum(|w|)` equals `gross_exposure` exactly
///   (2.0 = classic 100% long + 100% short), unless the cross-section is
///   empty, in which case all weights are zero.
///
/// Ties at a sleeve boundary resolve by column order (stable sort on score
/// only); any other tie-break convention would be equally arbitrary, so this
/// one is fixed and tested rather than guessed at.
///
/// Input and output are both aligned to the full instrument universe.
pub fn build_long_short_weights(
    scores: &[f64],
    top_n: usize,
    bottom_n: usize,
    gross_exposure: f64,
) -> Result<Vec<f64>, BacktestError> {
    if top_n == 0 || bottom_n == 0 {
        return Err(BacktestError::invalid_parameter(
            "top_n and bottom_n must be positive",
        ));
    }
    if gross_exposure <= 0.0 {
        return Err(BacktestError::invalid_parameter(
            "gross_exposure must be positive",
        ));
    }

    let mut scored: Vec<usize> = (0..scores.len())
        .filter(|&i| scores[i].is_finite())
        .collect();
    let m = scored.len();

    let mut weights = vec![0.0; scores.len()];
    if m == 0 {
        return Ok(weights);
    }

    // Shrink policy: cap the long sleeve first, shorts take what remains.
    let top_n = top_n.min(m);
    let bottom_n = if m > top_n { bottom_n.min(m - top_n) } else { 0 };

    // Stable sort, descending score: ties keep column order.
    scored.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for &i in &scored[..top_n] {
        weights[i] = 1.0 / top_n as f64;
    }
    if bottom_n > 0 {
        for &i in &scored[m - bottom_n..] {
            weights[i] = -1.0 / bottom_n as f64;
        }
    }

    let gross: f64 = weights.iter().map(|w| w.abs()).sum();
    if gross > 0.0 {
        let scale = gross_exposure / gross;
        for w in &mut weights {
            *w *= scale;
        }
    }

    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gross(w: &[f64]) -> f64 {
        w.iter().map(|x| x.abs()).sum()
    }

    #[test]
    fn test_balanced_long_short() {
        let scores = vec![0.3, -0.1, 0.2, -0.3, 0.0];
        let w = build_long_short_weights(&scores, 2, 2, 2.0).unwrap();
        // Longs: indices 0 and 2; shorts: indices 3 and 1.
        assert!(w[0] > 0.0 && w[2] > 0.0);
        assert!(w[1] < 0.0 && w[3] < 0.0);
        assert_relative_eq!(w[4], 0.0);
        assert_relative_eq!(gross(&w), 2.0, epsilon = 1e-12);
        assert_relative_eq!(w[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(w[3], -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_counts_rejected() {
        let scores = vec![0.1, 0.2];
        assert!(matches!(
            build_long_short_weights(&scores, 0, 1, 2.0),
            Err(BacktestError::InvalidParameter(_))
        ));
        assert!(matches!(
            build_long_short_weights(&scores, 1, 0, 2.0),
            Err(BacktestError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_non_positive_gross_rejected() {
        let scores = vec![0.1, 0.2];
        assert!(matches!(
            build_long_short_weights(&scores, 1, 1, 0.0),
            Err(BacktestError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_nan_scores_get_zero_weight() {
        let scores = vec![0.3, f64::NAN, -0.2];
        let w = build_long_short_weights(&scores, 1, 1, 2.0).unwrap();
        assert_relative_eq!(w[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[1], 0.0);
        assert_relative_eq!(w[2], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_cross_section_is_all_zero() {
        let scores = vec![f64::NAN, f64::NAN];
        let w = build_long_short_weights(&scores, 2, 2, 2.0).unwrap();
        assert!(w.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_shrink_with_six_instruments() {
        // top_n=5, bottom_n=5 against 6 scored instruments shrinks to 5/1.
        let scores = vec![0.6, 0.5, 0.4, 0.3, 0.2, 0.1];
        let w = build_long_short_weights(&scores, 5, 5, 2.0).unwrap();
        let longs = w.iter().filter(|&&x| x > 0.0).count();
        let shorts = w.iter().filter(|&&x| x < 0.0).count();
        assert_eq!(longs, 5);
        assert_eq!(shorts, 1);
        assert!(w[5] < 0.0);
        assert_relative_eq!(gross(&w), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_instrument_is_long_only() {
        let scores = vec![f64::NAN, 0.2, f64::NAN];
        let w = build_long_short_weights(&scores, 3, 3, 2.0).unwrap();
        // m = 1: the long sleeve takes it, the short sleeve shrinks to zero,
        // and normalization pushes the single weight to the full gross.
        assert_relative_eq!(w[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(gross(&w), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tie_break_is_column_order() {
        // Equal scores: the stable sort keeps column order, so the long
        // sleeve is the leftmost column and the short sleeve the rightmost.
        let scores = vec![0.1, 0.1, 0.1, 0.1];
        let w = build_long_short_weights(&scores, 1, 1, 2.0).unwrap();
        assert!(w[0] > 0.0);
        assert!(w[3] < 0.0);
        assert_relative_eq!(w[1], 0.0);
        assert_relative_eq!(w[2], 0.0);
    }

    #[test]
    fn test_custom_gross_exposure() {
        let scores = vec![0.3, -0.3];
        let w = build_long_short_weights(&scores, 1, 1, 1.0).unwrap();
        assert_relative_eq!(gross(&w), 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[0], 0.5, epsilon = 1e-12);
    }
}
