//! Operating-point F1.

use crate::metrics::precision_recall::PrecisionRecall;

/// Harmonic mean of precision and recall, `2PR / (P + R)`.
///
/// Returns `0.0` when `P + R` is zero, so a class with no detections and no
/// ground truth scores nothing instead of NaN.
///
/// ```
/// use det_eval::metrics::f1_score::calculate_f1_score;
///
/// assert!((calculate_f1_score(0.8, 0.6) - 0.96 / 1.4).abs() < 1e-12);
/// assert_eq!(calculate_f1_score(0.0, 0.0), 0.0);
/// ```
pub fn calculate_f1_score(precision: f64, recall: f64) -> f64 {
    let denominator = precision + recall;
    if denominator <= 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / denominator
}

/// F1 of a class at its operating point, i.e. over every detection it returned.
pub fn calculate_f1_from_pr(pr: &PrecisionRecall) -> f64 {
    calculate_f1_score(pr.precision, pr.recall)
}
