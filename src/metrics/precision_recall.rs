//! Precision, recall and the ranked precision-recall curve.

use serde::{Deserialize, Serialize};

/// Counts and ratios at one operating point.
#[derive(Debug, Clone)]
pub struct PrecisionRecall {
    pub precision: f64,
    pub recall: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// One rank of a precision-recall curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecisionRecallPoint {
    pub precision: f64,
    pub recall: f64,
    /// Confidence of the detection at this rank
    pub confidence: f64,
}

/// Precision `TP / (TP + FP)` and recall `TP / (TP + FN)`, each 0 when its
/// denominator is 0.
///
/// ```
/// use det_eval::metrics::precision_recall::calculate_precision_recall;
///
/// let pr = calculate_precision_recall(8, 2, 3);
/// assert_eq!(pr.precision, 0.8);
/// assert!((pr.recall - 8.0 / 11.0).abs() < 1e-12);
/// ```
pub fn calculate_precision_recall(
    true_positives: usize,
    false_positives: usize,
    false_negatives: usize,
) -> PrecisionRecall {
    PrecisionRecall {
        precision: ratio(true_positives, true_positives + false_positives),
        recall: ratio(true_positives, true_positives + false_negatives),
        true_positives,
        false_positives,
        false_negatives,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Cumulative precision and recall after each rank.
///
/// `ranked` holds `(confidence, is_true_positive)` pairs already sorted by
/// confidence descending. Recall stays 0 when there is no ground truth.
pub fn calculate_precision_recall_curve(
    ranked: &[(f64, bool)],
    num_ground_truth: usize,
) -> Vec<PrecisionRecallPoint> {
    let mut tp = 0;
    ranked
        .iter()
        .enumerate()
        .map(|(rank, &(confidence, is_tp))| {
            if is_tp {
                tp += 1;
            }
            PrecisionRecallPoint {
                precision: ratio(tp, rank + 1),
                recall: ratio(tp, num_ground_truth),
                confidence,
            }
        })
        .collect()
}

/// Monotonic precision envelope.
///
/// Each value is replaced by the maximum precision at the same or a later
/// rank, which makes the envelope non-increasing as recall grows.
///
/// ```
/// use det_eval::metrics::precision_recall::precision_envelope;
///
/// let envelope = precision_envelope(&[1.0, 0.5, 0.67, 0.5]);
/// assert_eq!(envelope, vec![1.0, 0.67, 0.67, 0.5]);
/// ```
pub fn precision_envelope(precision: &[f64]) -> Vec<f64> {
    let mut envelope = precision.to_vec();
    for i in (0..envelope.len().saturating_sub(1)).rev() {
        envelope[i] = envelope[i].max(envelope[i + 1]);
    }
    envelope
}

/// Sample the precision envelope at the 101 recall levels.
///
/// The value at a level is the best precision reached at that recall or any
/// higher one, and 0 once the level lies beyond the last recall of the curve.
/// `recall` must be non-decreasing, which holds for any ranked curve.
pub fn interpolate_precision(precision: &[f64], recall: &[f64]) -> Vec<f64> {
    let len = precision.len().min(recall.len());
    let envelope = precision_envelope(&precision[..len]);
    let recall = &recall[..len];

    recall_levels()
        .into_iter()
        .map(|level| {
            let first = recall.partition_point(|&r| r < level);
            envelope.get(first).copied().unwrap_or(0.0)
        })
        .collect()
}

/// The 101 recall levels 0.0, 0.01, ..., 1.0.
pub fn recall_levels() -> Vec<f64> {
    (0..=100).map(|i| i as f64 / 100.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_precision_recall() {
        let pr = calculate_precision_recall(10, 0, 0);
        assert_eq!(pr.precision, 1.0);
        assert_eq!(pr.recall, 1.0);
    }

    #[test]
    fn test_zero_precision() {
        let pr = calculate_precision_recall(0, 10, 5);
        assert_eq!(pr.precision, 0.0);
        assert_eq!(pr.recall, 0.0);
    }

    #[test]
    fn test_zero_denominators() {
        let pr = calculate_precision_recall(0, 0, 0);
        assert_eq!(pr.precision, 0.0);
        assert_eq!(pr.recall, 0.0);
    }

    #[test]
    fn test_precision_recall_values() {
        let pr = calculate_precision_recall(8, 2, 3);
        assert!((pr.precision - 0.8).abs() < 1e-10);
        assert!((pr.recall - 8.0 / 11.0).abs() < 1e-10);
    }

    #[test]
    fn test_precision_recall_curve() {
        let ranked = vec![(0.9, true), (0.8, true), (0.7, false), (0.6, true), (0.5, false)];
        let curve = calculate_precision_recall_curve(&ranked, 4);
        assert_eq!(curve.len(), 5);

        assert!((curve[0].precision - 1.0).abs() < 1e-10);
        assert!((curve[0].recall - 0.25).abs() < 1e-10);
        assert!((curve[2].precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((curve[4].recall - 0.75).abs() < 1e-10);
        assert_eq!(curve[3].confidence, 0.6);
    }

    #[test]
    fn test_curve_without_ground_truth() {
        let curve = calculate_precision_recall_curve(&[(0.9, false), (0.4, false)], 0);
        assert!(curve.iter().all(|p| p.recall == 0.0 && p.precision == 0.0));
    }

    #[test]
    fn test_envelope_removes_precision_dip() {
        // TP, FP, TP: precision dips to 0.5 then recovers to 0.667
        let curve = calculate_precision_recall_curve(&[(0.9, true), (0.8, false), (0.7, true)], 2);
        let precision: Vec<f64> = curve.iter().map(|p| p.precision).collect();
        assert!(precision[1] < precision[2]);

        let envelope = precision_envelope(&precision);
        assert!(envelope.windows(2).all(|w| w[0] >= w[1]));
        assert!((envelope[1] - 2.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_envelope_empty() {
        assert!(precision_envelope(&[]).is_empty());
    }

    #[test]
    fn test_interpolate_precision() {
        let precision = vec![1.0, 1.0, 0.67, 0.75, 0.6];
        let recall = vec![0.25, 0.5, 0.5, 0.75, 0.75];

        let interpolated = interpolate_precision(&precision, &recall);
        assert_eq!(interpolated.len(), 101);
        assert_eq!(interpolated[0], 1.0);
        assert_eq!(interpolated[60], 0.75);
        assert_eq!(interpolated[100], 0.0);
        assert!(interpolated.windows(2).all(|w| w[0] >= w[1]));
    }
}
