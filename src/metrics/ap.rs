//! Average precision over a ranked curve, and its means.

use crate::metrics::precision_recall::{interpolate_precision, recall_levels};

/// AP of one class at one IoU threshold.
///
/// The precision envelope is sampled at recall `0, 0.01, ..., 1` and the
/// samples are integrated over recall with the trapezoid rule. An empty curve
/// (no detections) has AP 0.
///
/// ```
/// use det_eval::metrics::ap::calculate_ap;
///
/// // One detection, one of two objects found
/// let ap = calculate_ap(&[1.0], &[0.5]);
/// assert!((ap - 0.505).abs() < 1e-9);
/// ```
pub fn calculate_ap(precisions: &[f64], recalls: &[f64]) -> f64 {
    if precisions.is_empty() || recalls.is_empty() {
        return 0.0;
    }

    let sampled = interpolate_precision(precisions, recalls);
    trapezoid(&recall_levels(), &sampled).clamp(0.0, 1.0)
}

fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}

/// Arithmetic mean of per-class AP, 0 for no classes.
///
/// Classes without eligible ground truth must be left out by the caller.
pub fn calculate_map(class_aps: &[f64]) -> f64 {
    if class_aps.is_empty() {
        return 0.0;
    }
    class_aps.iter().sum::<f64>() / class_aps.len() as f64
}

/// Mean over an IoU sweep, e.g. mAP@0.5:0.95 from the ten COCO thresholds.
pub fn calculate_sweep_ap(ap_at_ious: &[f64]) -> f64 {
    calculate_map(ap_at_ious)
}
