//! Box eligibility, threshold validation and the IoU sweep.

use crate::error::{DetEvalError, Result};
use crate::types::BoundingBox;

/// Decide whether a box takes part in scoring.
///
/// A box is eligible iff `max(w/h, h/w) <= whr_thres` and `min(w, h) >= px_thres`.
/// Boxes with a zero side have an unbounded ratio and are never eligible.
/// The same predicate is applied to ground truth and detections.
///
/// # Example
///
/// ```
/// use det_eval::threshold::aspect_ratio_filter;
/// use det_eval::types::BoundingBox;
///
/// // 2 x 20 sliver: ratio 10 exceeds 3
/// let sliver = BoundingBox::new(0.0, 0.0, 2.0, 20.0);
/// assert!(!aspect_ratio_filter(&sliver, 3.0, 0.0));
///
/// let square = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
/// assert!(aspect_ratio_filter(&square, 3.0, 6.0));
/// ```
pub fn aspect_ratio_filter(bbox: &BoundingBox, whr_thres: f64, px_thres: f64) -> bool {
    if !bbox.is_valid() {
        return false;
    }

    let w = bbox.width();
    let h = bbox.height();
    if w <= 0.0 || h <= 0.0 {
        return false;
    }

    let whr = (w / h).max(h / w);
    whr <= whr_thres && w.min(h) >= px_thres
}

/// The COCO IoU sweep 0.50:0.05:0.95.
pub fn coco_iou_thresholds() -> Vec<f64> {
    (0..10).map(|i| 0.5 + 0.05 * i as f64).collect()
}

/// Validate that a threshold is in the valid range [0.0, 1.0].
pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(DetEvalError::InvalidThreshold(format!(
            "Threshold must be between 0.0 and 1.0, got {}",
            threshold
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_filter() {
        let sliver = BoundingBox::new(0.0, 0.0, 2.0, 20.0);
        assert!(!aspect_ratio_filter(&sliver, 3.0, 0.0));

        let wide = BoundingBox::new(0.0, 0.0, 40.0, 10.0);
        assert!(aspect_ratio_filter(&wide, 4.0, 6.0));
        assert!(!aspect_ratio_filter(&wide, 3.9, 6.0));
    }

    #[test]
    fn test_px_threshold() {
        let small = BoundingBox::new(0.0, 0.0, 5.0, 5.0);
        assert!(!aspect_ratio_filter(&small, 4.0, 6.0));
        assert!(aspect_ratio_filter(&small, 4.0, 5.0));
    }

    #[test]
    fn test_degenerate_never_eligible() {
        let flat = BoundingBox::new(0.0, 0.0, 10.0, 0.0);
        assert!(!aspect_ratio_filter(&flat, f64::INFINITY, 0.0));

        let inverted = BoundingBox::new(10.0, 0.0, 0.0, 10.0);
        assert!(!aspect_ratio_filter(&inverted, f64::INFINITY, 0.0));
    }

    #[test]
    fn test_coco_iou_thresholds() {
        let thresholds = coco_iou_thresholds();
        assert_eq!(thresholds.len(), 10);
        assert!((thresholds[0] - 0.5).abs() < 1e-10);
        assert!((thresholds[9] - 0.95).abs() < 1e-10);
    }
}
