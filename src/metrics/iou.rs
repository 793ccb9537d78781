//! Box overlap.

use crate::types::BoundingBox;

/// Intersection over union of two `x1,y1,x2,y2` boxes.
///
/// Symmetric, `1.0` for identical boxes with positive area and `0.0` for
/// disjoint or edge-touching boxes. A box without area never overlaps
/// anything, so any pair whose union is empty or non-finite scores `0.0`.
///
/// # Example
///
/// ```
/// use det_eval::metrics::iou::calculate_iou;
/// use det_eval::types::BoundingBox;
///
/// let gt = BoundingBox::new(0.0, 0.0, 100.0, 10.0);
/// let det = BoundingBox::new(0.0, 0.0, 90.0, 10.0);
/// assert!((calculate_iou(&gt, &det) - 0.9).abs() < 1e-12);
/// ```
pub fn calculate_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let overlap_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let overlap_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = overlap_w * overlap_h;
    if intersection <= 0.0 {
        return 0.0;
    }

    let union = a.area() + b.area() - intersection;
    if !union.is_finite() || union <= 0.0 {
        return 0.0;
    }

    (intersection / union).min(1.0)
}

/// Pairwise IoU; `result[i][j]` compares `rows[i]` with `cols[j]`.
///
/// The matcher calls this with ground truth as rows and detections as
/// columns, which is the order candidate pairs are generated in.
pub fn calculate_iou_matrix(rows: &[BoundingBox], cols: &[BoundingBox]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| cols.iter().map(|col| calculate_iou(row, col)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: f64, y1: f64, x2: f64, y2: f64) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    #[test]
    fn test_identical_and_disjoint() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        assert!((calculate_iou(&a, &a) - 1.0).abs() < 1e-12);
        assert_eq!(calculate_iou(&a, &bbox(20.0, 20.0, 30.0, 30.0)), 0.0);
        // Shared edge only
        assert_eq!(calculate_iou(&a, &bbox(10.0, 0.0, 20.0, 10.0)), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(5.0, 5.0, 15.0, 15.0);
        // 25 / (100 + 100 - 25)
        assert!((calculate_iou(&a, &b) - 25.0 / 175.0).abs() < 1e-12);
        assert_eq!(calculate_iou(&a, &b), calculate_iou(&b, &a));
    }

    #[test]
    fn test_contained_box() {
        let outer = bbox(0.0, 0.0, 10.0, 10.0);
        let half = bbox(0.0, 0.0, 5.0, 10.0);
        assert!((calculate_iou(&outer, &half) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_area() {
        let point = bbox(5.0, 5.0, 5.0, 5.0);
        assert_eq!(calculate_iou(&point, &point), 0.0);

        let line = bbox(0.0, 5.0, 10.0, 5.0);
        assert_eq!(calculate_iou(&line, &bbox(0.0, 0.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_non_finite() {
        let huge = bbox(0.0, 0.0, f64::INFINITY, 10.0);
        assert_eq!(calculate_iou(&huge, &bbox(0.0, 0.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_matrix_orientation() {
        let gts = vec![bbox(0.0, 0.0, 100.0, 10.0), bbox(30.0, 0.0, 115.0, 10.0)];
        let dets = vec![bbox(0.0, 0.0, 90.0, 10.0)];

        let matrix = calculate_iou_matrix(&gts, &dets);
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0].len(), 1);
        assert!((matrix[0][0] - 0.9).abs() < 1e-12);
        // 60 / (850 + 900 - 600)
        assert!((matrix[1][0] - 600.0 / 1150.0).abs() < 1e-12);
        assert!(calculate_iou_matrix(&[], &dets).is_empty());
    }
}
