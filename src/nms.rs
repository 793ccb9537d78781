//! Non-Maximum Suppression (`NMS`) over raw model candidates.
//!
//! Suppression is greedy and runs independently per class and per image.
//! Batches of images are processed in parallel with no cross-image interaction.

use crate::config::EvalConfig;
use crate::error::{DetEvalError, Result};
use crate::metrics::iou::calculate_iou;
use crate::stats::EvalStats;
use crate::threshold::validate_threshold;
use crate::types::{BoundingBox, ClassId, Detection, ImageId, RawImage};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Bounding box with a confidence score, the unit `NMS` works on.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBox {
    pub bbox: BoundingBox,
    /// Confidence score
    pub score: f64,
    /// Position in the input; breaks score ties
    pub index: usize,
}

/// Detections kept for one image, with the counters gathered on the way.
#[derive(Debug, Clone)]
pub struct ImageDetections {
    pub image_id: ImageId,
    pub detections: Vec<Detection>,
    pub stats: EvalStats,
}

/// Apply Non-Maximum Suppression to a set of same-class boxes
///
/// Boxes are visited by descending score; ties keep input order. Every box
/// whose `IoU` with an already kept box exceeds `iou_threshold` is dropped.
///
/// # Returns
///
/// Boolean mask indicating which boxes to keep
///
/// # Errors
///
/// Returns error if `iou_threshold` is not in range [0.0, 1.0]
///
/// # Examples
///
/// ```
/// # use det_eval::nms::{ScoredBox, non_maximum_suppression};
/// # use det_eval::types::BoundingBox;
/// let boxes = vec![
///     ScoredBox { bbox: BoundingBox::new(10.0, 10.0, 50.0, 50.0), score: 0.9, index: 0 },
///     ScoredBox { bbox: BoundingBox::new(15.0, 15.0, 55.0, 55.0), score: 0.8, index: 1 },
///     ScoredBox { bbox: BoundingBox::new(100.0, 100.0, 150.0, 150.0), score: 0.95, index: 2 },
/// ];
///
/// let keep_mask = non_maximum_suppression(&boxes, 0.5).unwrap();
/// assert_eq!(keep_mask, vec![true, false, true]);
/// ```
pub fn non_maximum_suppression(boxes: &[ScoredBox], iou_threshold: f64) -> Result<Vec<bool>> {
    if !(0.0..=1.0).contains(&iou_threshold) {
        return Err(DetEvalError::InvalidThreshold(format!(
            "IoU threshold must be between 0 and 1, got {iou_threshold}"
        )));
    }

    let n = boxes.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut keep_mask = vec![true; n];
    let order = score_order(boxes);

    for (i, &idx_i) in order.iter().enumerate() {
        if !keep_mask[idx_i] {
            continue;
        }

        // Suppress all lower-ranked boxes that overlap this one too much
        for &idx_j in &order[(i + 1)..] {
            if !keep_mask[idx_j] {
                continue;
            }

            if calculate_iou(&boxes[idx_i].bbox, &boxes[idx_j].bbox) > iou_threshold {
                keep_mask[idx_j] = false;
            }
        }
    }

    Ok(keep_mask)
}

/// Indices sorted by descending score, ties broken by `ScoredBox::index`.
fn score_order(boxes: &[ScoredBox]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| {
        boxes[b]
            .score
            .total_cmp(&boxes[a].score)
            .then(boxes[a].index.cmp(&boxes[b].index))
    });
    order
}

/// Reject an image size that cannot bound a box.
fn check_image_size(image: &RawImage) -> Result<()> {
    if let Some((width, height)) = image.image_size {
        let usable = |v: f64| v.is_finite() && v >= 0.0;
        if !usable(width) || !usable(height) {
            return Err(DetEvalError::InvalidAnnotation(format!(
                "image {} has invalid size {}x{}",
                image.image_id, width, height
            )));
        }
    }
    Ok(())
}

/// Run score filtering and per-class `NMS` for one image.
///
/// Output is ordered by class id, then by descending score. Candidates with
/// malformed boxes are dropped with a warning. When the image size is known,
/// kept boxes are clipped to the image.
///
/// # Errors
///
/// Returns an error if a candidate's score vector does not have exactly
/// `num_classes` entries or holds a score outside `[0, 1]` (NaN included),
/// if the image size is negative or non-finite, or if a threshold is out of
/// range.
pub fn suppress_image(image: &RawImage, config: &EvalConfig) -> Result<ImageDetections> {
    validate_threshold(config.score_threshold)?;
    check_image_size(image)?;

    let mut stats = EvalStats::new();
    let mut per_class: Vec<Vec<ScoredBox>> = vec![Vec::new(); config.num_classes];

    for (index, candidate) in image.candidates.iter().enumerate() {
        stats.add_candidate();

        if candidate.class_scores.len() != config.num_classes {
            return Err(DetEvalError::InvalidAnnotation(format!(
                "candidate {} of image {} has {} class scores, expected {}",
                index,
                image.image_id,
                candidate.class_scores.len(),
                config.num_classes
            )));
        }

        if let Some((class, score)) = candidate
            .class_scores
            .iter()
            .enumerate()
            .find(|(_, score)| !(0.0..=1.0).contains(*score))
        {
            return Err(DetEvalError::InvalidAnnotation(format!(
                "candidate {} of image {} has score {} for class {}, expected a value in [0, 1]",
                index, image.image_id, score, class
            )));
        }

        if !candidate.bbox.is_valid() {
            warn!(
                image_id = image.image_id.0,
                candidate = index,
                bbox = ?candidate.bbox,
                "dropping candidate with malformed box"
            );
            stats.skip_invalid_box();
            continue;
        }

        let labels: Vec<(ClassId, f64)> = if config.multi_label {
            candidate
                .class_scores
                .iter()
                .copied()
                .enumerate()
                .filter(|&(_, score)| score >= config.score_threshold)
                .map(|(class, score)| (ClassId(class), score))
                .collect()
        } else {
            candidate
                .best_class()
                .filter(|&(_, score)| score >= config.score_threshold)
                .into_iter()
                .collect()
        };

        if labels.is_empty() {
            stats.skip_below_score();
            continue;
        }

        for (class_id, score) in labels {
            per_class[class_id.index()].push(ScoredBox {
                bbox: candidate.bbox,
                score,
                index,
            });
        }
    }

    let mut detections = Vec::new();
    for (class, boxes) in per_class.iter().enumerate() {
        if boxes.is_empty() {
            continue;
        }

        let keep_mask = non_maximum_suppression(boxes, config.nms_iou_threshold)?;
        for idx in score_order(boxes) {
            if !keep_mask[idx] {
                stats.suppress();
                continue;
            }

            let bbox = match image.image_size {
                Some((width, height)) => boxes[idx].bbox.clip(width, height),
                None => boxes[idx].bbox,
            };
            detections.push(Detection::new(
                image.image_id,
                ClassId(class),
                bbox,
                boxes[idx].score,
            ));
        }
    }

    debug!(
        image_id = image.image_id.0,
        candidates = image.candidates.len(),
        kept = detections.len(),
        "non-max suppression finished"
    );

    Ok(ImageDetections {
        image_id: image.image_id,
        detections,
        stats,
    })
}

/// Run [`suppress_image`] for every image in parallel.
///
/// Results come back in input order.
pub fn batched_nms(images: &[RawImage], config: &EvalConfig) -> Result<Vec<ImageDetections>> {
    images
        .par_iter()
        .map(|image| suppress_image(image, config))
        .collect()
}
