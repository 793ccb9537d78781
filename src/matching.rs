//! Detection matching utilities for evaluating predictions against ground truth.
//!
//! Matching is a two-pass greedy deduplication over all candidate pairs whose
//! IoU clears the threshold: detections are deduplicated first, then ground
//! truth. The order of the two passes is observable in the results whenever a
//! detection could match several ground-truth boxes at different IoUs.

use crate::config::MatchingMode;
use crate::metrics::iou::calculate_iou_matrix;
use crate::types::{BoundingBox, ClassId, Detection, GroundTruthBox, Match};
use std::collections::BTreeMap;

/// A surviving (ground truth, detection) pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPair {
    pub gt_index: usize,
    pub det_index: usize,
    pub iou: f64,
}

/// Stable sort by IoU, highest first.
fn sort_by_iou_desc(pairs: &mut [MatchPair]) {
    pairs.sort_by(|a, b| b.iou.total_cmp(&a.iou));
}

/// Pair detections with ground truth boxes.
///
/// 1. Every (ground truth, detection) pair with IoU >= `iou_threshold` is a
///    candidate, listed ground-truth-major.
/// 2. Candidates are sorted by IoU, highest first.
/// 3. Each detection keeps only its highest-IoU candidate.
/// 4. The survivors are sorted by IoU again.
/// 5. Each ground truth keeps only its highest-IoU remaining candidate.
///
/// Sorts are stable, so equal IoUs resolve by position. The result is
/// ordered by ground-truth index; no detection and no ground truth appears twice.
///
/// # Example
///
/// ```
/// use det_eval::matching::greedy_assign;
/// use det_eval::types::BoundingBox;
///
/// let dets = vec![BoundingBox::new(0.0, 0.0, 10.0, 10.0)];
/// let gts = vec![
///     BoundingBox::new(0.0, 0.0, 10.0, 10.0),
///     BoundingBox::new(1.0, 0.0, 11.0, 10.0),
/// ];
/// let pairs = greedy_assign(&dets, &gts, 0.5);
/// assert_eq!(pairs.len(), 1);
/// assert_eq!(pairs[0].gt_index, 0);
/// ```
pub fn greedy_assign(
    det_boxes: &[BoundingBox],
    gt_boxes: &[BoundingBox],
    iou_threshold: f64,
) -> Vec<MatchPair> {
    if det_boxes.is_empty() || gt_boxes.is_empty() {
        return Vec::new();
    }

    let ious = calculate_iou_matrix(gt_boxes, det_boxes);

    let mut candidates: Vec<MatchPair> = Vec::new();
    for (gt_index, row) in ious.iter().enumerate() {
        for (det_index, &iou) in row.iter().enumerate() {
            if iou >= iou_threshold {
                candidates.push(MatchPair {
                    gt_index,
                    det_index,
                    iou,
                });
            }
        }
    }

    if candidates.is_empty() {
        return Vec::new();
    }

    sort_by_iou_desc(&mut candidates);

    // Remove duplicate detections, keeping each one's highest-IoU entry
    let mut det_seen = vec![false; det_boxes.len()];
    let mut unique_dets: Vec<MatchPair> = candidates
        .into_iter()
        .filter(|pair| !std::mem::replace(&mut det_seen[pair.det_index], true))
        .collect();
    unique_dets.sort_by_key(|pair| pair.det_index);

    // Dedup leaves the list in detection order, so sort by IoU again
    sort_by_iou_desc(&mut unique_dets);

    // Remove duplicate ground truths
    let mut gt_seen = vec![false; gt_boxes.len()];
    let mut pairs: Vec<MatchPair> = unique_dets
        .into_iter()
        .filter(|pair| !std::mem::replace(&mut gt_seen[pair.gt_index], true))
        .collect();
    pairs.sort_by_key(|pair| pair.gt_index);

    pairs
}

/// Match detections to ground truth boxes of a single image.
///
/// Every box given here is assumed eligible; filtering happens upstream.
/// Detections are consumed by descending score (ties keep input order).
///
/// # Returns
///
/// One `Match` per detection (TP or FP, in score order) followed by one FN
/// per unmatched ground truth box (in input order).
pub fn match_detections(
    detections: &[Detection],
    ground_truths: &[GroundTruthBox],
    iou_threshold: f64,
) -> Vec<Match> {
    let detections: Vec<&Detection> = detections.iter().collect();
    let ground_truths: Vec<&GroundTruthBox> = ground_truths.iter().collect();
    match_refs(detections, &ground_truths, iou_threshold)
}

fn match_refs(
    mut detections: Vec<&Detection>,
    ground_truths: &[&GroundTruthBox],
    iou_threshold: f64,
) -> Vec<Match> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let det_boxes: Vec<BoundingBox> = detections.iter().map(|d| d.bbox).collect();
    let gt_boxes: Vec<BoundingBox> = ground_truths.iter().map(|g| g.bbox).collect();
    let pairs = greedy_assign(&det_boxes, &gt_boxes, iou_threshold);

    let mut det_match: Vec<Option<MatchPair>> = vec![None; detections.len()];
    let mut gt_matched = vec![false; ground_truths.len()];
    for pair in pairs {
        det_match[pair.det_index] = Some(pair);
        gt_matched[pair.gt_index] = true;
    }

    let mut matches = Vec::with_capacity(detections.len() + ground_truths.len());
    for (det, pair) in detections.iter().zip(&det_match) {
        matches.push(match pair {
            Some(pair) => Match::true_positive(det, ground_truths[pair.gt_index].class_id, pair.iou),
            None => Match::false_positive(det),
        });
    }
    for (gt, matched) in ground_truths.iter().zip(&gt_matched) {
        if !matched {
            matches.push(Match::false_negative(gt));
        }
    }

    matches
}

/// Match the eligible boxes of one image under the given mode.
///
/// In `PerClass` mode IoU is only computed within a class and the output is
/// grouped by class id. In `ClassAgnostic` mode all boxes compete together,
/// so a TP may pair a detection with ground truth of another class.
pub fn match_image(
    detections: &[Detection],
    ground_truths: &[GroundTruthBox],
    iou_threshold: f64,
    mode: MatchingMode,
) -> Vec<Match> {
    match mode {
        MatchingMode::ClassAgnostic => match_detections(detections, ground_truths, iou_threshold),
        MatchingMode::PerClass => {
            let mut by_class: BTreeMap<ClassId, (Vec<&Detection>, Vec<&GroundTruthBox>)> =
                BTreeMap::new();
            for det in detections {
                by_class.entry(det.class_id).or_default().0.push(det);
            }
            for gt in ground_truths {
                by_class.entry(gt.class_id).or_default().1.push(gt);
            }

            by_class
                .into_values()
                .flat_map(|(dets, gts)| match_refs(dets, &gts, iou_threshold))
                .collect()
        }
    }
}
