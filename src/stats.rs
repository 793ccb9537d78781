//! Statistics tracking for an evaluation run
//!
//! Counts every box that was dropped, filtered or suppressed on its way from
//! raw candidates to matches, so nothing disappears silently from the metrics.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Counters collected during an evaluation run
///
/// Per-image counters are merged into a run total after the parallel stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalStats {
    /// Total number of raw candidates seen by NMS
    pub total_candidates: usize,

    /// Candidates or detections dropped because of malformed boxes
    pub skipped_invalid_boxes: usize,

    /// Candidates with no class score at or above the score threshold
    pub skipped_below_score: usize,

    /// Candidates removed by non-max suppression
    pub suppressed_by_nms: usize,

    /// Detections rejected by `aspect_ratio_filter`
    pub ineligible_detections: usize,

    /// Total ground-truth boxes received
    pub total_ground_truth: usize,

    /// Ground-truth boxes dropped because of malformed boxes
    pub skipped_invalid_ground_truth: usize,

    /// Ground-truth boxes rejected by `aspect_ratio_filter`
    pub ineligible_ground_truth: usize,

    /// Number of images evaluated
    pub processed_images: usize,

    /// Number of images with zero eligible detections
    pub empty_predictions: usize,
}

impl EvalStats {
    /// Create a new `EvalStats` with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_candidate(&mut self) {
        self.total_candidates += 1;
    }

    pub fn skip_invalid_box(&mut self) {
        self.skipped_invalid_boxes += 1;
    }

    pub fn skip_below_score(&mut self) {
        self.skipped_below_score += 1;
    }

    pub fn suppress(&mut self) {
        self.suppressed_by_nms += 1;
    }

    pub fn skip_ineligible_detection(&mut self) {
        self.ineligible_detections += 1;
    }

    pub fn add_ground_truth(&mut self) {
        self.total_ground_truth += 1;
    }

    pub fn skip_invalid_ground_truth(&mut self) {
        self.skipped_invalid_ground_truth += 1;
    }

    pub fn skip_ineligible_ground_truth(&mut self) {
        self.ineligible_ground_truth += 1;
    }

    /// Record one evaluated image and whether it had any eligible detection
    pub fn record_image(&mut self, has_detections: bool) {
        self.processed_images += 1;
        if !has_detections {
            self.empty_predictions += 1;
        }
    }

    /// Add another set of counters into this one
    pub fn merge(&mut self, other: &EvalStats) {
        self.total_candidates += other.total_candidates;
        self.skipped_invalid_boxes += other.skipped_invalid_boxes;
        self.skipped_below_score += other.skipped_below_score;
        self.suppressed_by_nms += other.suppressed_by_nms;
        self.ineligible_detections += other.ineligible_detections;
        self.total_ground_truth += other.total_ground_truth;
        self.skipped_invalid_ground_truth += other.skipped_invalid_ground_truth;
        self.ineligible_ground_truth += other.ineligible_ground_truth;
        self.processed_images += other.processed_images;
        self.empty_predictions += other.empty_predictions;
    }

    /// Ground-truth boxes that take part in scoring
    pub fn eligible_ground_truth(&self) -> usize {
        self.total_ground_truth
            .saturating_sub(self.skipped_invalid_ground_truth)
            .saturating_sub(self.ineligible_ground_truth)
    }

    /// Calculate the total number of dropped candidates and detections
    pub fn total_skipped(&self) -> usize {
        self.skipped_invalid_boxes
            + self.skipped_below_score
            + self.suppressed_by_nms
            + self.ineligible_detections
    }

    /// Emit the counters as a single `info` event
    pub fn log_summary(&self) {
        info!(
            total_candidates = self.total_candidates,
            skipped_invalid_boxes = self.skipped_invalid_boxes,
            skipped_below_score = self.skipped_below_score,
            suppressed_by_nms = self.suppressed_by_nms,
            ineligible_detections = self.ineligible_detections,
            total_ground_truth = self.total_ground_truth,
            eligible_ground_truth = self.eligible_ground_truth(),
            processed_images = self.processed_images,
            empty_predictions = self.empty_predictions,
            "evaluation statistics"
        );
    }
}

impl fmt::Display for EvalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} images, {} candidates ({} skipped), {} of {} ground truth eligible, {} images without detections",
            self.processed_images,
            self.total_candidates,
            self.total_skipped(),
            self.eligible_ground_truth(),
            self.total_ground_truth,
            self.empty_predictions
        )
    }
}
