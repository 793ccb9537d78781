//! Main evaluation orchestrator.
//!
//! A run goes through four stages:
//!
//! 1. class ids of the inputs are checked against `num_classes`
//! 2. raw candidates are reduced by [`batched_nms`]
//! 3. every image is filtered and matched independently (in parallel)
//! 4. per-image results are folded, in image order, into the precision-recall
//!    accumulator and the confusion matrix
//!
//! Stage 4 is sequential, so the metrics do not depend on thread scheduling.

use crate::accumulator::PrAccumulator;
use crate::config::EvalConfig;
use crate::confusion::{ConfusionMatrix, ConfusionMatrixArtifact};
use crate::error::{DetEvalError, Result};
use crate::matching::match_image;
use crate::nms::{batched_nms, ImageDetections};
use crate::stats::EvalStats;
use crate::threshold::aspect_ratio_filter;
use crate::types::{
    ClassId, Detection, GroundTruthBox, ImageId, Match, MatchKind, MetricsSummary, RawImage,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Matches of one image at the primary IoU threshold.
#[derive(Debug, Clone)]
pub struct ImageEvaluation {
    pub image_id: ImageId,
    pub matches: Vec<Match>,
}

impl ImageEvaluation {
    pub fn false_positives(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|m| m.kind == MatchKind::FalsePositive)
    }

    pub fn false_negatives(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|m| m.kind == MatchKind::FalseNegative)
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub summary: MetricsSummary,
    /// Built at the primary IoU threshold
    pub confusion: ConfusionMatrix,
    /// Detections kept by NMS, in image order
    pub detections: Vec<Detection>,
    pub images: Vec<ImageEvaluation>,
    pub stats: EvalStats,
}

impl EvaluationReport {
    /// The confusion matrix paired with the configured class names.
    pub fn confusion_artifact(&self, config: &EvalConfig) -> ConfusionMatrixArtifact {
        let labels: Vec<String> = (0..config.num_classes)
            .map(|i| config.class_name(ClassId(i)))
            .collect();
        self.confusion.to_artifact(&labels)
    }
}

/// Inputs of one image on their way to the matcher.
#[derive(Debug, Default)]
struct ImageWork {
    detections: Vec<Detection>,
    ground_truths: Vec<GroundTruthBox>,
    stats: EvalStats,
}

/// Output of one image, one match list per IoU threshold.
#[derive(Debug)]
struct ImageOutcome {
    image_id: ImageId,
    matches_per_threshold: Vec<Vec<Match>>,
    stats: EvalStats,
}

/// Runs evaluations under a fixed configuration.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    /// Create an evaluator; the configuration is validated once here.
    pub fn new(config: EvalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate raw model output against ground truth.
    ///
    /// Candidates go through score thresholding and per-class NMS before
    /// matching. Images that appear only in `ground_truths` are still
    /// evaluated, yielding false negatives.
    ///
    /// # Errors
    ///
    /// Returns `UnknownClass` for a ground truth class outside
    /// `[0, num_classes)`. Returns `InvalidAnnotation` for a candidate whose
    /// score vector has the wrong length or a score outside `[0, 1]`, and for
    /// an image size that is negative or non-finite. All are raised before any
    /// aggregation.
    ///
    /// # Example
    ///
    /// ```
    /// use det_eval::config::EvalConfig;
    /// use det_eval::evaluator::Evaluator;
    /// use det_eval::types::{BoundingBox, ClassId, GroundTruthBox, ImageId, RawCandidate, RawImage};
    ///
    /// let evaluator = Evaluator::new(EvalConfig::new(1)).unwrap();
    /// let raw = vec![RawImage::new(
    ///     ImageId(1),
    ///     vec![RawCandidate::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), vec![0.9])],
    /// )];
    /// let gt = vec![GroundTruthBox::new(ImageId(1), ClassId(0), BoundingBox::new(0.0, 0.0, 10.0, 10.0))];
    ///
    /// let report = evaluator.evaluate(&raw, &gt).unwrap();
    /// assert!((report.summary.map - 1.0).abs() < 1e-10);
    /// ```
    pub fn evaluate(
        &self,
        raw_images: &[RawImage],
        ground_truths: &[GroundTruthBox],
    ) -> Result<EvaluationReport> {
        self.check_ground_truth_classes(ground_truths)?;

        let suppressed = batched_nms(raw_images, &self.config)?;
        self.run(suppressed, ground_truths)
    }

    /// Evaluate detections that were already thresholded and suppressed.
    ///
    /// Useful for result records read back from disk.
    ///
    /// # Errors
    ///
    /// Returns `UnknownClass` for an out-of-range class and
    /// `InvalidAnnotation` for a detection score outside `[0, 1]` or NaN.
    pub fn evaluate_detections(
        &self,
        detections: &[Detection],
        ground_truths: &[GroundTruthBox],
    ) -> Result<EvaluationReport> {
        self.check_ground_truth_classes(ground_truths)?;
        for det in detections {
            self.check_class(det.image_id, det.class_id.index(), "detections")?;
            if !(0.0..=1.0).contains(&det.score) {
                return Err(DetEvalError::InvalidAnnotation(format!(
                    "detection in image {} (class {}) has score {}, expected a value in [0, 1]",
                    det.image_id, det.class_id, det.score
                )));
            }
        }

        let mut by_image: BTreeMap<ImageId, ImageDetections> = BTreeMap::new();
        for det in detections {
            by_image
                .entry(det.image_id)
                .or_insert_with(|| ImageDetections {
                    image_id: det.image_id,
                    detections: Vec::new(),
                    stats: EvalStats::new(),
                })
                .detections
                .push(det.clone());
        }

        self.run(by_image.into_values().collect(), ground_truths)
    }

    fn check_class(&self, image_id: ImageId, class_id: usize, source_kind: &'static str) -> Result<()> {
        if class_id >= self.config.num_classes {
            return Err(DetEvalError::UnknownClass {
                image_id: image_id.0,
                class_id,
                num_classes: self.config.num_classes,
                source_kind,
            });
        }
        Ok(())
    }

    fn check_ground_truth_classes(&self, ground_truths: &[GroundTruthBox]) -> Result<()> {
        for gt in ground_truths {
            self.check_class(gt.image_id, gt.class_id.index(), "ground truth")?;
        }
        Ok(())
    }

    fn run(
        &self,
        suppressed: Vec<ImageDetections>,
        ground_truths: &[GroundTruthBox],
    ) -> Result<EvaluationReport> {
        let config = &self.config;

        let mut detections = Vec::new();
        let mut work: BTreeMap<ImageId, ImageWork> = BTreeMap::new();
        for image in suppressed {
            for det in &image.detections {
                self.check_class(det.image_id, det.class_id.index(), "detections")?;
            }
            detections.extend(image.detections.iter().cloned());

            let entry = work.entry(image.image_id).or_default();
            entry.detections.extend(image.detections);
            entry.stats.merge(&image.stats);
        }
        for gt in ground_truths {
            work.entry(gt.image_id).or_default().ground_truths.push(gt.clone());
        }

        debug!(
            images = work.len(),
            detections = detections.len(),
            primary_iou = config.primary_iou_threshold(),
            "matching images"
        );

        let work: Vec<(ImageId, ImageWork)> = work.into_iter().collect();
        let outcomes: Vec<ImageOutcome> = work
            .into_par_iter()
            .map(|(image_id, image)| evaluate_image(image_id, image, config))
            .collect();

        let mut accumulator = PrAccumulator::new(config.num_classes, &config.match_iou_thresholds);
        let mut confusion = ConfusionMatrix::new(config.num_classes);
        let mut stats = EvalStats::new();
        let mut images = Vec::with_capacity(outcomes.len());

        for outcome in outcomes {
            for (threshold_index, matches) in outcome.matches_per_threshold.iter().enumerate() {
                accumulator.add_matches(threshold_index, outcome.image_id, matches)?;
            }

            let primary = outcome
                .matches_per_threshold
                .into_iter()
                .next()
                .unwrap_or_default();
            confusion.add_matches(&primary)?;
            stats.merge(&outcome.stats);

            images.push(ImageEvaluation {
                image_id: outcome.image_id,
                matches: primary,
            });
        }

        stats.log_summary();

        Ok(EvaluationReport {
            summary: accumulator.finalize(config),
            confusion,
            detections,
            images,
            stats,
        })
    }
}

/// Drop malformed and ineligible boxes, then match at every threshold.
fn evaluate_image(image_id: ImageId, image: ImageWork, config: &EvalConfig) -> ImageOutcome {
    let ImageWork {
        detections,
        ground_truths,
        mut stats,
    } = image;

    let mut eligible_gt = Vec::with_capacity(ground_truths.len());
    for gt in ground_truths {
        stats.add_ground_truth();
        if !gt.bbox.is_valid() {
            warn!(
                image_id = image_id.0,
                class_id = gt.class_id.index(),
                bbox = ?gt.bbox,
                "dropping ground truth with malformed box"
            );
            stats.skip_invalid_ground_truth();
        } else if !aspect_ratio_filter(&gt.bbox, config.whr_thres, config.px_thres) {
            stats.skip_ineligible_ground_truth();
        } else {
            eligible_gt.push(gt);
        }
    }

    let mut eligible_det = Vec::with_capacity(detections.len());
    for det in detections {
        if !det.bbox.is_valid() {
            warn!(
                image_id = image_id.0,
                class_id = det.class_id.index(),
                bbox = ?det.bbox,
                "dropping detection with malformed box"
            );
            stats.skip_invalid_box();
        } else if !aspect_ratio_filter(&det.bbox, config.whr_thres, config.px_thres) {
            stats.skip_ineligible_detection();
        } else {
            eligible_det.push(det);
        }
    }

    stats.record_image(!eligible_det.is_empty());

    let matches_per_threshold = config
        .match_iou_thresholds
        .iter()
        .map(|&threshold| match_image(&eligible_det, &eligible_gt, threshold, config.matching_mode))
        .collect();

    ImageOutcome {
        image_id,
        matches_per_threshold,
        stats,
    }
}
