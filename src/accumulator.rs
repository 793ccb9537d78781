//! Precision-recall accumulation across images.
//!
//! Matches from every image are folded into one list per class and IoU
//! threshold. Nothing here depends on the order images are added in: entries
//! are ranked by confidence with image id and per-image position as tie-breaks.

use crate::config::EvalConfig;
use crate::error::{DetEvalError, Result};
use crate::metrics::ap::{calculate_ap, calculate_map, calculate_sweep_ap};
use crate::metrics::f1_score::calculate_f1_from_pr;
use crate::metrics::precision_recall::{
    calculate_precision_recall, calculate_precision_recall_curve, PrecisionRecallPoint,
};
use crate::types::{ClassId, ClassMetrics, ImageId, Match, MatchKind, MetricsSummary};

/// One ranked detection of a class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedEntry {
    pub confidence: f64,
    pub image_id: ImageId,
    /// Position of the detection within its image's matches
    pub seq: usize,
    pub is_tp: bool,
}

/// Curve and AP of one class at one IoU threshold.
#[derive(Debug, Clone, Default)]
pub struct ClassCurve {
    pub points: Vec<PrecisionRecallPoint>,
    pub ap: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub num_ground_truth: usize,
}

/// Ranked entries and the ground-truth count of one class.
#[derive(Debug, Clone, Default)]
pub struct PerClassAccumulator {
    entries: Vec<RankedEntry>,
    num_ground_truth: usize,
}

impl PerClassAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: RankedEntry) {
        self.entries.push(entry);
    }

    pub fn add_ground_truth(&mut self, count: usize) {
        self.num_ground_truth += count;
    }

    pub fn num_ground_truth(&self) -> usize {
        self.num_ground_truth
    }

    pub fn num_detections(&self) -> usize {
        self.entries.len()
    }

    pub fn merge(&mut self, other: PerClassAccumulator) {
        self.entries.extend(other.entries);
        self.num_ground_truth += other.num_ground_truth;
    }

    /// Rank the entries and compute the curve and its AP.
    pub fn into_curve(mut self) -> ClassCurve {
        self.entries.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a.image_id.cmp(&b.image_id))
                .then(a.seq.cmp(&b.seq))
        });

        let ranked: Vec<(f64, bool)> = self.entries.iter().map(|e| (e.confidence, e.is_tp)).collect();
        let points = calculate_precision_recall_curve(&ranked, self.num_ground_truth);

        let precisions: Vec<f64> = points.iter().map(|p| p.precision).collect();
        let recalls: Vec<f64> = points.iter().map(|p| p.recall).collect();
        let ap = if self.num_ground_truth == 0 {
            0.0
        } else {
            calculate_ap(&precisions, &recalls)
        };

        let true_positives = self.entries.iter().filter(|e| e.is_tp).count();

        ClassCurve {
            points,
            ap,
            true_positives,
            false_positives: self.entries.len() - true_positives,
            num_ground_truth: self.num_ground_truth,
        }
    }
}

/// Per-class accumulators for every configured IoU threshold.
#[derive(Debug, Clone)]
pub struct PrAccumulator {
    iou_thresholds: Vec<f64>,
    num_classes: usize,
    /// Indexed `[threshold][class]`
    classes: Vec<Vec<PerClassAccumulator>>,
}

impl PrAccumulator {
    pub fn new(num_classes: usize, iou_thresholds: &[f64]) -> Self {
        Self {
            iou_thresholds: iou_thresholds.to_vec(),
            num_classes,
            classes: vec![vec![PerClassAccumulator::new(); num_classes]; iou_thresholds.len()],
        }
    }

    pub fn iou_thresholds(&self) -> &[f64] {
        &self.iou_thresholds
    }

    fn class_slot(
        &mut self,
        threshold_index: usize,
        image_id: ImageId,
        class_id: ClassId,
    ) -> Result<&mut PerClassAccumulator> {
        let num_classes = self.num_classes;
        let per_threshold = self.classes.get_mut(threshold_index).ok_or_else(|| {
            DetEvalError::InvalidThreshold(format!("No IoU threshold at index {}", threshold_index))
        })?;
        per_threshold
            .get_mut(class_id.index())
            .ok_or(DetEvalError::UnknownClass {
                image_id: image_id.0,
                class_id: class_id.index(),
                num_classes,
                source_kind: "matches",
            })
    }

    /// Fold the matches of one image at one threshold into the accumulator.
    ///
    /// A true positive paired with ground truth of another class is ranked
    /// as a false positive of the predicted class, and its ground truth
    /// counts as a miss of its own class.
    pub fn add_matches(
        &mut self,
        threshold_index: usize,
        image_id: ImageId,
        matches: &[Match],
    ) -> Result<()> {
        for (seq, m) in matches.iter().enumerate() {
            match m.kind {
                MatchKind::TruePositive | MatchKind::FalsePositive => {
                    let entry = RankedEntry {
                        confidence: m.score.unwrap_or(0.0),
                        image_id,
                        seq,
                        is_tp: m.is_correct_class(),
                    };
                    self.class_slot(threshold_index, image_id, m.class_id)?.push(entry);
                    if let Some(gt_class) = m.gt_class_id {
                        self.class_slot(threshold_index, image_id, gt_class)?
                            .add_ground_truth(1);
                    }
                }
                MatchKind::FalseNegative => {
                    self.class_slot(threshold_index, image_id, m.class_id)?
                        .add_ground_truth(1);
                }
            }
        }
        Ok(())
    }

    /// Merge a partial accumulator built over the same thresholds and classes.
    pub fn merge(&mut self, other: PrAccumulator) -> Result<()> {
        if other.num_classes != self.num_classes || other.iou_thresholds != self.iou_thresholds {
            return Err(DetEvalError::InvalidConfig(
                "Cannot merge accumulators with different classes or IoU thresholds".to_string(),
            ));
        }

        for (mine, theirs) in self.classes.iter_mut().zip(other.classes) {
            for (acc, other_acc) in mine.iter_mut().zip(theirs) {
                acc.merge(other_acc);
            }
        }
        Ok(())
    }

    /// Consume the accumulator and compute per-class and aggregate metrics.
    pub fn finalize(self, config: &EvalConfig) -> MetricsSummary {
        let num_thresholds = self.iou_thresholds.len();
        let curves: Vec<Vec<ClassCurve>> = self
            .classes
            .into_iter()
            .map(|per_class| per_class.into_iter().map(PerClassAccumulator::into_curve).collect())
            .collect();

        let mut per_class = Vec::with_capacity(self.num_classes);
        for class_index in 0..self.num_classes {
            let ap_per_threshold: Vec<f64> =
                curves.iter().map(|per_class| per_class[class_index].ap).collect();

            let primary = curves
                .first()
                .and_then(|per_class| per_class.get(class_index))
                .cloned()
                .unwrap_or_default();

            let false_negatives = primary
                .num_ground_truth
                .saturating_sub(primary.true_positives);
            let pr = calculate_precision_recall(
                primary.true_positives,
                primary.false_positives,
                false_negatives,
            );

            per_class.push(ClassMetrics {
                class_id: class_index,
                name: config.class_name(ClassId(class_index)),
                num_ground_truth: primary.num_ground_truth,
                num_detections: primary.true_positives + primary.false_positives,
                true_positives: primary.true_positives,
                false_positives: primary.false_positives,
                precision: pr.precision,
                recall: pr.recall,
                ap: ap_per_threshold.first().copied().unwrap_or(0.0),
                ap_sweep_mean: calculate_sweep_ap(&ap_per_threshold),
                ap_per_threshold,
                f1: calculate_f1_from_pr(&pr),
            });
        }

        let scored: Vec<&ClassMetrics> =
            per_class.iter().filter(|m| m.num_ground_truth > 0).collect();
        let mean_of = |value: fn(&ClassMetrics) -> f64| -> f64 {
            let values: Vec<f64> = scored.iter().map(|&m| value(m)).collect();
            calculate_map(&values)
        };

        let map_per_threshold: Vec<f64> = (0..num_thresholds)
            .map(|t| {
                let aps: Vec<f64> = scored.iter().map(|m| m.ap_per_threshold[t]).collect();
                calculate_map(&aps)
            })
            .collect();

        MetricsSummary {
            mean_precision: mean_of(|m| m.precision),
            mean_recall: mean_of(|m| m.recall),
            map: map_per_threshold.first().copied().unwrap_or(0.0),
            map_sweep: calculate_sweep_ap(&map_per_threshold),
            mean_f1: mean_of(|m| m.f1),
            map_per_threshold,
            iou_thresholds: self.iou_thresholds,
            per_class,
        }
    }
}
