//! Core data types for detections, ground truth and evaluation results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an evaluated image, assigned once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Class index in `[0, num_classes)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub usize);

impl ClassId {
    /// Index into per-class tables.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned bounding box in corner form (x1, y1, x2, y2).
///
/// `(x1, y1)` is the top-left corner and `(x2, y2)` the bottom-right corner.
/// Every other convention is converted to this one at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a box from top-left corner plus width and height (COCO `bbox`).
    ///
    /// ```
    /// use det_eval::types::BoundingBox;
    ///
    /// let bbox = BoundingBox::from_xywh(10.0, 20.0, 30.0, 40.0);
    /// assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 40.0, 60.0));
    /// ```
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Create a box from its center point plus width and height.
    pub fn from_cxcywh(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Self::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }

    /// Create a box from normalized (0..1) center and size, scaled to pixels.
    ///
    /// This is the YOLO label convention.
    pub fn from_normalized_cxcywh(
        cx: f64,
        cy: f64,
        width: f64,
        height: f64,
        image_width: f64,
        image_height: f64,
    ) -> Self {
        Self::from_cxcywh(
            cx * image_width,
            cy * image_height,
            width * image_width,
            height * image_height,
        )
    }

    /// Convert to `[x, y, width, height]`.
    pub fn to_xywh(&self) -> [f64; 4] {
        [self.x1, self.y1, self.width(), self.height()]
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Get the area of the bounding box.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Check if the box is well formed: finite coordinates, `x2 >= x1` and `y2 >= y1`.
    ///
    /// Zero-extent boxes are well formed; they just never overlap anything.
    pub fn is_valid(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2].iter().all(|v| v.is_finite())
            && self.x2 >= self.x1
            && self.y2 >= self.y1
    }

    /// Clamp the box into `[0, image_width] x [0, image_height]`.
    ///
    /// ```
    /// use det_eval::types::BoundingBox;
    ///
    /// let clipped = BoundingBox::new(-5.0, 10.0, 120.0, 50.0).clip(100.0, 40.0);
    /// assert_eq!(clipped, BoundingBox::new(0.0, 10.0, 100.0, 40.0));
    /// ```
    pub fn clip(&self, image_width: f64, image_height: f64) -> Self {
        Self {
            x1: self.x1.max(0.0).min(image_width),
            y1: self.y1.max(0.0).min(image_height),
            x2: self.x2.max(0.0).min(image_width),
            y2: self.y2.max(0.0).min(image_height),
        }
    }
}

/// One raw box proposed by the model, with one score per class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub bbox: BoundingBox,
    pub class_scores: Vec<f64>,
}

impl RawCandidate {
    pub fn new(bbox: BoundingBox, class_scores: Vec<f64>) -> Self {
        Self { bbox, class_scores }
    }

    /// Highest finite class score and its class, first class wins ties.
    pub fn best_class(&self) -> Option<(ClassId, f64)> {
        self.class_scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| score.is_finite())
            .fold(None, |best, (idx, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((ClassId(idx), score)),
            })
    }
}

/// All raw candidates produced by the model for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImage {
    pub image_id: ImageId,
    /// `(width, height)` in pixels; kept detections are clipped to it when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<(f64, f64)>,
    pub candidates: Vec<RawCandidate>,
}

impl RawImage {
    pub fn new(image_id: ImageId, candidates: Vec<RawCandidate>) -> Self {
        Self {
            image_id,
            image_size: None,
            candidates,
        }
    }

    /// Attach the image size used for clipping.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.image_size = Some((width, height));
        self
    }
}

/// A detection kept after non-max suppression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub image_id: ImageId,
    pub class_id: ClassId,
    pub bbox: BoundingBox,
    pub score: f64,
}

impl Detection {
    pub fn new(image_id: ImageId, class_id: ClassId, bbox: BoundingBox, score: f64) -> Self {
        Self {
            image_id,
            class_id,
            bbox,
            score,
        }
    }
}

/// A labelled ground-truth box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthBox {
    pub image_id: ImageId,
    pub class_id: ClassId,
    pub bbox: BoundingBox,
}

impl GroundTruthBox {
    pub fn new(image_id: ImageId, class_id: ClassId, bbox: BoundingBox) -> Self {
        Self {
            image_id,
            class_id,
            bbox,
        }
    }
}

/// Outcome of matching a single box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    TruePositive,
    FalsePositive,
    FalseNegative,
}

/// Result of pairing one detection with at most one ground-truth box, or an
/// unmatched ground-truth box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub kind: MatchKind,
    /// IoU with the matched ground truth; 0 for unmatched boxes.
    pub iou: f64,
    /// Predicted class for TP/FP, ground-truth class for FN.
    pub class_id: ClassId,
    /// Class of the matched ground truth (TP only).
    pub gt_class_id: Option<ClassId>,
    /// Detection box for TP/FP, ground-truth box for FN.
    pub bbox: BoundingBox,
    /// Detection score for TP/FP.
    pub score: Option<f64>,
}

impl Match {
    pub fn true_positive(detection: &Detection, gt_class_id: ClassId, iou: f64) -> Self {
        Self {
            kind: MatchKind::TruePositive,
            iou,
            class_id: detection.class_id,
            gt_class_id: Some(gt_class_id),
            bbox: detection.bbox,
            score: Some(detection.score),
        }
    }

    pub fn false_positive(detection: &Detection) -> Self {
        Self {
            kind: MatchKind::FalsePositive,
            iou: 0.0,
            class_id: detection.class_id,
            gt_class_id: None,
            bbox: detection.bbox,
            score: Some(detection.score),
        }
    }

    pub fn false_negative(ground_truth: &GroundTruthBox) -> Self {
        Self {
            kind: MatchKind::FalseNegative,
            iou: 0.0,
            class_id: ground_truth.class_id,
            gt_class_id: Some(ground_truth.class_id),
            bbox: ground_truth.bbox,
            score: None,
        }
    }

    pub fn is_true_positive(&self) -> bool {
        self.kind == MatchKind::TruePositive
    }

    /// True positive whose ground truth carries the predicted class.
    ///
    /// Always the same as `is_true_positive` when matching within classes.
    pub fn is_correct_class(&self) -> bool {
        self.is_true_positive() && self.gt_class_id == Some(self.class_id)
    }
}

/// External result record: one per kept detection.
///
/// `bbox` is `[x, y, width, height]` with a top-left origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub image_id: u64,
    pub category_id: usize,
    pub bbox: Vec<f64>,
    pub score: f64,
}

/// Metrics for a single class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class_id: usize,
    pub name: String,
    /// Eligible ground-truth boxes of this class
    pub num_ground_truth: usize,
    /// Eligible detections predicted as this class
    pub num_detections: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    /// Precision at the operating point (all returned detections)
    pub precision: f64,
    /// Recall at the operating point (all returned detections)
    pub recall: f64,
    /// AP at the primary IoU threshold
    pub ap: f64,
    /// AP at every configured IoU threshold, in configuration order
    pub ap_per_threshold: Vec<f64>,
    /// Mean of `ap_per_threshold`
    pub ap_sweep_mean: f64,
    pub f1: f64,
}

/// Evaluation summary over all classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// IoU thresholds used for matching; the first one is primary
    pub iou_thresholds: Vec<f64>,
    pub per_class: Vec<ClassMetrics>,
    /// Means below cover only classes with at least one eligible ground truth
    pub mean_precision: f64,
    pub mean_recall: f64,
    /// Mean AP at the primary IoU threshold
    pub map: f64,
    /// Mean AP at each IoU threshold
    pub map_per_threshold: Vec<f64>,
    /// Mean of `map_per_threshold` (mAP@0.5:0.95 with the COCO sweep)
    pub map_sweep: f64,
    pub mean_f1: f64,
}

impl MetricsSummary {
    /// Look up the metrics of one class.
    pub fn class(&self, class_id: ClassId) -> Option<&ClassMetrics> {
        self.per_class.iter().find(|m| m.class_id == class_id.index())
    }
}
