//! # det-eval
//!
//! A Rust library for evaluating object detectors against labelled ground truth.
//!
//! This library covers the box-level post-processing and the metrics that depend on it:
//! - **NMS** (per-class greedy non-max suppression, batched over images)
//! - **Matching** (two-pass greedy IoU matching into TP / FP / FN)
//! - **AP / mAP** (precision envelope, trapezoid rule, optional IoU sweep)
//! - **Precision**, **Recall** and **F1** at the operating point
//! - **Confusion matrix** with a background row and column
//!
//! ## Features
//!
//! - Per-class or class-agnostic matching behind a single configuration flag
//! - Aspect-ratio and minimum-size eligibility filter shared by ground truth and detections
//! - Images processed in parallel with `rayon`, reduced deterministically
//! - YOLO label parsing and JSON result records `{image_id, category_id, bbox, score}`
//!
//! ## Quick Start
//!
//! ```rust
//! use det_eval::{BoundingBox, ClassId, EvalConfig, Evaluator, GroundTruthBox, ImageId, RawCandidate, RawImage};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EvalConfig::new(2).with_score_threshold(0.25);
//! let evaluator = Evaluator::new(config)?;
//!
//! let raw = vec![RawImage::new(
//!     ImageId(1),
//!     vec![RawCandidate::new(BoundingBox::new(10.0, 10.0, 50.0, 50.0), vec![0.1, 0.8])],
//! )];
//! let ground_truth = vec![GroundTruthBox::new(
//!     ImageId(1),
//!     ClassId(1),
//!     BoundingBox::new(12.0, 10.0, 50.0, 52.0),
//! )];
//!
//! let report = evaluator.evaluate(&raw, &ground_truth)?;
//! println!("mAP: {:.4}", report.summary.map);
//! println!("F1:  {:.4}", report.summary.mean_f1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod loader;
pub mod threshold;
pub mod metrics;
pub mod nms;
pub mod matching;
pub mod accumulator;
pub mod confusion;
pub mod evaluator;
pub mod stats;

// Re-export commonly used types and functions
pub use error::{DetEvalError, Result};
pub use types::{
    BoundingBox, ClassId, ClassMetrics, Detection, GroundTruthBox, ImageId, Match, MatchKind,
    MetricsSummary, RawCandidate, RawImage, ResultRecord,
};
pub use config::{EvalConfig, MatchingMode};
pub use evaluator::{EvaluationReport, Evaluator};
pub use confusion::{ConfusionMatrix, ConfusionMatrixArtifact};
pub use loader::{parse_yolo_labels, to_result_records, write_results_to_file};
pub use threshold::{aspect_ratio_filter, coco_iou_thresholds};
pub use stats::EvalStats;
