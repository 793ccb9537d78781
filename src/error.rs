//! Errors raised while loading inputs or evaluating detections.
//!
//! Malformed boxes inside a run are not errors: they are dropped, logged and
//! counted in [`EvalStats`](crate::stats::EvalStats). Everything here aborts
//! the run before any metric is aggregated.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DetEvalError>;

#[derive(Error, Debug)]
pub enum DetEvalError {
    /// A class id outside `[0, num_classes)`.
    #[error("Unknown class {class_id} in {source_kind} for image {image_id} (num_classes = {num_classes})")]
    UnknownClass {
        image_id: u64,
        class_id: usize,
        num_classes: usize,
        /// Which input carried the id: "ground truth", "detections" or "matches"
        source_kind: &'static str,
    },

    /// Bad label line, result record or annotation.
    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// Confidence or IoU threshold outside `[0, 1]`.
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
