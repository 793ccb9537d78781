//! Evaluation configuration.

use crate::error::{DetEvalError, Result};
use crate::threshold::validate_threshold;
use crate::types::ClassId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How detections are paired with ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
    /// IoU is only computed between boxes of the same class.
    #[default]
    PerClass,
    /// IoU is computed across classes, so misclassifications show up
    /// off the confusion-matrix diagonal.
    ClassAgnostic,
}

/// Immutable settings for one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Candidates scoring below this are discarded before NMS
    pub score_threshold: f64,
    /// Same-class candidates overlapping a kept box above this IoU are suppressed
    pub nms_iou_threshold: f64,
    /// IoU thresholds for matching; the first one is primary
    pub match_iou_thresholds: Vec<f64>,
    /// Maximum width/height (or height/width) ratio of an eligible box
    pub whr_thres: f64,
    /// Minimum side length in pixels of an eligible box
    pub px_thres: f64,
    pub num_classes: usize,
    pub matching_mode: MatchingMode,
    /// Emit one detection per passing class instead of only the best class
    pub multi_label: bool,
    /// Optional display names, one per class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_names: Option<Vec<String>>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.3,
            nms_iou_threshold: 0.5,
            match_iou_thresholds: vec![0.5],
            whr_thres: 4.0,
            px_thres: 6.0,
            num_classes: 1,
            matching_mode: MatchingMode::PerClass,
            multi_label: false,
            class_names: None,
        }
    }
}

impl EvalConfig {
    /// Default configuration for `num_classes` classes.
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            ..Self::default()
        }
    }

    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_nms_iou_threshold(mut self, threshold: f64) -> Self {
        self.nms_iou_threshold = threshold;
        self
    }

    pub fn with_match_iou_thresholds(mut self, thresholds: Vec<f64>) -> Self {
        self.match_iou_thresholds = thresholds;
        self
    }

    pub fn with_eligibility(mut self, whr_thres: f64, px_thres: f64) -> Self {
        self.whr_thres = whr_thres;
        self.px_thres = px_thres;
        self
    }

    pub fn with_matching_mode(mut self, mode: MatchingMode) -> Self {
        self.matching_mode = mode;
        self
    }

    pub fn with_multi_label(mut self, multi_label: bool) -> Self {
        self.multi_label = multi_label;
        self
    }

    pub fn with_class_names(mut self, names: Vec<String>) -> Self {
        self.class_names = Some(names);
        self
    }

    /// Load and validate a configuration from a JSON string.
    ///
    /// Missing fields take their default values.
    ///
    /// ```
    /// use det_eval::config::EvalConfig;
    ///
    /// let config = EvalConfig::from_json_str(r#"{"num_classes": 3, "px_thres": 4.0}"#).unwrap();
    /// assert_eq!(config.num_classes, 3);
    /// assert_eq!(config.match_iou_thresholds, vec![0.5]);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EvalConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check every field for a usable value.
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(DetEvalError::InvalidConfig(
                "num_classes must be greater than 0".to_string(),
            ));
        }

        validate_threshold(self.score_threshold)?;
        validate_threshold(self.nms_iou_threshold)?;

        if self.match_iou_thresholds.is_empty() {
            return Err(DetEvalError::InvalidConfig(
                "at least one match IoU threshold is required".to_string(),
            ));
        }
        for &threshold in &self.match_iou_thresholds {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(DetEvalError::InvalidThreshold(format!(
                    "Match IoU threshold must be in (0.0, 1.0], got {}",
                    threshold
                )));
            }
        }

        if self.whr_thres.is_nan() || self.whr_thres < 1.0 {
            return Err(DetEvalError::InvalidConfig(format!(
                "whr_thres must be >= 1.0, got {}",
                self.whr_thres
            )));
        }
        if !self.px_thres.is_finite() || self.px_thres < 0.0 {
            return Err(DetEvalError::InvalidConfig(format!(
                "px_thres must be a non-negative number, got {}",
                self.px_thres
            )));
        }

        if let Some(names) = &self.class_names {
            if names.len() != self.num_classes {
                return Err(DetEvalError::InvalidConfig(format!(
                    "{} class names given for {} classes",
                    names.len(),
                    self.num_classes
                )));
            }
        }

        Ok(())
    }

    /// The primary match IoU threshold.
    pub fn primary_iou_threshold(&self) -> f64 {
        self.match_iou_thresholds.first().copied().unwrap_or(0.5)
    }

    /// Display name of a class, falling back to its index.
    pub fn class_name(&self, class_id: ClassId) -> String {
        self.class_names
            .as_ref()
            .and_then(|names| names.get(class_id.index()))
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }
}
