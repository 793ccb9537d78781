//! Confusion matrix with a background row and column.
//!
//! Rows are ground-truth classes and columns predicted classes. The last row
//! holds detections that matched nothing; the last column holds ground truth
//! that no detection matched.

use crate::error::{DetEvalError, Result};
use crate::types::{ClassId, Match, MatchKind};
use serde::{Deserialize, Serialize};

/// `(num_classes + 1) x (num_classes + 1)` count table, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    num_classes: usize,
    counts: Vec<u64>,
}

/// Serializable form of a confusion matrix with its label order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrixArtifact {
    pub labels: Vec<String>,
    pub matrix: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Self {
        let size = num_classes + 1;
        Self {
            num_classes,
            counts: vec![0; size * size],
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Index of the background row and column.
    pub fn background(&self) -> usize {
        self.num_classes
    }

    fn size(&self) -> usize {
        self.num_classes + 1
    }

    fn check_class(&self, class_id: ClassId) -> Result<usize> {
        let index = class_id.index();
        if index >= self.num_classes {
            return Err(DetEvalError::InvalidAnnotation(format!(
                "Class {} outside confusion matrix with {} classes",
                index, self.num_classes
            )));
        }
        Ok(index)
    }

    fn increment(&mut self, row: usize, col: usize) {
        let size = self.size();
        self.counts[row * size + col] += 1;
    }

    /// Count one match.
    pub fn record(&mut self, m: &Match) -> Result<()> {
        let background = self.background();
        match m.kind {
            MatchKind::TruePositive => {
                let pred = self.check_class(m.class_id)?;
                let gt_class = m.gt_class_id.unwrap_or(m.class_id);
                let gt = self.check_class(gt_class)?;
                self.increment(gt, pred);
            }
            MatchKind::FalsePositive => {
                let pred = self.check_class(m.class_id)?;
                self.increment(background, pred);
            }
            MatchKind::FalseNegative => {
                let gt = self.check_class(m.class_id)?;
                self.increment(gt, background);
            }
        }
        Ok(())
    }

    pub fn add_matches(&mut self, matches: &[Match]) -> Result<()> {
        for m in matches {
            self.record(m)?;
        }
        Ok(())
    }

    /// Add the counts of another matrix of the same size.
    pub fn merge(&mut self, other: &ConfusionMatrix) -> Result<()> {
        if other.num_classes != self.num_classes {
            return Err(DetEvalError::InvalidConfig(format!(
                "Cannot merge a {}-class confusion matrix into a {}-class one",
                other.num_classes, self.num_classes
            )));
        }
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            *mine += theirs;
        }
        Ok(())
    }

    /// Count at `(row, col)`; out-of-range cells read as 0.
    pub fn get(&self, row: usize, col: usize) -> u64 {
        let size = self.size();
        if row >= size || col >= size {
            return 0;
        }
        self.counts[row * size + col]
    }

    pub fn row_sum(&self, row: usize) -> u64 {
        (0..self.size()).map(|col| self.get(row, col)).sum()
    }

    pub fn col_sum(&self, col: usize) -> u64 {
        (0..self.size()).map(|row| self.get(row, col)).sum()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Correct detections of `class_id` over all detections predicted as it.
    pub fn class_precision(&self, class_id: ClassId) -> f64 {
        let c = class_id.index();
        ratio(self.get(c, c), self.col_sum(c))
    }

    /// Correct detections of `class_id` over all of its ground truth.
    pub fn class_recall(&self, class_id: ClassId) -> f64 {
        let c = class_id.index();
        ratio(self.get(c, c), self.row_sum(c))
    }

    /// Rows of the matrix as nested vectors.
    pub fn to_rows(&self) -> Vec<Vec<u64>> {
        self.counts.chunks(self.size()).map(|row| row.to_vec()).collect()
    }

    /// Pair the matrix with class labels; `"background"` is appended.
    pub fn to_artifact(&self, labels: &[String]) -> ConfusionMatrixArtifact {
        let mut labels: Vec<String> = (0..self.num_classes)
            .map(|i| labels.get(i).cloned().unwrap_or_else(|| i.to_string()))
            .collect();
        labels.push("background".to_string());

        ConfusionMatrixArtifact {
            labels,
            matrix: self.to_rows(),
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
