//! Metrics calculation modules for detection evaluation.

pub mod iou;
pub mod ap;
pub mod precision_recall;
pub mod f1_score;

pub use iou::{calculate_iou, calculate_iou_matrix};
pub use ap::{calculate_ap, calculate_map, calculate_sweep_ap};
pub use precision_recall::{
    calculate_precision_recall, calculate_precision_recall_curve, precision_envelope,
    PrecisionRecall, PrecisionRecallPoint,
};
pub use f1_score::calculate_f1_score;
