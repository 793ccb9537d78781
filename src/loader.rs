//! Loading ground truth labels and reading/writing result records.

use crate::error::{DetEvalError, Result};
use crate::types::{BoundingBox, ClassId, Detection, GroundTruthBox, ImageId, ResultRecord};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Parse YOLO label text for one image.
///
/// Each non-blank line is `class cx cy w h`, with the box normalized to
/// `[0, 1]`. Boxes are scaled by the image size into pixel corners.
///
/// # Errors
///
/// Returns `InvalidAnnotation` naming the line of the first malformed entry.
///
/// # Example
///
/// ```
/// use det_eval::loader::parse_yolo_labels;
/// use det_eval::types::ImageId;
///
/// let labels = "0 0.5 0.5 0.2 0.4\n";
/// let boxes = parse_yolo_labels(labels, ImageId(3), 100.0, 50.0).unwrap();
/// assert_eq!(boxes.len(), 1);
/// assert_eq!(boxes[0].bbox.x1, 40.0);
/// assert_eq!(boxes[0].bbox.y2, 35.0);
/// ```
pub fn parse_yolo_labels(
    text: &str,
    image_id: ImageId,
    image_width: f64,
    image_height: f64,
) -> Result<Vec<GroundTruthBox>> {
    let mut boxes = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(DetEvalError::InvalidAnnotation(format!(
                "Image {} line {}: expected 5 fields, got {}",
                image_id,
                line_no + 1,
                fields.len()
            )));
        }

        let values = fields
            .iter()
            .map(|field| field.parse::<f64>())
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|e| {
                DetEvalError::InvalidAnnotation(format!(
                    "Image {} line {}: {}",
                    image_id,
                    line_no + 1,
                    e
                ))
            })?;

        let class = values[0];
        if class < 0.0 || class.fract() != 0.0 {
            return Err(DetEvalError::InvalidAnnotation(format!(
                "Image {} line {}: class must be a non-negative integer, got {}",
                image_id,
                line_no + 1,
                fields[0]
            )));
        }

        let bbox = BoundingBox::from_normalized_cxcywh(
            values[1],
            values[2],
            values[3],
            values[4],
            image_width,
            image_height,
        );
        boxes.push(GroundTruthBox::new(image_id, ClassId(class as usize), bbox));
    }

    Ok(boxes)
}

/// Read a YOLO label file for one image.
///
/// # Example
///
/// ```no_run
/// use det_eval::loader::load_yolo_labels_from_file;
/// use det_eval::types::ImageId;
///
/// let boxes = load_yolo_labels_from_file("labels/0001.txt", ImageId(1), 608.0, 608.0).unwrap();
/// println!("Loaded {} boxes", boxes.len());
/// ```
pub fn load_yolo_labels_from_file<P: AsRef<Path>>(
    path: P,
    image_id: ImageId,
    image_width: f64,
    image_height: f64,
) -> Result<Vec<GroundTruthBox>> {
    let text = std::fs::read_to_string(path)?;
    parse_yolo_labels(&text, image_id, image_width, image_height)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Convert kept detections into result records.
///
/// The box becomes `[x, y, w, h]` rounded to 3 decimals and the score is
/// rounded to 5 decimals.
pub fn to_result_records(detections: &[Detection]) -> Vec<ResultRecord> {
    detections
        .iter()
        .map(|det| ResultRecord {
            image_id: det.image_id.0,
            category_id: det.class_id.index(),
            bbox: det.bbox.to_xywh().iter().map(|&v| round_to(v, 3)).collect(),
            score: round_to(det.score, 5),
        })
        .collect()
}

pub fn results_to_json_string(records: &[ResultRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Write result records as a JSON array.
pub fn write_results_to_file<P: AsRef<Path>>(path: P, records: &[ResultRecord]) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// Load result records from a JSON string.
///
/// # Example
///
/// ```
/// use det_eval::loader::load_results_from_string;
///
/// let json = r#"[{"image_id": 1, "category_id": 0, "bbox": [10.0, 20.0, 30.0, 40.0], "score": 0.9}]"#;
/// let records = load_results_from_string(json).unwrap();
/// assert_eq!(records.len(), 1);
/// ```
pub fn load_results_from_string(json_str: &str) -> Result<Vec<ResultRecord>> {
    let records: Vec<ResultRecord> = serde_json::from_str(json_str)?;
    validate_records(&records)?;
    Ok(records)
}

/// Load result records from a JSON file.
pub fn load_results_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<ResultRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let records: Vec<ResultRecord> = serde_json::from_reader(reader)?;

    validate_records(&records)?;

    Ok(records)
}

/// Validate that every record has a usable box and score.
fn validate_records(records: &[ResultRecord]) -> Result<()> {
    for (index, record) in records.iter().enumerate() {
        if record.bbox.len() != 4 {
            return Err(DetEvalError::InvalidAnnotation(format!(
                "Result {} (image {}, category {}) has invalid bbox length: {}",
                index,
                record.image_id,
                record.category_id,
                record.bbox.len()
            )));
        }

        if record.bbox[2] < 0.0 || record.bbox[3] < 0.0 {
            return Err(DetEvalError::InvalidBoundingBox(format!(
                "Result {} (image {}, category {}) has negative dimensions",
                index, record.image_id, record.category_id
            )));
        }

        if !record.score.is_finite() {
            return Err(DetEvalError::InvalidAnnotation(format!(
                "Result {} (image {}, category {}) has a non-finite score",
                index, record.image_id, record.category_id
            )));
        }
    }

    Ok(())
}

/// Turn result records back into detections.
pub fn records_to_detections(records: &[ResultRecord]) -> Result<Vec<Detection>> {
    validate_records(records)?;

    Ok(records
        .iter()
        .map(|record| {
            Detection::new(
                ImageId(record.image_id),
                ClassId(record.category_id),
                BoundingBox::from_xywh(record.bbox[0], record.bbox[1], record.bbox[2], record.bbox[3]),
                record.score,
            )
        })
        .collect())
}
