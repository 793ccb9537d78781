//! Basic evaluation example demonstrating core functionality.

use det_eval::loader::{parse_yolo_labels, results_to_json_string, to_result_records};
use det_eval::metrics::iou::calculate_iou;
use det_eval::{BoundingBox, EvalConfig, Evaluator, ImageId, RawCandidate, RawImage};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Detection Evaluation Example ===\n");

    // Example 1: IoU Calculation
    println!("1. IoU Calculation");
    let bbox1 = BoundingBox::new(10.0, 10.0, 60.0, 60.0);
    let bbox2 = BoundingBox::new(30.0, 30.0, 80.0, 80.0);
    let iou = calculate_iou(&bbox1, &bbox2);
    println!("   IoU between overlapping boxes: {:.4}", iou);
    println!();

    // Example 2: Ground truth from YOLO label text
    println!("2. Loading YOLO Labels");
    let labels = "0 0.25 0.30 0.20 0.15\n1 0.70 0.60 0.10 0.25\n0 0.50 0.90 0.01 0.05\n";
    let ground_truth = parse_yolo_labels(labels, ImageId(1), 640.0, 480.0)?;
    println!("   Loaded {} ground truth boxes", ground_truth.len());
    println!();

    // Example 3: Raw model output
    println!("3. Raw Candidates");
    let raw = vec![RawImage::new(
        ImageId(1),
        vec![
            RawCandidate::new(BoundingBox::new(96.0, 108.0, 224.0, 180.0), vec![0.92, 0.03]),
            RawCandidate::new(BoundingBox::new(100.0, 110.0, 226.0, 182.0), vec![0.81, 0.05]),
            RawCandidate::new(BoundingBox::new(418.0, 228.0, 480.0, 348.0), vec![0.10, 0.77]),
            RawCandidate::new(BoundingBox::new(20.0, 20.0, 80.0, 70.0), vec![0.45, 0.20]),
            RawCandidate::new(BoundingBox::new(300.0, 300.0, 340.0, 340.0), vec![0.12, 0.08]),
        ],
    )
    .with_size(640.0, 480.0)];
    println!("   {} candidates for {} image(s)", raw[0].candidates.len(), raw.len());
    println!();

    // Example 4: Evaluation
    println!("4. Running Full Evaluation");
    let config = EvalConfig::new(2).with_class_names(vec!["plane".to_string(), "ship".to_string()]);
    let evaluator = Evaluator::new(config.clone())?;
    let report = evaluator.evaluate(&raw, &ground_truth)?;
    println!("   Evaluation complete!");
    println!();
    println!("   Overall Metrics:");
    println!("   ├─ mAP@{:.2}: {:.4}", config.primary_iou_threshold(), report.summary.map);
    println!("   ├─ Mean precision: {:.4}", report.summary.mean_precision);
    println!("   ├─ Mean recall: {:.4}", report.summary.mean_recall);
    println!("   └─ Mean F1: {:.4}", report.summary.mean_f1);
    println!();
    println!("   Per-Class:");
    for metrics in &report.summary.per_class {
        println!(
            "   ├─ {} (id={}): AP {:.4}  P {:.4}  R {:.4}  F1 {:.4}  (gt {}, det {})",
            metrics.name,
            metrics.class_id,
            metrics.ap,
            metrics.precision,
            metrics.recall,
            metrics.f1,
            metrics.num_ground_truth,
            metrics.num_detections
        );
    }
    println!();

    // Example 5: Confusion matrix
    println!("5. Confusion Matrix (rows = ground truth, columns = prediction)");
    let artifact = report.confusion_artifact(&config);
    println!("   {:>12} {}", "", artifact.labels.join(" "));
    for (label, row) in artifact.labels.iter().zip(&artifact.matrix) {
        println!("   {:>12} {:?}", label, row);
    }
    println!();

    // Example 6: Result records
    println!("6. Result Records");
    let records = to_result_records(&report.detections);
    println!("{}", results_to_json_string(&records)?);
    println!();

    println!("   {}", report.stats);
    println!();
    println!("=== Example Complete ===");

    Ok(())
}
