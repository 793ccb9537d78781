//! Mean AP over the IoU sweep 0.50:0.05:0.95, in both matching modes.

use det_eval::threshold::coco_iou_thresholds;
use det_eval::{
    BoundingBox, ClassId, EvalConfig, Evaluator, GroundTruthBox, ImageId, MatchingMode,
    RawCandidate, RawImage,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut raw = Vec::new();
    let mut ground_truth = Vec::new();
    for image in 0..8u64 {
        let shift = image as f64 * 1.5;
        ground_truth.push(GroundTruthBox::new(
            ImageId(image),
            ClassId(0),
            BoundingBox::new(50.0, 50.0, 150.0, 150.0),
        ));
        ground_truth.push(GroundTruthBox::new(
            ImageId(image),
            ClassId(1),
            BoundingBox::new(300.0, 80.0, 380.0, 200.0),
        ));

        raw.push(RawImage::new(
            ImageId(image),
            vec![
                RawCandidate::new(
                    BoundingBox::new(50.0 + shift, 50.0, 150.0 + shift, 150.0 - shift),
                    vec![0.9 - image as f64 * 0.05, 0.05],
                ),
                // Every other image labels the second object with the wrong class
                RawCandidate::new(
                    BoundingBox::new(302.0, 84.0, 380.0, 196.0),
                    if image % 2 == 0 { vec![0.1, 0.8] } else { vec![0.7, 0.2] },
                ),
            ],
        ));
    }

    for mode in [MatchingMode::PerClass, MatchingMode::ClassAgnostic] {
        let config = EvalConfig::new(2)
            .with_match_iou_thresholds(coco_iou_thresholds())
            .with_matching_mode(mode);
        let report = Evaluator::new(config)?.evaluate(&raw, &ground_truth)?;

        println!("=== {:?} ===", mode);
        for (threshold, map) in report
            .summary
            .iou_thresholds
            .iter()
            .zip(&report.summary.map_per_threshold)
        {
            println!("   mAP@{:.2}: {:.4}", threshold, map);
        }
        println!("   mAP@0.50:0.95: {:.4}", report.summary.map_sweep);
        println!("   confusion: {:?}", report.confusion.to_rows());
        println!();
    }

    Ok(())
}
