//! Integration tests for the complete evaluation pipeline.

use det_eval::loader::{load_results_from_file, records_to_detections, to_result_records, write_results_to_file};
use det_eval::threshold::coco_iou_thresholds;
use det_eval::{
    BoundingBox, ClassId, EvalConfig, Evaluator, GroundTruthBox, ImageId, MatchKind,
    MatchingMode, RawCandidate, RawImage,
};

fn create_candidate(bbox: [f64; 4], scores: Vec<f64>) -> RawCandidate {
    RawCandidate::new(BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]), scores)
}

fn create_ground_truth(image_id: u64, class_id: usize, bbox: [f64; 4]) -> GroundTruthBox {
    GroundTruthBox::new(
        ImageId(image_id),
        ClassId(class_id),
        BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
    )
}

#[test]
fn test_perfect_predictions() {
    let evaluator = Evaluator::new(EvalConfig::new(1)).unwrap();
    let raw = vec![RawImage::new(
        ImageId(1),
        vec![create_candidate([0.0, 0.0, 10.0, 10.0], vec![0.9])],
    )];
    let ground_truth = vec![create_ground_truth(1, 0, [0.0, 0.0, 10.0, 10.0])];

    let report = evaluator.evaluate(&raw, &ground_truth).unwrap();

    let matches = &report.images[0].matches;
    assert_eq!(matches.iter().filter(|m| m.kind == MatchKind::TruePositive).count(), 1);
    assert_eq!(report.images[0].false_positives().count(), 0);
    assert_eq!(report.images[0].false_negatives().count(), 0);
    assert!((matches[0].iou - 1.0).abs() < 1e-10);
    assert!((report.summary.per_class[0].ap - 1.0).abs() < 1e-10, "AP should be 1.0");
    assert!((report.summary.map - 1.0).abs() < 1e-10);
}

#[test]
fn test_duplicate_suppressed_not_false_positive() {
    let evaluator = Evaluator::new(EvalConfig::new(1).with_nms_iou_threshold(0.5)).unwrap();
    let raw = vec![RawImage::new(
        ImageId(1),
        vec![
            create_candidate([0.0, 0.0, 10.0, 10.0], vec![0.9]),
            create_candidate([1.0, 1.0, 11.0, 11.0], vec![0.8]),
        ],
    )];
    let ground_truth = vec![create_ground_truth(1, 0, [0.0, 0.0, 10.0, 10.0])];

    let report = evaluator.evaluate(&raw, &ground_truth).unwrap();

    assert_eq!(report.detections.len(), 1);
    assert_eq!(report.detections[0].score, 0.9);
    assert_eq!(report.summary.per_class[0].true_positives, 1);
    assert_eq!(report.summary.per_class[0].false_positives, 0);
    assert_eq!(report.stats.suppressed_by_nms, 1);
}

#[test]
fn test_sliver_ground_truth_is_ineligible() {
    let config = EvalConfig::new(1).with_eligibility(3.0, 0.0);
    let evaluator = Evaluator::new(config).unwrap();
    let ground_truth = vec![create_ground_truth(1, 0, [0.0, 0.0, 2.0, 20.0])];

    let report = evaluator.evaluate(&[], &ground_truth).unwrap();

    assert_eq!(report.summary.per_class[0].num_ground_truth, 0);
    assert_eq!(report.images[0].false_negatives().count(), 0);
    assert_eq!(report.confusion.row_sum(0), 0);
}

#[test]
fn test_multiple_images_and_classes() {
    let evaluator = Evaluator::new(EvalConfig::new(2)).unwrap();
    let raw = vec![
        RawImage::new(
            ImageId(1),
            vec![
                create_candidate([10.0, 10.0, 60.0, 60.0], vec![0.9, 0.05]),
                create_candidate([100.0, 100.0, 150.0, 150.0], vec![0.1, 0.8]),
            ],
        ),
        RawImage::new(
            ImageId(2),
            vec![
                create_candidate([20.0, 20.0, 70.0, 70.0], vec![0.7, 0.2]),
                create_candidate([300.0, 300.0, 340.0, 340.0], vec![0.6, 0.1]),
            ],
        ),
    ];
    let ground_truth = vec![
        create_ground_truth(1, 0, [10.0, 10.0, 60.0, 60.0]),
        create_ground_truth(1, 1, [100.0, 100.0, 150.0, 150.0]),
        create_ground_truth(2, 0, [20.0, 20.0, 70.0, 70.0]),
        create_ground_truth(2, 1, [400.0, 400.0, 450.0, 450.0]),
    ];

    let report = evaluator.evaluate(&raw, &ground_truth).unwrap();
    let summary = &report.summary;

    let class0 = summary.class(ClassId(0)).unwrap();
    assert_eq!(class0.num_ground_truth, 2);
    assert_eq!(class0.true_positives, 2);
    assert_eq!(class0.false_positives, 1);
    assert!((class0.recall - 1.0).abs() < 1e-10);
    assert!((class0.precision - 2.0 / 3.0).abs() < 1e-10);
    // The FP has the lowest score, so the envelope is 1.0 up to full recall
    assert!((class0.ap - 1.0).abs() < 1e-10);

    let class1 = summary.class(ClassId(1)).unwrap();
    assert_eq!(class1.num_ground_truth, 2);
    assert_eq!(class1.true_positives, 1);
    assert!((class1.recall - 0.5).abs() < 1e-10);
    assert!((class1.precision - 1.0).abs() < 1e-10);

    // Confusion invariants
    for class in 0..2 {
        assert_eq!(
            report.confusion.row_sum(class) as usize,
            summary.per_class[class].num_ground_truth
        );
        assert_eq!(
            report.confusion.col_sum(class) as usize,
            summary.per_class[class].num_detections
        );
    }
}

#[test]
fn test_iou_sweep() {
    let config = EvalConfig::new(1).with_match_iou_thresholds(coco_iou_thresholds());
    let evaluator = Evaluator::new(config).unwrap();
    let raw = vec![RawImage::new(
        ImageId(1),
        vec![create_candidate([0.0, 0.0, 10.0, 7.8], vec![0.9])],
    )];
    let ground_truth = vec![create_ground_truth(1, 0, [0.0, 0.0, 10.0, 10.0])];

    let report = evaluator.evaluate(&raw, &ground_truth).unwrap();
    let metrics = &report.summary.per_class[0];

    // IoU 0.78 clears 0.50 through 0.75 only
    assert_eq!(metrics.ap_per_threshold.len(), 10);
    assert!(metrics.ap_per_threshold[..6].iter().all(|&ap| (ap - 1.0).abs() < 1e-10));
    assert!(metrics.ap_per_threshold[6..].iter().all(|&ap| ap == 0.0));
    assert!((metrics.ap_sweep_mean - 0.6).abs() < 1e-10);
    assert!((report.summary.map_sweep - 0.6).abs() < 1e-10);
    assert!((report.summary.map - 1.0).abs() < 1e-10);
}

#[test]
fn test_class_agnostic_matching() {
    let raw = vec![RawImage::new(
        ImageId(1),
        vec![create_candidate([0.0, 0.0, 20.0, 20.0], vec![0.2, 0.9])],
    )];
    let ground_truth = vec![create_ground_truth(1, 0, [0.0, 0.0, 20.0, 20.0])];

    let per_class = Evaluator::new(EvalConfig::new(2)).unwrap();
    let report = per_class.evaluate(&raw, &ground_truth).unwrap();
    assert_eq!(report.confusion.get(0, 1), 0);
    assert_eq!(report.confusion.get(0, 2), 1);
    assert_eq!(report.confusion.get(2, 1), 1);

    let agnostic = Evaluator::new(
        EvalConfig::new(2).with_matching_mode(MatchingMode::ClassAgnostic),
    )
    .unwrap();
    let report = agnostic.evaluate(&raw, &ground_truth).unwrap();
    assert_eq!(report.confusion.get(0, 1), 1);
    assert_eq!(report.confusion.total(), 1);

    // The misclassification still hurts the PR metrics of both classes
    assert_eq!(report.summary.per_class[0].recall, 0.0);
    assert_eq!(report.summary.per_class[1].precision, 0.0);
}

#[test]
fn test_results_file_round_trip() {
    let evaluator = Evaluator::new(EvalConfig::new(1)).unwrap();
    let raw = vec![RawImage::new(
        ImageId(5),
        vec![
            create_candidate([10.0, 10.0, 40.0, 40.0], vec![0.95]),
            create_candidate([100.0, 100.0, 130.0, 120.0], vec![0.6]),
        ],
    )];
    let ground_truth = vec![create_ground_truth(5, 0, [10.0, 10.0, 40.0, 40.0])];

    let first = evaluator.evaluate(&raw, &ground_truth).unwrap();

    let path = std::env::temp_dir().join(format!("det_eval_results_{}.json", std::process::id()));
    write_results_to_file(&path, &to_result_records(&first.detections)).unwrap();
    let records = load_results_from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(records.len(), 2);
    let detections = records_to_detections(&records).unwrap();
    let second = evaluator.evaluate_detections(&detections, &ground_truth).unwrap();

    assert_eq!(first.summary, second.summary);
}

#[test]
fn test_image_only_in_ground_truth() {
    let evaluator = Evaluator::new(EvalConfig::new(1)).unwrap();
    let raw = vec![RawImage::new(
        ImageId(1),
        vec![create_candidate([0.0, 0.0, 10.0, 10.0], vec![0.9])],
    )];
    let ground_truth = vec![
        create_ground_truth(1, 0, [0.0, 0.0, 10.0, 10.0]),
        create_ground_truth(2, 0, [0.0, 0.0, 10.0, 10.0]),
    ];

    let report = evaluator.evaluate(&raw, &ground_truth).unwrap();

    assert_eq!(report.images.len(), 2);
    assert_eq!(report.images[1].image_id, ImageId(2));
    assert_eq!(report.images[1].false_negatives().count(), 1);
    assert!((report.summary.per_class[0].recall - 0.5).abs() < 1e-10);
    assert_eq!(report.stats.empty_predictions, 1);
}
