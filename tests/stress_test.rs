//! Stress tests with large datasets and complex scenarios.

use det_eval::threshold::coco_iou_thresholds;
use det_eval::{
    BoundingBox, ClassId, EvalConfig, EvaluationReport, Evaluator, GroundTruthBox, ImageId,
    MatchingMode, RawCandidate, RawImage,
};

const NUM_CLASSES: usize = 4;

/// Deterministic pseudo-random sequence (LCG) so the data set is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn build_dataset(num_images: u64, boxes_per_image: usize) -> (Vec<RawImage>, Vec<GroundTruthBox>) {
    let mut rng = Lcg(42);
    let mut raw = Vec::new();
    let mut ground_truth = Vec::new();

    for image in 0..num_images {
        let mut candidates = Vec::new();
        for i in 0..boxes_per_image {
            let x = (i % 10) as f64 * 60.0;
            let y = (i / 10) as f64 * 60.0;
            let class = i % NUM_CLASSES;
            let gt_box = BoundingBox::new(x, y, x + 40.0, y + 40.0);
            ground_truth.push(GroundTruthBox::new(ImageId(image), ClassId(class), gt_box));

            // A jittered hit, a duplicate, and some noise
            let jitter = rng.next_f64() * 8.0;
            let mut scores = vec![0.0; NUM_CLASSES];
            scores[class] = 0.5 + rng.next_f64() * 0.5;
            candidates.push(RawCandidate::new(
                BoundingBox::new(x + jitter, y, x + 40.0 + jitter, y + 40.0),
                scores.clone(),
            ));
            scores[class] *= 0.9;
            candidates.push(RawCandidate::new(
                BoundingBox::new(x + jitter + 2.0, y + 2.0, x + 42.0 + jitter, y + 42.0),
                scores,
            ));

            let mut noise = vec![0.0; NUM_CLASSES];
            noise[(i + 1) % NUM_CLASSES] = rng.next_f64();
            let nx = 700.0 + rng.next_f64() * 200.0;
            let ny = rng.next_f64() * 500.0;
            candidates.push(RawCandidate::new(BoundingBox::new(nx, ny, nx + 30.0, ny + 30.0), noise));
        }
        raw.push(RawImage::new(ImageId(image), candidates));
    }

    (raw, ground_truth)
}

fn assert_consistent(report: &EvaluationReport) {
    for class in 0..NUM_CLASSES {
        let metrics = &report.summary.per_class[class];
        assert_eq!(report.confusion.row_sum(class) as usize, metrics.num_ground_truth);
        assert_eq!(report.confusion.col_sum(class) as usize, metrics.num_detections);
        assert!((0.0..=1.0).contains(&metrics.ap));
    }
}

#[test]
fn test_many_images() {
    let (raw, ground_truth) = build_dataset(200, 20);
    let evaluator = Evaluator::new(EvalConfig::new(NUM_CLASSES)).unwrap();

    let report = evaluator.evaluate(&raw, &ground_truth).unwrap();

    assert_eq!(report.images.len(), 200);
    assert_eq!(report.stats.total_candidates, 200 * 20 * 3);
    assert_eq!(report.stats.total_ground_truth, 200 * 20);
    // Every duplicate overlaps its hit by far more than 0.5
    assert!(report.stats.suppressed_by_nms >= 200 * 20);
    assert_consistent(&report);

    for metrics in &report.summary.per_class {
        assert_eq!(metrics.num_ground_truth, 1000);
        assert_eq!(metrics.recall, 1.0);
    }
}

#[test]
fn test_1000_boxes_single_image() {
    let (raw, ground_truth) = build_dataset(1, 1000);
    let config = EvalConfig::new(NUM_CLASSES).with_match_iou_thresholds(coco_iou_thresholds());
    let evaluator = Evaluator::new(config).unwrap();

    let report = evaluator.evaluate(&raw, &ground_truth).unwrap();

    assert_eq!(report.summary.per_class[0].ap_per_threshold.len(), 10);
    assert!(report.summary.map_sweep <= report.summary.map);
    assert_consistent(&report);
}

#[test]
fn test_results_independent_of_thread_count() {
    let (raw, ground_truth) = build_dataset(64, 15);

    for mode in [MatchingMode::PerClass, MatchingMode::ClassAgnostic] {
        let config = EvalConfig::new(NUM_CLASSES)
            .with_match_iou_thresholds(vec![0.5, 0.75])
            .with_matching_mode(mode);
        let evaluator = Evaluator::new(config).unwrap();

        let single = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let many = rayon::ThreadPoolBuilder::new().num_threads(8).build().unwrap();

        let a = single.install(|| evaluator.evaluate(&raw, &ground_truth)).unwrap();
        let b = many.install(|| evaluator.evaluate(&raw, &ground_truth)).unwrap();

        assert_eq!(a.summary, b.summary);
        assert_eq!(a.confusion, b.confusion);
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.detections, b.detections);
    }
}

#[test]
fn test_input_order_does_not_change_metrics() {
    let (raw, ground_truth) = build_dataset(50, 10);
    let evaluator = Evaluator::new(EvalConfig::new(NUM_CLASSES)).unwrap();

    let forward = evaluator.evaluate(&raw, &ground_truth).unwrap();

    let mut reversed_raw = raw.clone();
    reversed_raw.reverse();
    let mut reversed_gt = ground_truth.clone();
    reversed_gt.reverse();
    let backward = evaluator.evaluate(&reversed_raw, &reversed_gt).unwrap();

    assert_eq!(forward.summary, backward.summary);
    assert_eq!(forward.confusion, backward.confusion);
}
