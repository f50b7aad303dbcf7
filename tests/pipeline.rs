use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use armor_detect::{
    Armor, ArmorColor, ArmorDetector, ArmorSymbol, DetectorConfig, InferenceEngine, NUM_CLASSES,
    NUM_COLORS,
};
use image::RgbImage;
use ndarray::{Array2, Array4};
use parking_lot::Mutex;

const COLS: usize = 9 + NUM_COLORS + NUM_CLASSES;
const ROWS: usize = 3549;
const CORNERS: [(f32, f32); 4] = [(120., 150.), (120., 190.), (200., 190.), (200., 150.)];

/// Inference stand-in returning a canned candidate matrix.
struct MockEngine {
    output: Array2<f32>,
    calls: AtomicUsize,
}

impl MockEngine {
    fn new(output: Array2<f32>) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
        }
    }
}

impl InferenceEngine for MockEngine {
    fn infer(&self, blob: Array4<f32>) -> anyhow::Result<Array2<f32>> {
        assert_eq!(blob.shape(), &[1, 3, 416, 416]);
        // Input blob is normalized to [0,1].
        assert!(blob.iter().all(|&v| (0. ..=1.).contains(&v)));
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

/// Engine whose every call fails, for the fatal-task path.
struct BrokenEngine;

impl InferenceEngine for BrokenEngine {
    fn infer(&self, _blob: Array4<f32>) -> anyhow::Result<Array2<f32>> {
        bail!("engine exploded")
    }
}

/// One confident candidate row at `CORNERS`, colour index 1, symbol index 3.
fn single_armor_output() -> Array2<f32> {
    let mut output = Array2::<f32>::zeros((ROWS, COLS));
    for (i, (x, y)) in CORNERS.iter().enumerate() {
        output[[0, 2 * i]] = *x;
        output[[0, 2 * i + 1]] = *y;
    }
    output[[0, 8]] = 0.9;
    output[[0, 9 + 1]] = 0.95;
    output[[0, 9 + NUM_COLORS + 3]] = 0.88;
    output
}

fn test_config() -> DetectorConfig {
    DetectorConfig::default()
        .with_conf_threshold(0.5)
        .with_nms_threshold(0.5)
        .with_top_k(10)
        .with_input_size(416, 416)
}

type Captured = Arc<Mutex<Vec<(Vec<Armor>, i64, (u32, u32))>>>;

fn capture_results(detector: &ArmorDetector) -> Captured {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);
    detector.register_callback(move |armors, timestamp, image| {
        sink.lock()
            .push((armors.to_vec(), timestamp, image.dimensions()));
    });
    captured
}

#[test]
fn end_to_end_single_detection() {
    let _ = env_logger::builder().is_test(true).try_init();

    let engine = Arc::new(MockEngine::new(single_armor_output()));
    let detector = ArmorDetector::with_engine(test_config(), Arc::clone(&engine) as Arc<dyn InferenceEngine>);
    let captured = capture_results(&detector);

    // 416x416 source: the letterbox transform is the identity, so corners
    // must come back unchanged.
    let frame = RgbImage::new(416, 416);
    let handle = detector.submit_frame(frame, 1_234_567);

    assert!(handle.wait());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);

    let results = captured.lock();
    assert_eq!(results.len(), 1);
    let (armors, timestamp, dims) = &results[0];
    assert_eq!(*timestamp, 1_234_567);
    assert_eq!(*dims, (416, 416));

    assert_eq!(armors.len(), 1);
    let armor = &armors[0];
    assert_eq!(armor.color, ArmorColor::ALL[1]);
    assert_eq!(armor.color, ArmorColor::Red);
    assert_eq!(armor.symbol, ArmorSymbol::ALL[3]);
    assert_eq!(armor.symbol, ArmorSymbol::No3);
    assert!((armor.confidence - 0.9).abs() < 1e-6);
    for (p, (x, y)) in armor.corners.iter().zip(CORNERS) {
        assert!((p.x - x).abs() < 1e-3);
        assert!((p.y - y).abs() < 1e-3);
    }
}

#[test]
fn empty_frame_resolves_false_without_callback() {
    let engine = Arc::new(MockEngine::new(single_armor_output()));
    let detector = ArmorDetector::with_engine(test_config(), Arc::clone(&engine) as Arc<dyn InferenceEngine>);
    let captured = capture_results(&detector);

    let handle = detector.submit_frame(RgbImage::new(0, 0), 42);

    assert!(!handle.wait());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    assert!(captured.lock().is_empty());
}

#[test]
fn result_is_dropped_when_no_callback_is_registered() {
    let detector =
        ArmorDetector::with_engine(test_config(), Arc::new(MockEngine::new(single_armor_output())));

    let handle = detector.submit_frame(RgbImage::new(416, 416), 7);

    assert!(!handle.wait());
}

#[test]
fn engine_failure_resolves_false_without_callback() {
    let detector = ArmorDetector::with_engine(test_config(), Arc::new(BrokenEngine));
    let captured = capture_results(&detector);

    let handle = detector.submit_frame(RgbImage::new(416, 416), 99);

    assert!(!handle.wait());
    assert!(captured.lock().is_empty());
}

#[test]
fn uninitialized_detector_rejects_frames() {
    let detector = ArmorDetector::new(test_config());
    let handle = detector.submit_frame(RgbImage::new(416, 416), 1);
    assert!(!handle.wait());
}

#[test]
fn concurrent_submissions_each_complete_exactly_once() {
    const FRAMES: i64 = 16;

    let engine = Arc::new(MockEngine::new(single_armor_output()));
    let detector = ArmorDetector::with_engine(test_config(), Arc::clone(&engine) as Arc<dyn InferenceEngine>);
    let captured = capture_results(&detector);

    let handles: Vec<_> = (0..FRAMES)
        .map(|ts| detector.submit_frame(RgbImage::new(640, 480), ts))
        .collect();

    for handle in handles {
        assert!(handle.wait());
    }

    assert_eq!(engine.calls.load(Ordering::SeqCst), FRAMES as usize);

    let results = captured.lock();
    assert_eq!(results.len(), FRAMES as usize);
    // Completion order is unspecified, but every timestamp arrives once.
    let mut timestamps: Vec<i64> = results.iter().map(|(_, ts, _)| *ts).collect();
    timestamps.sort_unstable();
    assert_eq!(timestamps, (0..FRAMES).collect::<Vec<_>>());
}

#[test]
fn nms_and_top_k_run_inside_the_pipeline() {
    // Two rows on top of each other plus one disjoint row; the overlapped
    // lower-confidence candidate must not reach the callback.
    let mut output = Array2::<f32>::zeros((ROWS, COLS));
    let rows: [([(f32, f32); 4], f32); 3] = [
        (CORNERS, 0.9),
        ([(121., 151.), (121., 191.), (201., 191.), (201., 151.)], 0.6),
        ([(10., 10.), (10., 40.), (60., 40.), (60., 10.)], 0.8),
    ];
    for (r, (corners, conf)) in rows.iter().enumerate() {
        for (i, (x, y)) in corners.iter().enumerate() {
            output[[r, 2 * i]] = *x;
            output[[r, 2 * i + 1]] = *y;
        }
        output[[r, 8]] = *conf;
        output[[r, 9]] = 1.;
        output[[r, 9 + NUM_COLORS]] = 1.;
    }

    let detector = ArmorDetector::with_engine(test_config(), Arc::new(MockEngine::new(output)));
    let captured = capture_results(&detector);

    assert!(detector.submit_frame(RgbImage::new(416, 416), 5).wait());

    let results = captured.lock();
    let (armors, _, _) = &results[0];
    assert_eq!(armors.len(), 2);
    // Descending confidence order.
    assert!((armors[0].confidence - 0.9).abs() < 1e-6);
    assert!((armors[1].confidence - 0.8).abs() < 1e-6);
}
