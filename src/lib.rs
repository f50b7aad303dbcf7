//! Postprocessing and orchestration core for a real-time armor detector.
//!
//! Frames go in through [`ArmorDetector::submit_frame`]; filtered [`Armor`]
//! detections come out through the registered callback. Each frame runs as
//! its own task on the rayon worker pool: letterbox on the caller's thread,
//! then blob preparation, inference, proposal extraction and NMS off it.

pub mod common;
pub mod detection;

pub use common::{
    Armor, ArmorColor, ArmorSymbol, BBox, DetectorConfig, InferenceDevice, Point2, NUM_CLASSES,
    NUM_COLORS,
};
pub use detection::image_ops::{blob_from_image, letterbox, to_fir_image, PAD_VALUE};
pub use detection::nms::{nms_indices, Nms};
pub use detection::ort_engine::{InferenceEngine, OrtEngine};
pub use detection::pipeline::{ArmorDetector, DetectorCallback, FrameHandle};
pub use detection::proposals::{generate_proposals, Proposals};

/// Builds a detector and compiles the inference graph in one call.
pub fn init_detector(config: DetectorConfig) -> anyhow::Result<ArmorDetector> {
    log::info!("Initializing detector:\n{}", config.summary());
    let detector = ArmorDetector::new(config);
    detector.init()?;
    Ok(detector)
}
