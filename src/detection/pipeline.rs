//! Per-frame asynchronous detection pipeline.

use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender};
use fast_image_resize::images::Image as FirImage;
use image::RgbImage;
use ndarray::Array2;
use parking_lot::RwLock;

use crate::common::{Armor, DetectorConfig};
use crate::detection::image_ops::{blob_from_image, letterbox, to_fir_image};
use crate::detection::nms::nms_indices;
use crate::detection::ort_engine::{InferenceEngine, OrtEngine};
use crate::detection::proposals::generate_proposals;

/// Result sink: invoked once per delivered frame with the surviving
/// detections (descending confidence), the submission timestamp and the
/// unmodified source image. Runs on whatever worker thread completed the
/// frame, never on the submitting thread.
pub type DetectorCallback = Box<dyn Fn(&[Armor], i64, &RgbImage) + Send + Sync>;

/// Completion handle for one submitted frame.
///
/// Resolves to `true` once the frame's results were handed to the
/// registered callback, `false` if the frame was rejected (empty image),
/// the result was dropped (no callback registered at completion time) or
/// the in-flight task failed.
pub struct FrameHandle {
    rx: Receiver<bool>,
}

impl FrameHandle {
    fn pair() -> (Sender<bool>, Self) {
        let (tx, rx) = bounded(1);
        (tx, Self { rx })
    }

    fn rejected() -> Self {
        let (tx, handle) = Self::pair();
        let _ = tx.send(false);
        handle
    }

    /// Blocks until the frame's pipeline run completes. A task that died
    /// without reporting resolves to `false`.
    pub fn wait(self) -> bool {
        self.rx.recv().unwrap_or(false)
    }

    /// Non-blocking poll; `None` while the frame is still in flight.
    pub fn try_wait(&self) -> Option<bool> {
        self.rx.try_recv().ok()
    }
}

/// Asynchronous armor detector.
///
/// Owns the per-frame lifecycle: `submit_frame` letterboxes the image on
/// the caller's thread, then schedules blob preparation, inference,
/// proposal extraction, NMS and callback dispatch onto the rayon worker
/// pool. Frames are processed independently; no state is carried between
/// them and nothing orders the completions of concurrently in-flight
/// frames.
pub struct ArmorDetector {
    config: DetectorConfig,
    engine: RwLock<Option<Arc<dyn InferenceEngine>>>,
    callback: Arc<RwLock<Option<DetectorCallback>>>,
}

impl ArmorDetector {
    /// Creates a detector without a compiled model; call [`init`] before
    /// submitting frames.
    ///
    /// [`init`]: ArmorDetector::init
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            engine: RwLock::new(None),
            callback: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a detector over an already-built engine. Used by tests and
    /// by callers bringing their own inference backend.
    pub fn with_engine(config: DetectorConfig, engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            config,
            engine: RwLock::new(Some(engine)),
            callback: Arc::new(RwLock::new(None)),
        }
    }

    /// (Re)compiles the inference graph from the configuration. Explicit:
    /// construction alone does not touch the model file.
    pub fn init(&self) -> Result<()> {
        let engine = OrtEngine::new(&self.config)?;
        *self.engine.write() = Some(Arc::new(engine));
        Ok(())
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Installs the result callback used by all subsequently completed
    /// frames. Not retroactive: a frame that completes while no callback
    /// is set resolves its handle to `false` and its result is dropped.
    /// Replacing the callback is not synchronized against in-flight
    /// completions; the last write before a frame completes wins.
    pub fn register_callback<F>(&self, callback: F)
    where
        F: Fn(&[Armor], i64, &RgbImage) + Send + Sync + 'static,
    {
        *self.callback.write() = Some(Box::new(callback));
    }

    /// Accepts a frame for detection and returns immediately.
    ///
    /// An empty image yields an already-resolved `false` handle with no
    /// work scheduled. Otherwise the letterbox transform runs here on the
    /// caller's thread and the rest of the pipeline is spawned onto the
    /// worker pool. Once submitted a frame always runs to completion;
    /// there is no cancellation and no retry.
    pub fn submit_frame(&self, image: RgbImage, timestamp_nanos: i64) -> FrameHandle {
        if image.width() == 0 || image.height() == 0 {
            return FrameHandle::rejected();
        }

        let engine = match self.engine.read().as_ref() {
            Some(engine) => Arc::clone(engine),
            None => {
                log::warn!("submit_frame called before init; frame dropped");
                return FrameHandle::rejected();
            }
        };

        let fir = to_fir_image(image.clone());
        let (padded, transform) =
            match letterbox(&fir, self.config.input_width, self.config.input_height) {
                Ok(result) => result,
                Err(e) => {
                    log::error!("Letterbox failed: {e}");
                    return FrameHandle::rejected();
                }
            };

        let (tx, handle) = FrameHandle::pair();
        let task = FrameTask {
            engine,
            padded,
            transform,
            src_image: image,
            timestamp_nanos,
            conf_threshold: self.config.conf_threshold,
            nms_threshold: self.config.nms_threshold,
            top_k: self.config.top_k,
            callback: Arc::clone(&self.callback),
        };

        rayon::spawn(move || {
            let delivered = task.run();
            let _ = tx.send(delivered);
        });

        handle
    }
}

/// Everything one in-flight frame needs, moved onto the worker thread.
struct FrameTask {
    engine: Arc<dyn InferenceEngine>,
    padded: FirImage<'static>,
    transform: Array2<f32>,
    src_image: RgbImage,
    timestamp_nanos: i64,
    conf_threshold: f32,
    nms_threshold: f32,
    top_k: usize,
    callback: Arc<RwLock<Option<DetectorCallback>>>,
}

impl FrameTask {
    /// Blob -> inference -> proposals -> NMS -> callback. Returns whether
    /// the result reached a callback.
    fn run(self) -> bool {
        let blob = match blob_from_image(&self.padded) {
            Ok(blob) => blob,
            Err(e) => {
                log::error!("Blob preparation failed: {e}");
                return false;
            }
        };

        let output = match self.engine.infer(blob) {
            Ok(output) => output,
            Err(e) => {
                log::error!("Inference failed: {e}");
                return false;
            }
        };

        let proposals = generate_proposals(output.view(), &self.transform, self.conf_threshold);
        let keep = nms_indices(
            &proposals.boxes,
            self.conf_threshold,
            self.nms_threshold,
            self.top_k,
        );
        let armors: Vec<Armor> = keep
            .iter()
            .map(|&i| proposals.armors[i].clone())
            .collect();

        match self.callback.read().as_ref() {
            Some(callback) => {
                callback(&armors, self.timestamp_nanos, &self.src_image);
                true
            }
            None => {
                log::debug!(
                    "No callback registered, dropping result for frame {}",
                    self.timestamp_nanos
                );
                false
            }
        }
    }
}
