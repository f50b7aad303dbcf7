use std::path::PathBuf;

use crate::common::inference_device::InferenceDevice;

/// Process-wide detector configuration. Set once at construction and
/// immutable afterwards; no per-frame state lives here.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the ONNX model file.
    pub model_path: PathBuf,
    /// Path to the ONNX Runtime dynamic library (`libonnxruntime.so`).
    pub ort_lib_path: PathBuf,
    pub device: InferenceDevice,
    /// Minimum objectness score a candidate row must reach.
    pub conf_threshold: f32,
    /// IoU above which a lower-confidence detection is suppressed.
    pub nms_threshold: f32,
    /// Maximum number of detections delivered per frame.
    pub top_k: usize,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            ort_lib_path: PathBuf::new(),
            device: InferenceDevice::Cpu,
            conf_threshold: 0.25,
            nms_threshold: 0.45,
            top_k: 128,
            input_width: 416,
            input_height: 416,
        }
    }
}

impl DetectorConfig {
    pub fn new(model_path: impl Into<PathBuf>, ort_lib_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ort_lib_path: ort_lib_path.into(),
            ..Default::default()
        }
    }

    pub fn with_device(mut self, device: InferenceDevice) -> Self {
        self.device = device;
        self
    }

    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    pub fn with_nms_threshold(mut self, threshold: f32) -> Self {
        self.nms_threshold = threshold;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_width = width;
        self.input_height = height;
        self
    }

    pub fn summary(&self) -> String {
        format!(
            "Model: {}\n\
             OnnxRuntime Lib Path: {}\n\
             Inference Device: {}\n\
             Model Input Resolution: {}x{}\n\
             Confidence Threshold: {} | NMS Threshold: {} | Top-K: {}",
            self.model_path.display(),
            self.ort_lib_path.display(),
            self.device,
            self.input_width,
            self.input_height,
            self.conf_threshold,
            self.nms_threshold,
            self.top_k,
        )
    }
}
