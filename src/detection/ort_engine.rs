//! ONNX Runtime backend behind the [`InferenceEngine`] boundary.

use anyhow::{anyhow, bail, Result};
use ndarray::{Array2, Array4, Axis, Ix2};
use parking_lot::Mutex;
use ort::{
    execution_providers::{
        CUDAExecutionProvider, ExecutionProvider, TensorRTExecutionProvider,
    },
    session::builder::GraphOptimizationLevel,
    session::{Session, SessionInputValue},
    value::Value,
};

use crate::common::{DetectorConfig, InferenceDevice};

/// Boundary to the black-box inference engine: a fixed-shape f32 NCHW
/// tensor in, a 2-D candidate matrix (one row per candidate) out.
///
/// Implementations are shared read-only across concurrently executing
/// frame tasks, so they must be `Send + Sync` and keep any per-call state
/// internal to `infer`.
pub trait InferenceEngine: Send + Sync {
    fn infer(&self, blob: Array4<f32>) -> Result<Array2<f32>>;
}

/// ONNX Runtime session compiled from a [`DetectorConfig`].
///
/// `Session::run` needs exclusive access, so the session sits behind a
/// mutex; the compiled graph itself is shared through `Arc<OrtEngine>`.
pub struct OrtEngine {
    session: Mutex<Session>,
    output_name: String,
}

impl OrtEngine {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        // Dynamically load the runtime from the configured path.
        ort::init_from(config.ort_lib_path.to_string_lossy())
            .commit()
            .map_err(|e| anyhow!("Failed to commit ORT environment: {e}"))?;

        let mut builder = Session::builder()?;

        match config.device {
            InferenceDevice::Cpu => {}
            InferenceDevice::Cuda(device_id) => {
                let ep = CUDAExecutionProvider::default().with_device_id(device_id as i32);
                if !ep.is_available()? {
                    bail!("CUDA execution provider not available");
                }
                ep.register(&mut builder)
                    .map_err(|e| anyhow!("CUDA initialization failed: {e}"))?;
                log::info!("CUDA device {device_id} successfully registered");
            }
            InferenceDevice::TensorRt(device_id) => {
                let ep = TensorRTExecutionProvider::default().with_device_id(device_id as i32);
                if !ep.is_available()? {
                    bail!("TensorRT execution provider not available");
                }
                ep.register(&mut builder)
                    .map_err(|e| anyhow!("TensorRT initialization failed: {e}"))?;
                log::info!("TensorRT device {device_id} successfully registered");
            }
        }

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&config.model_path)?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| anyhow!("Model has no outputs"))?;

        log::info!(
            "Backend: ONNXRuntime | Device: {} | Model: {}",
            config.device,
            config.model_path.display(),
        );

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl InferenceEngine for OrtEngine {
    fn infer(&self, blob: Array4<f32>) -> Result<Array2<f32>> {
        let input: SessionInputValue<'_> = Value::from_array(blob.into_dyn())?.into_dyn().into();
        let inputs = vec![input];

        let raw = {
            let mut session = self.session.lock();
            let outputs = session.run(&inputs[..])?;
            outputs[self.output_name.as_str()]
                .try_extract_array::<f32>()?
                .into_owned()
        };

        // Squeeze the leading batch axis down to the candidate matrix.
        let matrix = match raw.ndim() {
            3 => raw.index_axis_move(Axis(0), 0),
            2 => raw,
            n => bail!("Unexpected model output rank: {n}"),
        };

        Ok(matrix.into_dimensionality::<Ix2>()?)
    }
}
