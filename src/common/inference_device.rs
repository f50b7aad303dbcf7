/// Target execution device for the compiled model.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InferenceDevice {
    #[default]
    Cpu,
    Cuda(usize),
    TensorRt(usize),
}

impl InferenceDevice {
    pub fn from_str(device: &str, device_id: usize) -> Option<Self> {
        match device.to_lowercase().as_str() {
            "cpu" => Some(InferenceDevice::Cpu),
            "cuda" => Some(InferenceDevice::Cuda(device_id)),
            "tensorrt" => Some(InferenceDevice::TensorRt(device_id)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceDevice::Cpu => "CPU",
            InferenceDevice::Cuda(_) => "CUDA",
            InferenceDevice::TensorRt(_) => "TensorRT",
        }
    }
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceDevice::Cpu => write!(f, "CPU"),
            InferenceDevice::Cuda(id) => write!(f, "CUDA:{id}"),
            InferenceDevice::TensorRt(id) => write!(f, "TensorRT:{id}"),
        }
    }
}
