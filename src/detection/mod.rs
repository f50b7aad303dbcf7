pub mod image_ops;
pub mod nms;
pub mod ort_engine;
pub mod pipeline;
pub mod proposals;
