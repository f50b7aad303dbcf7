mod armor;
mod bbox;
mod detector_config;
mod inference_device;

pub use armor::{Armor, ArmorColor, ArmorSymbol, Point2, NUM_CLASSES, NUM_COLORS};
pub use bbox::BBox;
pub use detector_config::DetectorConfig;
pub use inference_device::InferenceDevice;
