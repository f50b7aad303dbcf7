use serde::{Deserialize, Serialize};

use crate::common::bbox::BBox;
use crate::detection::nms::Nms;

/// Number of colour entries in the model's classification head.
pub const NUM_COLORS: usize = 4;
/// Number of symbol classes in the model's classification head.
pub const NUM_CLASSES: usize = 8;

/// A 2-D point in source-image coordinates. Sub-pixel precision is kept;
/// no rounding is applied anywhere in the pipeline.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Armor light-bar colour. The discriminant order matches the colour-score
/// slice of the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmorColor {
    Blue,
    Red,
    Neutral,
    Purple,
}

impl ArmorColor {
    /// Index order of the colour-score columns.
    pub const ALL: [ArmorColor; NUM_COLORS] = [
        ArmorColor::Blue,
        ArmorColor::Red,
        ArmorColor::Neutral,
        ArmorColor::Purple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArmorColor::Blue => "blue",
            ArmorColor::Red => "red",
            ArmorColor::Neutral => "neutral",
            ArmorColor::Purple => "purple",
        }
    }
}

/// Symbol printed on the armor plate. The discriminant order matches the
/// symbol-score slice of the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmorSymbol {
    Sentry,
    No1,
    No2,
    No3,
    No4,
    No5,
    Outpost,
    Base,
}

impl ArmorSymbol {
    /// Index order of the symbol-score columns.
    pub const ALL: [ArmorSymbol; NUM_CLASSES] = [
        ArmorSymbol::Sentry,
        ArmorSymbol::No1,
        ArmorSymbol::No2,
        ArmorSymbol::No3,
        ArmorSymbol::No4,
        ArmorSymbol::No5,
        ArmorSymbol::Outpost,
        ArmorSymbol::Base,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArmorSymbol::Sentry => "sentry",
            ArmorSymbol::No1 => "1",
            ArmorSymbol::No2 => "2",
            ArmorSymbol::No3 => "3",
            ArmorSymbol::No4 => "4",
            ArmorSymbol::No5 => "5",
            ArmorSymbol::Outpost => "outpost",
            ArmorSymbol::Base => "base",
        }
    }
}

/// A single detected armor plate.
///
/// `corners` keep the order emitted by the model's output columns and are
/// expressed in source-image coordinates. `bbox` is derived from `corners`
/// at construction; `color`, `symbol` and `confidence` are never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Armor {
    pub corners: [Point2; 4],
    pub bbox: BBox,
    pub color: ArmorColor,
    pub symbol: ArmorSymbol,
    pub confidence: f32,
}

impl Armor {
    pub fn new(corners: [Point2; 4], color: ArmorColor, symbol: ArmorSymbol, confidence: f32) -> Self {
        let bbox = BBox::from_points(&corners, confidence);
        Self {
            corners,
            bbox,
            color,
            symbol,
            confidence,
        }
    }

    /// Short human-readable tag, e.g. `red/3`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.color.as_str(), self.symbol.as_str())
    }
}

impl Nms for Armor {
    /// Computes the intersection over union (IoU) between this detection's
    /// bounding box and another's.
    fn iou(&self, other: &Self) -> f32 {
        self.bbox.intersect(&other.bbox) / self.bbox.union(&other.bbox)
    }

    /// Returns the confidence score of the detection.
    fn confidence(&self) -> f32 {
        self.confidence
    }
}
