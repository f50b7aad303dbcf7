use serde::{Deserialize, Serialize};

use crate::common::armor::Point2;
use crate::detection::nms::Nms;

/// Axis-aligned bounding box in source-image coordinates, carrying the
/// confidence score of the detection it encloses.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize, PartialOrd)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub w: f32,
    pub h: f32,

    pub conf: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, conf: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            w: x2 - x1,
            h: y2 - y1,
            conf,
        }
    }

    /// Smallest axis-aligned box enclosing the given corner points.
    pub fn from_points(points: &[Point2; 4], conf: f32) -> Self {
        let mut x1 = f32::INFINITY;
        let mut y1 = f32::INFINITY;
        let mut x2 = f32::NEG_INFINITY;
        let mut y2 = f32::NEG_INFINITY;
        for p in points {
            x1 = x1.min(p.x);
            y1 = y1.min(p.y);
            x2 = x2.max(p.x);
            y2 = y2.max(p.y);
        }
        Self::new(x1, y1, x2, y2, conf)
    }

    /// Returns the width of the bounding box.
    pub fn width(&self) -> f32 {
        self.w
    }

    /// Returns the height of the bounding box.
    pub fn height(&self) -> f32 {
        self.h
    }

    /// Returns the center x-coordinate of the bounding box.
    pub fn cx(&self) -> f32 {
        self.x1 + self.w / 2.
    }

    /// Returns the center y-coordinate of the bounding box.
    pub fn cy(&self) -> f32 {
        self.y1 + self.h / 2.
    }

    /// Returns the bounding box coordinates as `(x1, y1, x2, y2)`.
    pub fn xy1_xy2(&self) -> (f32, f32, f32, f32) {
        (self.x1, self.y1, self.x2, self.y2)
    }

    /// Returns the bounding box coordinates and size as `(x, y, w, h)`.
    pub fn xy1_wh(&self) -> (f32, f32, f32, f32) {
        (self.x1, self.y1, self.w, self.h)
    }

    /// Computes the area of the bounding box.
    pub fn area(&self) -> f32 {
        self.h * self.w
    }

    /// Computes the intersection area between this bounding box and another.
    pub fn intersect(&self, other: &BBox) -> f32 {
        let left = self.x1.max(other.x1);
        let right = (self.x1 + self.w).min(other.x1 + other.w);
        let top = self.y1.max(other.y1);
        let bottom = (self.y1 + self.h).min(other.y1 + other.h);
        (right - left).max(0.) * (bottom - top).max(0.)
    }

    /// Computes the union area between this bounding box and another.
    pub fn union(&self, other: &BBox) -> f32 {
        self.area() + other.area() - self.intersect(other)
    }

    /// Sets the bounding box's coordinates using `(x1, y1, x2, y2)` and
    /// calculates width and height.
    pub fn with_x1y1_x2y2(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;

        self.w = x2 - x1;
        self.h = y2 - y1;
        self
    }

    pub fn with_confidence(mut self, x: f32) -> Self {
        self.conf = x;
        self
    }

    pub fn as_xy_wh_i32(&self) -> (i32, i32, i32, i32) {
        (self.x1.round() as i32,
         self.y1.round() as i32,
         self.w.round() as i32,
         self.h.round() as i32)
    }
}

impl Nms for BBox {
    /// Computes the intersection over union (IoU) between this bounding box and another.
    fn iou(&self, other: &Self) -> f32 {
        self.intersect(other) / self.union(other)
    }

    /// Returns the confidence score of the bounding box.
    fn confidence(&self) -> f32 {
        self.conf
    }
}
