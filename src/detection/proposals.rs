//! Parses the raw model output into candidate detections.

use ndarray::{array, Array2, ArrayView1, ArrayView2, Axis};

use crate::common::{Armor, ArmorColor, ArmorSymbol, BBox, Point2, NUM_CLASSES, NUM_COLORS};

/// Column index of the objectness score within an output row.
const COL_CONFIDENCE: usize = 8;
/// First colour-score column; symbol scores follow the colour slice.
const COL_COLORS: usize = 9;

/// Candidate detections surviving the confidence threshold, in row order.
///
/// `boxes` parallels `armors` and carries each candidate's confidence, so
/// the NMS stage can operate on boxes alone.
#[derive(Debug, Default)]
pub struct Proposals {
    pub armors: Vec<Armor>,
    pub boxes: Vec<BBox>,
}

impl Proposals {
    pub fn len(&self) -> usize {
        self.armors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armors.is_empty()
    }
}

/// Scans the raw output matrix (one row per candidate, 21 columns: 4 corner
/// pairs, objectness, colour scores, symbol scores) and builds an [`Armor`]
/// for every row at or above `conf_threshold`. Corner coordinates are mapped
/// from letterboxed space back to source space through `transform` in one
/// batched 3x3 x 3x4 multiplication.
pub fn generate_proposals(
    output: ArrayView2<'_, f32>,
    transform: &Array2<f32>,
    conf_threshold: f32,
) -> Proposals {
    let mut proposals = Proposals::default();

    for row in output.axis_iter(Axis(0)) {
        let confidence = row[COL_CONFIDENCE];
        if confidence < conf_threshold {
            continue;
        }

        let color_id = argmax(row.slice(ndarray::s![COL_COLORS..COL_COLORS + NUM_COLORS]));
        let symbol_id = argmax(row.slice(ndarray::s![
            COL_COLORS + NUM_COLORS..COL_COLORS + NUM_COLORS + NUM_CLASSES
        ]));

        // Corner columns as homogeneous coordinates, projected in one shot.
        let apex = array![
            [row[0], row[2], row[4], row[6]],
            [row[1], row[3], row[5], row[7]],
            [1., 1., 1., 1.],
        ];
        let mapped = transform.dot(&apex);

        let corners = [
            Point2::new(mapped[[0, 0]], mapped[[1, 0]]),
            Point2::new(mapped[[0, 1]], mapped[[1, 1]]),
            Point2::new(mapped[[0, 2]], mapped[[1, 2]]),
            Point2::new(mapped[[0, 3]], mapped[[1, 3]]),
        ];

        let armor = Armor::new(
            corners,
            ArmorColor::ALL[color_id],
            ArmorSymbol::ALL[symbol_id],
            confidence,
        );

        proposals.boxes.push(armor.bbox);
        proposals.armors.push(armor);
    }

    proposals
}

/// Index of the maximum value; ties resolve to the first occurrence.
fn argmax(scores: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (i, &score) in scores.iter().enumerate() {
        if score > best_score {
            best = i;
            best_score = score;
        }
    }
    best
}
