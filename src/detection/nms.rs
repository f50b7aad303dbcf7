/// Overlap measure used by non-maximum suppression.
pub trait Nms {
    fn iou(&self, other: &Self) -> f32;
    fn confidence(&self) -> f32;
}

/// Greedy non-maximum suppression with a top-K cap.
///
/// Candidates are visited in descending-confidence order; a candidate
/// survives when its IoU with every already-kept item stays at or below
/// `iou_threshold`. Returns the indices of the survivors, in selection
/// order (descending confidence). At most `top_k` indices are returned.
///
/// `score_threshold` re-checks the confidence floor; candidates below it
/// never survive. Empty input or `top_k == 0` yields an empty result.
pub fn nms_indices<T: Nms>(
    items: &[T],
    score_threshold: f32,
    iou_threshold: f32,
    top_k: usize,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len())
        .filter(|&i| items[i].confidence() >= score_threshold)
        .collect();
    order.sort_by(|&a, &b| {
        items[b]
            .confidence()
            .partial_cmp(&items[a].confidence())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    for &idx in &order {
        if keep.len() >= top_k {
            break;
        }
        let overlaps = keep
            .iter()
            .any(|&kept| items[kept].iou(&items[idx]) > iou_threshold);
        if !overlaps {
            keep.push(idx);
        }
    }
    keep
}
