//! Shared math utilities for the detector backends.

use crate::shared::detection::Detection;

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Greedy non-maximum suppression. Keeps detections in descending score
/// order, dropping any whose IoU with a kept detection of the same label
/// exceeds `iou_thresh`.
pub fn non_max_suppression(mut dets: Vec<Detection>, iou_thresh: f32) -> Vec<Detection> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::with_capacity(dets.len());
    for det in dets {
        let suppressed = keep
            .iter()
            .any(|k| k.label == det.label && k.rect.iou(&det.rect) > iou_thresh);
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}

/// Index of the largest value, first one on ties. `None` for an empty input.
pub fn argmax(values: impl IntoIterator<Item = f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, v) in values.into_iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
