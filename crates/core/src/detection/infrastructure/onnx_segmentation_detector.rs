/// Pelee-style detection + segmentation network using ONNX Runtime via `ort`.
///
/// The model has two outputs, in either order:
/// - detections: rows of `[label, score, x1, y1, x2, y2]`, box corners
///   normalized to `[0, 1]`, label `0` being background
/// - segmentation logits: `[1, C, H, W]`
use ndarray::{ArrayView4, Ix4};
use ort::session::Session;

use crate::detection::domain::detector::{DetectorConfig, SegmentingDetector};
use crate::detection::infrastructure::math::{argmax, non_max_suppression, sigmoid};
use crate::detection::infrastructure::tensor::{to_nchw, Normalization};
use crate::error::DetectError;
use crate::shared::detection::{Detection, DetectionResult, Rect, SegmentationMask};
use crate::shared::frame::FrameBuffer;

const ROW_LEN: usize = 6;

pub struct OnnxSegmentationDetector {
    session: Session,
    input_size: u32,
    confidence: f32,
    nms_threshold: f32,
}

impl OnnxSegmentationDetector {
    pub fn new(session: Session, config: &DetectorConfig) -> Self {
        Self {
            session,
            input_size: config.input_size,
            confidence: config.confidence,
            nms_threshold: config.nms_threshold,
        }
    }
}

impl SegmentingDetector for OnnxSegmentationDetector {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<DetectionResult, DetectError> {
        let input = to_nchw(frame, self.input_size, &Normalization::PELEE_BGR);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        if outputs.len() < 2 {
            return Err(format!(
                "segmentation model expected 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }
        let first = outputs[0].try_extract_array::<f32>()?;
        let second = outputs[1].try_extract_array::<f32>()?;
        let (logits, rows) = if first.ndim() == 4 {
            (first, second)
        } else {
            (second, first)
        };
        if logits.ndim() != 4 {
            return Err(format!(
                "segmentation model has no [1, C, H, W] output (shapes {:?}, {:?})",
                logits.shape(),
                rows.shape()
            )
            .into());
        }

        let row_data: Vec<f32> = rows.iter().copied().collect();
        let objects = decode_rows(
            &row_data,
            self.confidence,
            frame.width() as f32,
            frame.height() as f32,
        );
        Ok(DetectionResult {
            objects: non_max_suppression(objects, self.nms_threshold),
            mask: Some(mask_from_logits(logits.view().into_dimensionality::<Ix4>()?)?),
        })
    }
}

/// Decode SSD-style output rows into frame-space detections.
fn decode_rows(rows: &[f32], confidence: f32, frame_w: f32, frame_h: f32) -> Vec<Detection> {
    rows.chunks_exact(ROW_LEN)
        .filter_map(|row| {
            let label = row[0] as i32;
            let score = row[1];
            if label <= 0 || score < confidence {
                return None;
            }
            let rect = Rect::from_corners(
                row[2] * frame_w,
                row[3] * frame_h,
                row[4] * frame_w,
                row[5] * frame_h,
            )
            .clamp_to(frame_w, frame_h);
            (rect.area() > 0.0).then_some(Detection {
                rect,
                label,
                score: score.clamp(0.0, 1.0),
            })
        })
        .collect()
}

/// Per-pixel argmax over the class axis of `[1, C, H, W]` logits.
///
/// A single-channel output is treated as foreground probability logits.
fn mask_from_logits(logits: ArrayView4<'_, f32>) -> Result<SegmentationMask, DetectError> {
    let (_, classes, height, width) = logits.dim();
    if classes == 0 || classes > u8::MAX as usize + 1 {
        return Err(format!("unsupported segmentation class count {classes}").into());
    }

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let class = if classes == 1 {
                u8::from(sigmoid(logits[[0, 0, y, x]]) > 0.5)
            } else {
                argmax((0..classes).map(|c| logits[[0, c, y, x]])).unwrap_or(0) as u8
            };
            out.push(class);
        }
    }
    Ok(SegmentationMask::new(width, height, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array4;

    #[test]
    fn test_decode_rows_skips_background_and_low_scores() {
        let rows = vec![
            0.0, 0.99, 0.0, 0.0, 1.0, 1.0, // background
            15.0, 0.2, 0.0, 0.0, 0.5, 0.5, // below confidence
            15.0, 0.8, 0.25, 0.5, 0.75, 1.0, // person
        ];
        let dets = decode_rows(&rows, 0.5, 100.0, 200.0);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, 15);
        assert_relative_eq!(dets[0].rect.x, 25.0);
        assert_relative_eq!(dets[0].rect.y, 100.0);
        assert_relative_eq!(dets[0].rect.width, 50.0);
        assert_relative_eq!(dets[0].rect.height, 100.0);
    }

    #[test]
    fn test_decode_rows_ignores_partial_row() {
        let rows = vec![7.0, 0.9, 0.1, 0.1, 0.2, 0.2, 3.0, 0.9];
        assert_eq!(decode_rows(&rows, 0.5, 10.0, 10.0).len(), 1);
    }

    #[test]
    fn test_mask_argmax() {
        let mut logits = Array4::<f32>::zeros((1, 3, 1, 2));
        logits[[0, 2, 0, 0]] = 4.0; // pixel 0 -> class 2
        logits[[0, 1, 0, 1]] = 1.0; // pixel 1 -> class 1
        let mask = mask_from_logits(logits.view()).unwrap();
        assert_eq!((mask.width(), mask.height()), (2, 1));
        assert_eq!(mask.classes(), &[2, 1]);
    }

    #[test]
    fn test_mask_single_channel_thresholds() {
        let mut logits = Array4::<f32>::zeros((1, 1, 1, 2));
        logits[[0, 0, 0, 0]] = 3.0;
        logits[[0, 0, 0, 1]] = -3.0;
        let mask = mask_from_logits(logits.view()).unwrap();
        assert_eq!(mask.classes(), &[1, 0]);
    }
}
