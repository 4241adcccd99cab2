/// BlazeFace face detector using ONNX Runtime via `ort`.
///
/// Produces face boxes in frame pixel coordinates, label `0`, no landmarks.
use ort::session::Session;

use crate::detection::domain::detector::{DetectorConfig, RegionDetector};
use crate::detection::infrastructure::math::{non_max_suppression, sigmoid};
use crate::detection::infrastructure::tensor::{to_nchw, Normalization};
use crate::error::DetectError;
use crate::shared::detection::{Detection, Rect};
use crate::shared::frame::FrameBuffer;

/// Values per anchor in the regressor output (box + 6 keypoints).
const REGRESSOR_STRIDE: usize = 16;

/// Feature map strides and anchors per cell.
const ANCHOR_LAYOUT: [(u32, usize); 2] = [(8, 2), (16, 6)];

pub struct OnnxBlazefaceDetector {
    session: Session,
    input_size: u32,
    confidence: f32,
    nms_threshold: f32,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    pub fn new(session: Session, config: &DetectorConfig) -> Self {
        Self {
            session,
            input_size: config.input_size,
            confidence: config.confidence,
            nms_threshold: config.nms_threshold,
            anchors: generate_anchors(config.input_size),
        }
    }
}

impl RegionDetector for OnnxBlazefaceDetector {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<Detection>, DetectError> {
        let input = to_nchw(frame, self.input_size, &Normalization::UNIT_RGB);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, N, 16], classificators: [1, N, 1]
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data: Vec<f32> = regressors.iter().copied().collect();
        let score_data: Vec<f32> = scores.iter().copied().collect();

        let raw = decode(
            &reg_data,
            &score_data,
            &self.anchors,
            self.input_size,
            self.confidence,
            frame.width() as f32,
            frame.height() as f32,
        );
        Ok(non_max_suppression(raw, self.nms_threshold))
    }
}

/// Decode anchor-relative boxes above `confidence` into frame coordinates.
fn decode(
    regressors: &[f32],
    scores: &[f32],
    anchors: &[[f32; 2]],
    input_size: u32,
    confidence: f32,
    frame_w: f32,
    frame_h: f32,
) -> Vec<Detection> {
    let size = input_size as f32;
    let mut dets = Vec::new();

    for (i, (&raw_score, anchor)) in scores.iter().zip(anchors).enumerate() {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }
        let offset = i * REGRESSOR_STRIDE;
        let Some(reg) = regressors.get(offset..offset + 4) else {
            break;
        };

        let cx = anchor[0] + reg[0] / size;
        let cy = anchor[1] + reg[1] / size;
        let w = reg[2] / size;
        let h = reg[3] / size;

        let rect = Rect::from_corners(
            (cx - w / 2.0) * frame_w,
            (cy - h / 2.0) * frame_h,
            (cx + w / 2.0) * frame_w,
            (cy + h / 2.0) * frame_h,
        )
        .clamp_to(frame_w, frame_h);
        if rect.area() <= 0.0 {
            continue;
        }
        dets.push(Detection {
            rect,
            label: 0,
            score,
        });
    }

    dets
}

/// Generate BlazeFace anchor centres for a square input of `input_size`.
///
/// Two feature maps (stride 8 and 16) with 2 and 6 anchors per cell; at
/// 128 px that is the familiar 896 anchors.
fn generate_anchors(input_size: u32) -> Vec<[f32; 2]> {
    let mut anchors = Vec::new();

    for &(stride, per_cell) in &ANCHOR_LAYOUT {
        let grid = (input_size / stride).max(1) as usize;
        for y in 0..grid {
            for x in 0..grid {
                let cx = (x as f32 + 0.5) / grid as f32;
                let cy = (y as f32 + 0.5) / grid as f32;
                for _ in 0..per_cell {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(128, 896)]
    #[case(192, 2016)]
    fn test_anchor_count(#[case] size: u32, #[case] expected: usize) {
        assert_eq!(generate_anchors(size).len(), expected);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in generate_anchors(192) {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_decode_skips_low_scores() {
        let anchors = vec![[0.5, 0.5]];
        let regressors = vec![0.0; 16];
        let dets = decode(&regressors, &[-5.0], &anchors, 128, 0.5, 100.0, 100.0);
        assert!(dets.is_empty());
    }

    #[test]
    fn test_decode_maps_to_frame_pixels() {
        // Box centred on the anchor, 64 px wide in model space = half the frame
        let anchors = vec![[0.5, 0.5]];
        let mut regressors = vec![0.0; 16];
        regressors[2] = 64.0;
        regressors[3] = 64.0;
        let dets = decode(&regressors, &[5.0], &anchors, 128, 0.5, 200.0, 100.0);
        assert_eq!(dets.len(), 1);
        let r = dets[0].rect;
        assert_relative_eq!(r.x, 50.0, epsilon = 1e-3);
        assert_relative_eq!(r.y, 25.0, epsilon = 1e-3);
        assert_relative_eq!(r.width, 100.0, epsilon = 1e-3);
        assert_relative_eq!(r.height, 50.0, epsilon = 1e-3);
        assert_eq!(dets[0].label, 0);
    }

    #[test]
    fn test_decode_clamps_to_frame() {
        let anchors = vec![[0.05, 0.05]];
        let mut regressors = vec![0.0; 16];
        regressors[2] = 64.0;
        regressors[3] = 64.0;
        let dets = decode(&regressors, &[5.0], &anchors, 128, 0.5, 100.0, 100.0);
        assert_eq!(dets[0].rect.x, 0.0);
        assert_eq!(dets[0].rect.y, 0.0);
    }

    #[test]
    fn test_decode_stops_at_short_regressor_buffer() {
        let anchors = vec![[0.5, 0.5], [0.5, 0.5]];
        let mut regressors = vec![0.0; 16];
        regressors[2] = 10.0;
        regressors[3] = 10.0;
        let dets = decode(&regressors, &[5.0, 5.0], &anchors, 128, 0.5, 100.0, 100.0);
        assert_eq!(dets.len(), 1);
    }
}
