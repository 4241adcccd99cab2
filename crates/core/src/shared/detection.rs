use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Detector slots known to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    Face,
    Segmentation,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 2] = [DetectorKind::Face, DetectorKind::Segmentation];

    /// Maps the integer kind id used by foreign callers.
    pub fn from_id(id: i32) -> Result<Self, BridgeError> {
        match id {
            0 => Ok(DetectorKind::Face),
            1 => Ok(DetectorKind::Segmentation),
            other => Err(BridgeError::InvalidInput(format!(
                "unknown detector kind id {other}"
            ))),
        }
    }

    pub fn id(self) -> i32 {
        match self {
            DetectorKind::Face => 0,
            DetectorKind::Segmentation => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetectorKind::Face => "face",
            DetectorKind::Segmentation => "segmentation",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inference backend preference. `Gpu` maps to the platform execution
/// provider and falls back to CPU when it is unavailable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accelerator {
    #[default]
    Cpu,
    Gpu,
}

impl Accelerator {
    /// Maps the integer accelerator id used by foreign callers.
    pub fn from_id(id: i32) -> Result<Self, BridgeError> {
        match id {
            0 => Ok(Accelerator::Cpu),
            1 => Ok(Accelerator::Gpu),
            other => Err(BridgeError::InvalidInput(format!(
                "unknown accelerator id {other}"
            ))),
        }
    }
}

/// Axis-aligned box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, (x2 - x1).max(0.0), (y2 - y1).max(0.0))
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn iou(&self, other: &Rect) -> f32 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Clips the box to `[0, width) x [0, height)`.
    pub fn clamp_to(&self, width: f32, height: f32) -> Rect {
        let x1 = self.x.clamp(0.0, width);
        let y1 = self.y.clamp(0.0, height);
        let x2 = self.right().clamp(0.0, width);
        let y2 = self.bottom().clamp(0.0, height);
        Rect::from_corners(x1, y1, x2, y2)
    }
}

/// One detected object.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub rect: Rect,
    pub label: i32,
    /// Confidence in `[0, 1]`.
    pub score: f32,
}

/// Per-pixel class map produced by the segmentation detector, at the
/// model's output resolution. Class `0` is background.
///
/// Always holds exactly `width * height` entries.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationMask {
    width: usize,
    height: usize,
    classes: Vec<u8>,
}

impl SegmentationMask {
    /// Row-major class map. A short `classes` is padded with background and
    /// a long one truncated.
    pub fn new(width: usize, height: usize, mut classes: Vec<u8>) -> Self {
        let len = width.saturating_mul(height);
        if classes.len() != len {
            log::warn!(
                "segmentation mask has {} classes for {}x{}, resizing",
                classes.len(),
                width,
                height
            );
            classes.resize(len, 0);
        }
        Self {
            width,
            height,
            classes,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn classes(&self) -> &[u8] {
        &self.classes
    }

    /// Class at frame pixel `(x, y)` for a frame of `frame_w x frame_h`,
    /// sampled nearest-neighbour.
    pub fn class_at(&self, x: usize, y: usize, frame_w: usize, frame_h: usize) -> u8 {
        if self.width == 0 || self.height == 0 || frame_w == 0 || frame_h == 0 {
            return 0;
        }
        let mx = (x * self.width / frame_w).min(self.width - 1);
        let my = (y * self.height / frame_h).min(self.height - 1);
        self.classes.get(my * self.width + mx).copied().unwrap_or(0)
    }

    pub fn is_background(&self) -> bool {
        self.classes.iter().all(|&c| c == 0)
    }
}

/// Output of one detect call. Produced fresh per call and never shared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub objects: Vec<Detection>,
    pub mask: Option<SegmentationMask>,
}

impl DetectionResult {
    pub fn from_objects(objects: Vec<Detection>) -> Self {
        Self {
            objects,
            mask: None,
        }
    }

    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.mask.as_ref().map_or(true, |m| m.is_background())
    }
}
