use crate::detection::domain::asset_source::AssetSource;
use crate::error::{DetectError, LoadError};
use crate::shared::detection::{Accelerator, Detection, DetectionResult, DetectorKind};
use crate::shared::frame::FrameBuffer;

/// Domain interface for box detectors (the face slot).
///
/// Implementations may keep scratch buffers between calls, hence `&mut self`.
pub trait RegionDetector: Send {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<Detection>, DetectError>;
}

/// Domain interface for detectors that also label pixels (the segmentation slot).
pub trait SegmentingDetector: Send {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<DetectionResult, DetectError>;
}

/// The closed set of detector families the registry can hold.
pub enum DetectorEngine {
    Region(Box<dyn RegionDetector>),
    Segmenting(Box<dyn SegmentingDetector>),
}

impl DetectorEngine {
    pub fn detect(&mut self, frame: &FrameBuffer) -> Result<DetectionResult, DetectError> {
        match self {
            DetectorEngine::Region(detector) => {
                detector.detect(frame).map(DetectionResult::from_objects)
            }
            DetectorEngine::Segmenting(detector) => detector.detect(frame),
        }
    }
}

/// A fully constructed detector sitting in a registry slot.
pub struct LoadedDetector {
    kind: DetectorKind,
    instance_id: u64,
    engine: DetectorEngine,
}

impl LoadedDetector {
    pub fn new(kind: DetectorKind, instance_id: u64, engine: DetectorEngine) -> Self {
        Self {
            kind,
            instance_id,
            engine,
        }
    }

    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    /// Registry-unique id; changes on every successful reload.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn detect(&mut self, frame: &FrameBuffer) -> Result<DetectionResult, DetectError> {
        self.engine.detect(frame)
    }
}

impl std::fmt::Debug for LoadedDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedDetector")
            .field("kind", &self.kind)
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

/// Load-time parameters for one detector instance.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Asset name of the model file.
    pub model: String,
    pub input_size: u32,
    pub confidence: f32,
    pub nms_threshold: f32,
    pub use_fp16: bool,
    pub accelerator: Accelerator,
    pub threads: usize,
}

/// Builds detector engines from model assets.
///
/// Called with the registry lock held, so a build must not re-enter the registry.
pub trait DetectorFactory: Send + Sync {
    fn build(
        &self,
        kind: DetectorKind,
        source: &dyn AssetSource,
        config: &DetectorConfig,
    ) -> Result<DetectorEngine, LoadError>;
}
