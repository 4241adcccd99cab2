use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

use crate::detection::domain::asset_source::AssetSource;
use crate::detection::domain::detector::{DetectorConfig, DetectorEngine, DetectorFactory};
use crate::detection::infrastructure::execution_provider::execution_providers;
use crate::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use crate::detection::infrastructure::onnx_segmentation_detector::OnnxSegmentationDetector;
use crate::error::LoadError;
use crate::shared::detection::DetectorKind;

/// Builds `ort`-backed detectors: BlazeFace for the face slot, the Pelee
/// segmentation network for the segmentation slot.
#[derive(Default)]
pub struct OnnxDetectorFactory;

impl OnnxDetectorFactory {
    pub fn new() -> Self {
        Self
    }
}

impl DetectorFactory for OnnxDetectorFactory {
    fn build(
        &self,
        kind: DetectorKind,
        source: &dyn AssetSource,
        config: &DetectorConfig,
    ) -> Result<DetectorEngine, LoadError> {
        let bytes = source.read(&config.model)?;
        let session = build_session(&bytes, config)?;
        log::debug!(
            "Built {kind} session from {} ({} bytes, {:?})",
            config.model,
            bytes.len(),
            config.accelerator
        );
        Ok(match kind {
            DetectorKind::Face => {
                DetectorEngine::Region(Box::new(OnnxBlazefaceDetector::new(session, config)))
            }
            DetectorKind::Segmentation => DetectorEngine::Segmenting(Box::new(
                OnnxSegmentationDetector::new(session, config),
            )),
        })
    }
}

fn build_session(bytes: &[u8], config: &DetectorConfig) -> Result<Session, LoadError> {
    let commit = || -> Result<Session, Box<dyn std::error::Error>> {
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_execution_providers(execution_providers(config.accelerator, config.use_fp16))?;
        if config.threads > 0 {
            builder = builder.with_intra_threads(config.threads)?;
        }
        Ok(builder.commit_from_memory(bytes)?)
    };
    commit().map_err(|e| LoadError::model(&config.model, e))
}
