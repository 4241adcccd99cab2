use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::camera::domain::camera_device::CameraFacing;
use crate::detection::domain::detector::DetectorConfig;
use crate::error::SettingsError;
use crate::shared::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_NMS_THRESHOLD, FACE_INPUT_SIZE, FACE_MODEL_NAME,
    SEGMENTATION_INPUT_SIZE, SEGMENTATION_MODEL_NAME,
};
use crate::shared::detection::{Accelerator, DetectorKind};

/// Per-detector tuning, persisted as part of [`BridgeSettings`].
///
/// There is no kind-neutral default: fields missing from a stored section are
/// taken from [`DetectorSettings::face`] or [`DetectorSettings::segmentation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorSettings {
    /// Asset name of the model file.
    pub model: String,
    pub input_size: u32,
    pub confidence: f32,
    pub nms_threshold: f32,
    pub use_fp16: bool,
    pub accelerator: Accelerator,
    /// Intra-op threads; `0` lets the runtime decide.
    pub threads: usize,
}

impl DetectorSettings {
    fn with_model(model: &str, input_size: u32) -> Self {
        Self {
            model: model.to_string(),
            input_size,
            confidence: DEFAULT_CONFIDENCE,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            use_fp16: true,
            accelerator: Accelerator::Cpu,
            threads: 0,
        }
    }

    pub fn face() -> Self {
        Self::with_model(FACE_MODEL_NAME, FACE_INPUT_SIZE)
    }

    pub fn segmentation() -> Self {
        Self::with_model(SEGMENTATION_MODEL_NAME, SEGMENTATION_INPUT_SIZE)
    }

    /// Builds the load-time config, overriding the stored accelerator.
    pub fn to_config(&self, accelerator: Accelerator) -> DetectorConfig {
        DetectorConfig {
            model: self.model.clone(),
            input_size: self.input_size,
            confidence: self.confidence,
            nms_threshold: self.nms_threshold,
            use_fp16: self.use_fp16,
            accelerator,
            threads: self.threads,
        }
    }
}

/// A stored detector section; absent fields keep the kind's defaults.
#[derive(Debug, Default, Deserialize)]
struct DetectorSection {
    model: Option<String>,
    input_size: Option<u32>,
    confidence: Option<f32>,
    nms_threshold: Option<f32>,
    use_fp16: Option<bool>,
    accelerator: Option<Accelerator>,
    threads: Option<usize>,
}

impl DetectorSection {
    fn apply(self, base: DetectorSettings) -> DetectorSettings {
        DetectorSettings {
            model: self.model.unwrap_or(base.model),
            input_size: self.input_size.unwrap_or(base.input_size),
            confidence: self.confidence.unwrap_or(base.confidence),
            nms_threshold: self.nms_threshold.unwrap_or(base.nms_threshold),
            use_fp16: self.use_fp16.unwrap_or(base.use_fp16),
            accelerator: self.accelerator.unwrap_or(base.accelerator),
            threads: self.threads.unwrap_or(base.threads),
        }
    }
}

fn face_section<'de, D: Deserializer<'de>>(d: D) -> Result<DetectorSettings, D::Error> {
    Ok(DetectorSection::deserialize(d)?.apply(DetectorSettings::face()))
}

fn segmentation_section<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<DetectorSettings, D::Error> {
    Ok(DetectorSection::deserialize(d)?.apply(DetectorSettings::segmentation()))
}

/// Deployment configuration of the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub camera_facing: CameraFacing,
    /// Kinds run by the frame callback, in order. A loaded kind left out of
    /// this list stays available for still-image detection only.
    pub dispatch_order: Vec<DetectorKind>,
    #[serde(deserialize_with = "face_section")]
    pub face: DetectorSettings,
    #[serde(deserialize_with = "segmentation_section")]
    pub segmentation: DetectorSettings,
    pub warning_enabled: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            camera_facing: CameraFacing::Back,
            dispatch_order: vec![DetectorKind::Segmentation, DetectorKind::Face],
            face: DetectorSettings::face(),
            segmentation: DetectorSettings::segmentation(),
            warning_enabled: true,
        }
    }
}

impl BridgeSettings {
    pub fn detector(&self, kind: DetectorKind) -> &DetectorSettings {
        match kind {
            DetectorKind::Face => &self.face,
            DetectorKind::Segmentation => &self.segmentation,
        }
    }

    pub fn detector_mut(&mut self, kind: DetectorKind) -> &mut DetectorSettings {
        match kind {
            DetectorKind::Face => &mut self.face,
            DetectorKind::Segmentation => &mut self.segmentation,
        }
    }

    /// Reads settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`BridgeSettings::load`], but falls back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_defaults_match_deployment() {
        let s = BridgeSettings::default();
        assert_eq!(s.camera_facing, CameraFacing::Back);
        assert_eq!(
            s.dispatch_order,
            vec![DetectorKind::Segmentation, DetectorKind::Face]
        );
        assert_eq!(s.face.model, FACE_MODEL_NAME);
        assert_eq!(s.face.input_size, 192);
        assert_eq!(s.segmentation.model, SEGMENTATION_MODEL_NAME);
        assert_eq!(s.segmentation.input_size, 304);
        assert!(s.warning_enabled);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: BridgeSettings =
            serde_json::from_str(r#"{"dispatch_order": ["segmentation"]}"#).unwrap();
        assert_eq!(s.dispatch_order, vec![DetectorKind::Segmentation]);
        assert_eq!(s.face, DetectorSettings::face());
        assert_eq!(s.segmentation, DetectorSettings::segmentation());
    }

    #[rstest]
    #[case(DetectorKind::Face, FACE_MODEL_NAME, 192)]
    #[case(DetectorKind::Segmentation, SEGMENTATION_MODEL_NAME, 304)]
    fn test_partial_detector_section_keeps_kind_defaults(
        #[case] kind: DetectorKind,
        #[case] model: &str,
        #[case] input_size: u32,
    ) {
        let json = format!(r#"{{"{kind}": {{"confidence": 0.6, "threads": 2}}}}"#);
        let s: BridgeSettings = serde_json::from_str(&json).unwrap();
        let d = s.detector(kind);
        assert_eq!(d.model, model);
        assert_eq!(d.input_size, input_size);
        assert_eq!(d.confidence, 0.6);
        assert_eq!(d.threads, 2);
        assert_eq!(d.nms_threshold, DEFAULT_NMS_THRESHOLD);
        assert!(d.use_fp16);
    }

    #[test]
    fn test_empty_detector_section_is_kind_default() {
        let s: BridgeSettings =
            serde_json::from_str(r#"{"face": {}, "segmentation": {}}"#).unwrap();
        assert_eq!(s.face, DetectorSettings::face());
        assert_eq!(s.segmentation, DetectorSettings::segmentation());
    }

    #[test]
    fn test_detector_section_overrides_model() {
        let s: BridgeSettings = serde_json::from_str(
            r#"{"segmentation": {"model": "seg_small.onnx", "input_size": 256, "accelerator": "gpu"}}"#,
        )
        .unwrap();
        assert_eq!(s.segmentation.model, "seg_small.onnx");
        assert_eq!(s.segmentation.input_size, 256);
        assert_eq!(s.segmentation.accelerator, Accelerator::Gpu);
        assert_eq!(s.face, DetectorSettings::face());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut s = BridgeSettings::default();
        s.camera_facing = CameraFacing::Front;
        s.face.accelerator = Accelerator::Gpu;
        let back: BridgeSettings = serde_json::from_str(&s.to_json()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"warning_enabled": false, "camera_facing": "front"}}"#).unwrap();
        let s = BridgeSettings::load(file.path()).unwrap();
        assert!(!s.warning_enabled);
        assert_eq!(s.camera_facing, CameraFacing::Front);
    }

    #[test]
    fn test_load_malformed_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            BridgeSettings::load(file.path()),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = BridgeSettings::load_or_default(&dir.path().join("absent.json"));
        assert_eq!(s, BridgeSettings::default());
    }

    #[test]
    fn test_to_config_overrides_accelerator() {
        let cfg = DetectorSettings::segmentation().to_config(Accelerator::Gpu);
        assert_eq!(cfg.accelerator, Accelerator::Gpu);
        assert_eq!(cfg.model, SEGMENTATION_MODEL_NAME);
    }

    #[test]
    fn test_detector_mut_targets_kind() {
        let mut s = BridgeSettings::default();
        s.detector_mut(DetectorKind::Face).threads = 4;
        assert_eq!(s.detector(DetectorKind::Face).threads, 4);
        assert_eq!(s.detector(DetectorKind::Segmentation).threads, 0);
    }
}
