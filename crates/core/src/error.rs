use std::path::PathBuf;

use thiserror::Error;

use crate::shared::detection::DetectorKind;

/// Boxed error returned by detector and renderer implementations.
pub type DetectError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to read a model asset from an [`AssetSource`].
///
/// [`AssetSource`]: crate::detection::domain::asset_source::AssetSource
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("asset is empty: {0}")]
    Empty(String),
    #[error("failed to read asset {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to construct a detector instance.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("failed to build model {model}: {message}")]
    Model { model: String, message: String },
}

impl LoadError {
    pub fn model(model: impl Into<String>, message: impl ToString) -> Self {
        LoadError::Model {
            model: model.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera failed to open: {0}")]
    Open(String),
    #[error("camera rejected the output window: {0}")]
    Window(String),
    #[error("failed to load replay frames: {0}")]
    Frames(String),
    #[error("camera io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum BitmapError {
    #[error("failed to read bitmap info")]
    Info,
    #[error("unsupported bitmap format {0}, only RGBA_8888 is accepted")]
    UnsupportedFormat(i32),
    #[error("invalid bitmap geometry: {width}x{height}, stride {stride}")]
    Geometry { width: u32, height: u32, stride: u32 },
    #[error("failed to lock bitmap pixels")]
    Lock,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Error surfaced by the host-facing bridge operations.
///
/// The bridge never propagates these to the host; each operation logs the
/// error through [`BridgeError::log`] and reports `false`.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} detector is not loaded")]
    NotLoaded(DetectorKind),
    #[error("failed to load {kind} detector: {source}")]
    LoadFailure {
        kind: DetectorKind,
        #[source]
        source: LoadError,
    },
    #[error("{0} is not available")]
    CollaboratorUnavailable(&'static str),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Bitmap(#[from] BitmapError),
    #[error("{kind} detection failed: {source}")]
    Detection {
        kind: DetectorKind,
        #[source]
        source: DetectError,
    },
}

impl BridgeError {
    /// Logs the error for operation `op`. A missing detector is an expected
    /// state during start-up, so it is logged at warn.
    pub fn log(&self, op: &str) {
        match self {
            BridgeError::NotLoaded(_) => log::warn!("{op}: {self}"),
            _ => log::error!("{op}: {self}"),
        }
    }
}
