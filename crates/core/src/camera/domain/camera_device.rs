use serde::{Deserialize, Serialize};

use crate::error::CameraError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    #[default]
    Back,
}

impl CameraFacing {
    /// Maps the host's facing id (`0` front, `1` back).
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(CameraFacing::Front),
            1 => Some(CameraFacing::Back),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            CameraFacing::Front => 0,
            CameraFacing::Back => 1,
        }
    }
}

/// Domain interface for the platform camera.
///
/// The camera owns its capture thread and delivers each frame to a
/// [`FrameSink`](crate::camera::domain::frame_sink::FrameSink) wired in at
/// construction. `Surface` is whatever handle the host passes for the
/// output view; `resolve_window` turns it into a presentable `Window`.
pub trait CameraDevice: Send {
    type Surface: ?Sized;
    type Window: Send;

    fn open(&mut self, facing: CameraFacing) -> Result<(), CameraError>;

    /// Stops capture. Closing a closed camera is a no-op.
    fn close(&mut self);

    fn resolve_window(&self, surface: &Self::Surface) -> Option<Self::Window>;

    fn set_window(&mut self, window: Self::Window) -> Result<(), CameraError>;
}
