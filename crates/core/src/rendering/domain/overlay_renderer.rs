use crate::error::DetectError;
use crate::shared::detection::{DetectionResult, DetectorKind};
use crate::shared::frame::FrameBuffer;

/// Domain interface for drawing detection results onto a frame in place.
///
/// Shared between the host thread and the capture thread, hence `&self`.
pub trait OverlayRenderer: Send + Sync {
    fn draw(
        &self,
        kind: DetectorKind,
        frame: &mut FrameBuffer,
        result: &DetectionResult,
    ) -> Result<(), DetectError>;
}
