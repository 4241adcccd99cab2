use crate::shared::frame::FrameBuffer;

/// Receiver of captured frames, invoked synchronously on the camera's
/// capture thread. The frame may be modified in place before it is shown.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: &mut FrameBuffer);
}
