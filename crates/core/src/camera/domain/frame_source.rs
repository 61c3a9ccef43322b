use crate::shared::frame::CameraFrame;

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Produces camera frames in capture order.
///
/// Implementations own the capture device (or a stand-in for one) and hand
/// out frames whose buffers return to them when released.
pub trait CameraFrameSource: Send {
    /// Blocks until the next frame is captured.
    ///
    /// Returns `None` once the source is exhausted or closed.
    fn next_frame(&mut self) -> Option<Result<CameraFrame, SourceError>>;

    /// Stops capture. Frames already handed out stay valid.
    fn close(&mut self);
}
