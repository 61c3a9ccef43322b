use std::fmt;

use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::input_image::InputImage;
use crate::shared::error::DetectionError;

pub type DetectionResult = Result<Vec<DetectedFace>, DetectionError>;

type CompletionHandler = Box<dyn FnOnce(DetectionResult) + Send>;

/// Domain interface for asynchronous face detection.
///
/// `detect_async` must return without waiting for the result and may be
/// called again while earlier detections are still running. Each call's
/// completion receives only that call's faces.
pub trait FaceDetector: Send + Sync {
    fn detect_async(&self, image: InputImage, completion: DetectionCompletion);
}

/// One-shot continuation for a single detection.
///
/// The handler runs exactly once: with the detector's result when
/// [`complete`](Self::complete) is called, or with
/// [`DetectionError::Abandoned`] if the completion is dropped unused.
pub struct DetectionCompletion {
    handler: Option<CompletionHandler>,
}

impl DetectionCompletion {
    pub fn new(handler: impl FnOnce(DetectionResult) + Send + 'static) -> Self {
        Self {
            handler: Some(Box::new(handler)),
        }
    }

    pub fn complete(mut self, result: DetectionResult) {
        if let Some(handler) = self.handler.take() {
            handler(result);
        }
    }
}

impl Drop for DetectionCompletion {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler(Err(DetectionError::Abandoned));
        }
    }
}

impl fmt::Debug for DetectionCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionCompletion")
            .field("pending", &self.handler.is_some())
            .finish()
    }
}
