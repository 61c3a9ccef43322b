use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::input_image::InputImage;

/// Blocking face detection model.
///
/// Implementations may be stateful (e.g., an inference session with scratch
/// buffers), hence `&mut self`. Wrap one in a
/// [`ThreadedFaceDetector`](crate::detection::infrastructure::threaded_face_detector::ThreadedFaceDetector)
/// to get an asynchronous [`FaceDetector`](super::face_detector::FaceDetector).
pub trait FaceModel: Send {
    fn detect(
        &mut self,
        image: &InputImage,
    ) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>>;
}
