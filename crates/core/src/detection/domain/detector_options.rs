use serde::{Deserialize, Serialize};

use crate::detection::domain::detected_face::{Classification, DetectedFace};
use crate::shared::constants::DEFAULT_MIN_FACE_SIZE;

/// What a detector reports for each face.
///
/// Applied to model output before it reaches the overlay, so a model may
/// always compute everything and let the options trim it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Smallest face to report, as a fraction of the upright image width.
    pub min_face_size: f32,
    pub landmarks: bool,
    pub contours: bool,
    pub classification: bool,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            landmarks: true,
            contours: true,
            classification: true,
        }
    }
}

impl DetectorOptions {
    /// Drops faces narrower than `min_face_size * image_width` and strips
    /// the disabled per-face details. Order of the remaining faces is kept.
    pub fn apply(&self, faces: Vec<DetectedFace>, image_width: u32) -> Vec<DetectedFace> {
        let min_width = self.min_face_size.max(0.0) * image_width as f32;
        faces
            .into_iter()
            .filter(|face| face.bounding_box.width() >= min_width)
            .map(|mut face| {
                if !self.landmarks {
                    face.landmarks.clear();
                }
                if !self.contours {
                    face.contours.clear();
                }
                if !self.classification {
                    face.classification = Classification::default();
                }
                face
            })
            .collect()
    }
}
