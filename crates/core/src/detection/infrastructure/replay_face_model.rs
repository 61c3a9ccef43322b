use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::face_model::FaceModel;
use crate::detection::domain::input_image::InputImage;

/// Scripted detector output for one camera frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFrame {
    pub index: u64,
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
    /// Simulated inference latency.
    #[serde(default)]
    pub delay_ms: u64,
    /// Report a model failure instead of faces.
    #[serde(default)]
    pub fail: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub frames: Vec<ScriptedFrame>,
}

impl ReplayScript {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Replays pre-recorded detections by camera frame index.
///
/// Frames missing from the script yield no faces. Clones share the script,
/// so one script can back every worker of a threaded detector.
#[derive(Clone)]
pub struct ReplayFaceModel {
    frames: Arc<HashMap<u64, ScriptedFrame>>,
}

impl ReplayFaceModel {
    pub fn new(script: ReplayScript) -> Self {
        let frames = script
            .frames
            .into_iter()
            .map(|frame| (frame.index, frame))
            .collect();
        Self {
            frames: Arc::new(frames),
        }
    }
}

impl FaceModel for ReplayFaceModel {
    fn detect(
        &mut self,
        image: &InputImage,
    ) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
        let Some(frame) = self.frames.get(&image.source_index()) else {
            return Ok(Vec::new());
        };
        if frame.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(frame.delay_ms));
        }
        if frame.fail {
            return Err(format!("scripted failure on frame {}", frame.index).into());
        }
        Ok(frame.faces.clone())
    }
}
