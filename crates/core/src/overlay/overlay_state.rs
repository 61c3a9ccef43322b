use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::detection::domain::detected_face::DetectedFace;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    #[default]
    Back,
}

/// Dimensions of the frames currently being analyzed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewGeometry {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayPhase {
    Idle,
    /// Geometry known; `faces_known` once a detection has been applied.
    Streaming { faces_known: bool },
}

/// Everything the draw tick reads.
///
/// Faces sit behind an `Arc` so replacing them is a pointer swap and a
/// snapshot never observes a partially written list.
#[derive(Clone, Debug)]
pub struct OverlayState {
    pub preview: Option<PreviewGeometry>,
    pub faces: Arc<Vec<DetectedFace>>,
    pub surface_size: Option<(u32, u32)>,
    pub facing: CameraFacing,
    /// Sequence number of the detection whose faces are shown.
    pub last_sequence: Option<u64>,
    /// Incremented on every face replacement.
    pub faces_generation: u64,
    /// Incremented on every session stop.
    pub session: u64,
    /// Set once by teardown; every later write is refused.
    pub torn_down: bool,
}

impl OverlayState {
    pub fn new(facing: CameraFacing) -> Self {
        Self {
            preview: None,
            faces: Arc::new(Vec::new()),
            surface_size: None,
            facing,
            last_sequence: None,
            faces_generation: 0,
            session: 0,
            torn_down: false,
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        match self.preview {
            None => OverlayPhase::Idle,
            Some(_) => OverlayPhase::Streaming {
                faces_known: self.faces_generation > 0,
            },
        }
    }

    /// Returns to idle for a new session. Facing, surface size and the
    /// teardown flag survive.
    pub fn reset(&mut self) {
        self.preview = None;
        self.faces = Arc::new(Vec::new());
        self.last_sequence = None;
        self.faces_generation = 0;
        self.session += 1;
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new(CameraFacing::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geometry::Rect;

    #[test]
    fn test_new_state_is_idle() {
        let state = OverlayState::default();
        assert_eq!(state.phase(), OverlayPhase::Idle);
        assert!(state.faces.is_empty());
        assert_eq!(state.facing, CameraFacing::Back);
    }

    #[test]
    fn test_phase_follows_geometry_then_faces() {
        let mut state = OverlayState::default();
        state.preview = Some(PreviewGeometry {
            width: 640,
            height: 480,
        });
        assert_eq!(
            state.phase(),
            OverlayPhase::Streaming { faces_known: false }
        );

        state.faces = Arc::new(vec![DetectedFace::new(Rect::default())]);
        state.faces_generation += 1;
        assert_eq!(state.phase(), OverlayPhase::Streaming { faces_known: true });
    }

    #[test]
    fn test_reset_clears_detections_and_bumps_session() {
        let mut state = OverlayState::new(CameraFacing::Front);
        state.preview = Some(PreviewGeometry {
            width: 640,
            height: 480,
        });
        state.faces = Arc::new(vec![DetectedFace::new(Rect::default())]);
        state.surface_size = Some((1080, 1920));
        state.last_sequence = Some(4);
        state.faces_generation = 3;
        state.torn_down = true;

        state.reset();

        assert_eq!(state.phase(), OverlayPhase::Idle);
        assert!(state.faces.is_empty());
        assert!(state.last_sequence.is_none());
        assert_eq!(state.session, 1);
        assert_eq!(state.facing, CameraFacing::Front);
        assert_eq!(state.surface_size, Some((1080, 1920)));
        assert!(state.torn_down);
    }
}
