//! One face found by a detector, in the upright source image's pixel space.

use serde::{Deserialize, Serialize};

use crate::shared::geometry::{Point, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkKind {
    LeftEye,
    RightEye,
    NoseBase,
    LeftCheek,
    RightCheek,
    MouthLeft,
    MouthRight,
    MouthBottom,
    LeftEar,
    RightEar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourKind {
    Face,
    LeftEyebrowTop,
    LeftEyebrowBottom,
    RightEyebrowTop,
    RightEyebrowBottom,
    LeftEye,
    RightEye,
    UpperLipTop,
    UpperLipBottom,
    LowerLipTop,
    LowerLipBottom,
    NoseBridge,
    NoseBottom,
    LeftCheek,
    RightCheek,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub kind: LandmarkKind,
    pub position: Point,
}

/// Ordered outline points of one facial feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    pub kind: ContourKind,
    pub points: Vec<Point>,
}

/// Classifier probabilities in `[0, 1]`; `None` when the detector did not run
/// the classifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub smiling: Option<f32>,
    pub left_eye_open: Option<f32>,
    pub right_eye_open: Option<f32>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.smiling.is_none() && self.left_eye_open.is_none() && self.right_eye_open.is_none()
    }
}

/// Head rotation in degrees around the image x, y and z axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPose {
    pub euler_x: f32,
    pub euler_y: f32,
    pub euler_z: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bounding_box: Rect,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub contours: Vec<Contour>,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub head_pose: HeadPose,
    #[serde(default)]
    pub tracking_id: Option<u32>,
}

impl DetectedFace {
    pub fn new(bounding_box: Rect) -> Self {
        Self {
            bounding_box,
            landmarks: Vec::new(),
            contours: Vec::new(),
            classification: Classification::default(),
            head_pose: HeadPose::default(),
            tracking_id: None,
        }
    }

    pub fn with_landmark(mut self, kind: LandmarkKind, position: Point) -> Self {
        self.landmarks.push(Landmark { kind, position });
        self
    }

    pub fn with_contour(mut self, kind: ContourKind, points: Vec<Point>) -> Self {
        self.contours.push(Contour { kind, points });
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn landmark(&self, kind: LandmarkKind) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.kind == kind)
    }

    pub fn contour(&self, kind: ContourKind) -> Option<&Contour> {
        self.contours.iter().find(|c| c.kind == kind)
    }
}
