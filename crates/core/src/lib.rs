//! Live camera face detection pipeline and overlay geometry.
//!
//! Frames flow `camera → FrameAnalyzer → FaceDetector → FaceOverlay`, and the
//! host's draw cycle paints the overlay onto a [`DrawingSurface`].
//!
//! [`DrawingSurface`]: overlay::domain::drawing_surface::DrawingSurface

pub mod camera {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detected_face;
        pub mod detector_options;
        pub mod face_detector;
        pub mod face_model;
        pub mod input_image;
    }
    pub mod infrastructure;
}

pub mod overlay {
    pub mod domain {
        pub mod drawing_surface;
    }
    pub mod coordinate_transform;
    pub mod face_overlay;
    pub mod infrastructure;
    pub mod overlay_state;
}

pub mod pipeline {
    pub mod analyzer_logger;
    pub mod camera_session;
    pub mod frame_analyzer;
}

pub mod shared {
    pub mod config;
    pub mod constants;
    pub mod error;
    pub mod frame;
    pub mod geometry;
    pub mod rotation;
}
