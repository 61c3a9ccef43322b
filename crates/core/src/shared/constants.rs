/// Detections allowed in flight before new frames are skipped.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 2;

/// Reusable camera buffers in the frame pool.
pub const DEFAULT_POOL_SIZE: usize = 4;

pub const DEFAULT_DETECTOR_WORKERS: usize = 2;

/// Pending jobs the threaded detector accepts before refusing new ones.
pub const DEFAULT_DETECTOR_QUEUE: usize = 8;

pub const CONFIG_DIR_NAME: &str = "FaceOverlay";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Smallest reported face, as a fraction of the image width.
pub const DEFAULT_MIN_FACE_SIZE: f32 = 0.15;
