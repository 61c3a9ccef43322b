pub mod replay_face_model;
pub mod threaded_face_detector;
