pub mod frame_pool;
pub mod synthetic_frame_source;
