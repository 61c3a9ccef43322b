pub mod recording_surface;
