use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::camera::domain::frame_source::{CameraFrameSource, SourceError};
use crate::camera::infrastructure::frame_pool::FramePool;
use crate::shared::frame::{CameraFrame, FrameLayout, PixelFormat};

/// How long `next_frame` waits for a free buffer before reporting a stall.
const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Camera stand-in that fills pooled buffers with a moving gradient.
///
/// Stops after `frame_count` frames, or with an error if no buffer is
/// released within the stall timeout.
pub struct SyntheticFrameSource {
    pool: Arc<FramePool>,
    layout: FrameLayout,
    frame_count: u64,
    next_index: u64,
    interval: Duration,
    stall_timeout: Duration,
    closed: bool,
}

impl SyntheticFrameSource {
    pub fn new(pool: Arc<FramePool>, layout: FrameLayout, frame_count: u64) -> Self {
        Self {
            pool,
            layout,
            frame_count,
            next_index: 0,
            interval: Duration::ZERO,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            closed: false,
        }
    }

    /// Delay between frames, to mimic a capture rate.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    pub fn pool(&self) -> &Arc<FramePool> {
        &self.pool
    }
}

impl CameraFrameSource for SyntheticFrameSource {
    fn next_frame(&mut self) -> Option<Result<CameraFrame, SourceError>> {
        if self.closed || self.next_index >= self.frame_count {
            return None;
        }
        if !self.interval.is_zero() && self.next_index > 0 {
            std::thread::sleep(self.interval);
        }

        let index = self.next_index;
        let Some(mut frame) = self
            .pool
            .acquire_timeout(self.layout, index, self.stall_timeout)
        else {
            return Some(Err(format!(
                "no frame buffer released within {:?}; {} buffers in use",
                self.stall_timeout,
                self.pool.capacity()
            )
            .into()));
        };
        self.next_index += 1;

        fill_gradient(&mut frame, index);
        Some(Ok(frame.with_captured_at(Instant::now())))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

fn fill_gradient(frame: &mut CameraFrame, index: u64) {
    let width = frame.width() as usize;
    let stride = match frame.format() {
        PixelFormat::Rgb8 => 3,
        PixelFormat::Rgba8 => 4,
        PixelFormat::Raw16 => 2,
        PixelFormat::Luma8 | PixelFormat::Nv21 => 1,
    };
    let shift = index as usize;
    for (i, byte) in frame.data_mut().iter_mut().enumerate() {
        let x = (i / stride) % width.max(1);
        *byte = ((x + shift) % 256) as u8;
    }
}
