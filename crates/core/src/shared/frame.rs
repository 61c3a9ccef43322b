use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Pixel layout of a camera buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    Luma8,
    /// Y plane followed by interleaved V/U at half resolution.
    Nv21,
    /// Undemosaiced 16-bit sensor data.
    Raw16,
}

impl PixelFormat {
    /// Bytes needed for a `width x height` image in this format.
    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            Self::Rgb8 => w * h * 3,
            Self::Rgba8 => w * h * 4,
            Self::Luma8 => w * h,
            Self::Nv21 => w * h + w.div_ceil(2) * h.div_ceil(2) * 2,
            Self::Raw16 => w * h * 2,
        }
    }
}

/// Receives buffers back from released frames.
pub trait FrameRecycler: Send + Sync {
    fn recycle(&self, buffer: Vec<u8>);
}

/// Shape of a camera buffer: dimensions, layout and the rotation the camera
/// reports for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Raw value reported by the camera; validated at conversion time.
    pub rotation_degrees: i32,
}

impl FrameLayout {
    pub fn buffer_len(&self) -> usize {
        self.format.buffer_len(self.width, self.height)
    }
}

/// One captured camera image, exclusively owned while in flight.
///
/// Dropping the frame (or calling [`CameraFrame::close`]) releases the buffer
/// to its recycler. Ownership makes the release happen exactly once on every
/// path.
pub struct CameraFrame {
    data: Vec<u8>,
    layout: FrameLayout,
    index: u64,
    captured_at: Instant,
    recycler: Option<Arc<dyn FrameRecycler>>,
}

impl CameraFrame {
    pub fn new(data: Vec<u8>, layout: FrameLayout, index: u64) -> Self {
        Self {
            data,
            layout,
            index,
            captured_at: Instant::now(),
            recycler: None,
        }
    }

    /// A frame whose buffer goes back to `recycler` on release.
    pub fn pooled(
        data: Vec<u8>,
        layout: FrameLayout,
        index: u64,
        recycler: Arc<dyn FrameRecycler>,
    ) -> Self {
        Self {
            data,
            layout,
            index,
            captured_at: Instant::now(),
            recycler: Some(recycler),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn width(&self) -> u32 {
        self.layout.width
    }

    pub fn height(&self) -> u32 {
        self.layout.height
    }

    pub fn format(&self) -> PixelFormat {
        self.layout.format
    }

    pub fn rotation_degrees(&self) -> i32 {
        self.layout.rotation_degrees
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// When the sensor captured the image. Defaults to construction time.
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn with_captured_at(mut self, captured_at: Instant) -> Self {
        self.captured_at = captured_at;
        self
    }

    /// Releases the buffer back to the camera.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for CameraFrame {
    fn drop(&mut self) {
        if let Some(recycler) = self.recycler.take() {
            recycler.recycle(std::mem::take(&mut self.data));
        }
    }
}

impl fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraFrame")
            .field("layout", &self.layout)
            .field("index", &self.index)
            .field("captured_at", &self.captured_at)
            .field("len", &self.data.len())
            .field("pooled", &self.recycler.is_some())
            .finish()
    }
}
