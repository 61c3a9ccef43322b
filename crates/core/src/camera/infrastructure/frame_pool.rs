use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::shared::frame::{CameraFrame, FrameLayout, FrameRecycler};

/// Fixed set of frame buffers shared between the camera and its consumers.
///
/// A frame holds one buffer until it is released. When every buffer is out
/// the camera cannot deliver another frame, which is the backpressure a
/// real capture device applies when its consumer never closes images.
pub struct FramePool {
    free_rx: Receiver<Vec<u8>>,
    recycler: Arc<PoolRecycler>,
    capacity: usize,
}

struct PoolRecycler {
    free_tx: Sender<Vec<u8>>,
}

impl FrameRecycler for PoolRecycler {
    fn recycle(&self, buffer: Vec<u8>) {
        // Full only if a foreign buffer was recycled here; drop it.
        let _ = self.free_tx.try_send(buffer);
    }
}

impl FramePool {
    pub fn new(capacity: usize, buffer_len: usize) -> Self {
        let capacity = capacity.max(1);
        let (free_tx, free_rx) = crossbeam_channel::bounded(capacity);
        for _ in 0..capacity {
            let _ = free_tx.try_send(vec![0u8; buffer_len]);
        }
        Self {
            free_rx,
            recycler: Arc::new(PoolRecycler { free_tx }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffers currently free.
    pub fn available(&self) -> usize {
        self.free_rx.len()
    }

    /// Blocks until a buffer is free.
    pub fn acquire(&self, layout: FrameLayout, index: u64) -> CameraFrame {
        // The pool holds a sender, so the channel never disconnects.
        let buffer = self.free_rx.recv().unwrap_or_default();
        self.wrap(buffer, layout, index)
    }

    pub fn try_acquire(&self, layout: FrameLayout, index: u64) -> Option<CameraFrame> {
        let buffer = self.free_rx.try_recv().ok()?;
        Some(self.wrap(buffer, layout, index))
    }

    pub fn acquire_timeout(
        &self,
        layout: FrameLayout,
        index: u64,
        timeout: Duration,
    ) -> Option<CameraFrame> {
        let buffer = self.free_rx.recv_timeout(timeout).ok()?;
        Some(self.wrap(buffer, layout, index))
    }

    fn wrap(&self, mut buffer: Vec<u8>, layout: FrameLayout, index: u64) -> CameraFrame {
        buffer.resize(layout.buffer_len(), 0);
        let recycler: Arc<dyn FrameRecycler> = self.recycler.clone();
        CameraFrame::pooled(buffer, layout, index, recycler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::PixelFormat;

    fn layout() -> FrameLayout {
        FrameLayout {
            width: 4,
            height: 2,
            format: PixelFormat::Rgb8,
            rotation_degrees: 0,
        }
    }

    #[test]
    fn test_new_pool_is_full() {
        let pool = FramePool::new(3, 24);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn test_zero_capacity_clamped_to_one() {
        assert_eq!(FramePool::new(0, 24).available(), 1);
    }

    #[test]
    fn test_acquired_frame_has_layout_size() {
        let pool = FramePool::new(1, 0);
        let frame = pool.acquire(layout(), 7);
        assert_eq!(frame.data().len(), 24);
        assert_eq!(frame.index(), 7);
    }

    #[test]
    fn test_exhausted_pool_refuses_frames() {
        let pool = FramePool::new(2, 24);
        let _a = pool.acquire(layout(), 0);
        let _b = pool.acquire(layout(), 1);

        assert_eq!(pool.available(), 0);
        assert!(pool.try_acquire(layout(), 2).is_none());
        assert!(pool
            .acquire_timeout(layout(), 2, Duration::from_millis(10))
            .is_none());
    }

    #[test]
    fn test_closing_frame_returns_buffer() {
        let pool = FramePool::new(1, 24);
        let frame = pool.acquire(layout(), 0);
        assert_eq!(pool.available(), 0);

        frame.close();
        assert_eq!(pool.available(), 1);
        assert!(pool.try_acquire(layout(), 1).is_some());
    }

    #[test]
    fn test_blocked_acquire_wakes_on_release() {
        let pool = Arc::new(FramePool::new(1, 24));
        let held = pool.acquire(layout(), 0);

        let waiter = {
            let pool = pool.clone();
            std::thread::spawn(move || pool.acquire(layout(), 1).index())
        };
        std::thread::sleep(Duration::from_millis(20));
        drop(held);

        assert_eq!(waiter.join().unwrap(), 1);
    }
}
