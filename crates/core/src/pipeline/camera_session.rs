use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::camera::domain::frame_source::CameraFrameSource;
use crate::overlay::face_overlay::FaceOverlay;
use crate::pipeline::frame_analyzer::{AnalyzeOutcome, FrameAnalyzer};

/// Counts from one run of the camera thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub frames_delivered: u64,
    pub submitted: u64,
    pub skipped: u64,
    pub conversion_failed: u64,
    /// Detections still pending when the session stopped. Their frames are
    /// released when they settle.
    pub in_flight_at_stop: usize,
    /// Set when the source ended with an error instead of running dry.
    pub source_error: Option<String>,
}

/// Drives a frame source into a [`FrameAnalyzer`] on a dedicated thread.
///
/// Layout: `camera thread [next_frame → on_frame] → detector → overlay`
pub struct CameraSession {
    cancelled: Arc<AtomicBool>,
    done_rx: Receiver<()>,
    handle: JoinHandle<(FrameAnalyzer, SessionReport)>,
    overlay: Arc<FaceOverlay>,
}

impl CameraSession {
    pub fn start(
        source: Box<dyn CameraFrameSource>,
        analyzer: FrameAnalyzer,
    ) -> std::io::Result<Self> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let overlay = Arc::clone(analyzer.overlay());

        let handle = {
            let cancelled = Arc::clone(&cancelled);
            std::thread::Builder::new()
                .name("camera".into())
                .spawn(move || {
                    let finished = run_camera_loop(source, analyzer, &cancelled);
                    let _ = done_tx.send(());
                    finished
                })?
        };
        log::info!("Camera session started");

        Ok(Self {
            cancelled,
            done_rx,
            handle,
            overlay,
        })
    }

    pub fn overlay(&self) -> &Arc<FaceOverlay> {
        &self.overlay
    }

    /// Waits for the source to run dry. Returns `false` on timeout.
    pub fn wait_for_source(&self, timeout: Duration) -> bool {
        self.handle.is_finished() || self.done_rx.recv_timeout(timeout).is_ok()
    }

    /// Stops capture, waits for the camera thread and invalidates
    /// detections still in flight.
    pub fn stop(self) -> Result<SessionReport, Box<dyn std::error::Error>> {
        self.cancelled.store(true, Ordering::Relaxed);
        let (analyzer, mut report) = self
            .handle
            .join()
            .map_err(|_| "camera thread panicked")?;

        report.in_flight_at_stop = analyzer.in_flight();
        analyzer.log_summary();
        self.overlay.stop_session();

        log::info!(
            "Camera session stopped: {} frames, {} submitted, {} skipped, {} in flight",
            report.frames_delivered,
            report.submitted,
            report.skipped,
            report.in_flight_at_stop
        );
        Ok(report)
    }
}

fn run_camera_loop(
    mut source: Box<dyn CameraFrameSource>,
    mut analyzer: FrameAnalyzer,
    cancelled: &AtomicBool,
) -> (FrameAnalyzer, SessionReport) {
    let mut report = SessionReport::default();

    while !cancelled.load(Ordering::Relaxed) {
        let frame = match source.next_frame() {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                log::error!("Camera source failed: {e}");
                report.source_error = Some(e.to_string());
                break;
            }
            None => break,
        };
        report.frames_delivered += 1;

        match analyzer.on_frame(frame) {
            AnalyzeOutcome::Submitted { .. } => report.submitted += 1,
            AnalyzeOutcome::Skipped { .. } => report.skipped += 1,
            AnalyzeOutcome::ConversionFailed(_) => report.conversion_failed += 1,
        }
    }

    source.close();
    (analyzer, report)
}
