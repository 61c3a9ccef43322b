use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::detection::domain::face_detector::{DetectionCompletion, DetectionResult, FaceDetector};
use crate::detection::domain::input_image::InputImage;
use crate::overlay::face_overlay::{FaceOverlay, FaceUpdate};
use crate::pipeline::analyzer_logger::{AnalyzerLogger, FrameEvent, NullAnalyzerLogger};
use crate::shared::config::{AnalyzerConfig, CompletionOrdering, GeometrySource};
use crate::shared::error::ConversionError;
use crate::shared::frame::CameraFrame;
use crate::shared::rotation::Rotation;

type SharedLogger = Arc<Mutex<Box<dyn AnalyzerLogger>>>;

/// What `on_frame` did with a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// Handed to the detector; the frame is released when detection settles.
    Submitted { sequence: u64 },
    /// Released immediately because `in_flight` detections were pending.
    Skipped { in_flight: usize },
    /// Released immediately; no detection attempted.
    ConversionFailed(ConversionError),
}

/// Feeds camera frames to an asynchronous detector and forwards the results
/// to the overlay.
///
/// `on_frame` takes `&mut self`: the camera delivers frames serially. It never
/// waits for a detection, so several may be in flight, each owning its frame
/// until it settles.
pub struct FrameAnalyzer {
    detector: Arc<dyn FaceDetector>,
    overlay: Arc<FaceOverlay>,
    config: AnalyzerConfig,
    in_flight: Arc<AtomicUsize>,
    next_sequence: u64,
    logger: SharedLogger,
}

impl FrameAnalyzer {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        overlay: Arc<FaceOverlay>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            detector,
            overlay,
            config,
            in_flight: Arc::new(AtomicUsize::new(0)),
            next_sequence: 0,
            logger: Arc::new(Mutex::new(Box::new(NullAnalyzerLogger))),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn AnalyzerLogger>) -> Self {
        self.logger = Arc::new(Mutex::new(logger));
        self
    }

    pub fn overlay(&self) -> &Arc<FaceOverlay> {
        &self.overlay
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Detections submitted but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn log_summary(&self) {
        lock_logger(&self.logger).summary();
    }

    pub fn on_frame(&mut self, frame: CameraFrame) -> AnalyzeOutcome {
        let index = frame.index();
        lock_logger(&self.logger).frame(index);

        let (width, height) = self.preview_dimensions(&frame);
        self.overlay.set_preview_geometry(width, height);

        if let Some(max) = self.config.max_in_flight {
            let in_flight = self.in_flight();
            if in_flight >= max {
                log::debug!("Skipping frame {index}: {in_flight} detections in flight");
                frame.close();
                lock_logger(&self.logger).event(FrameEvent::Skipped);
                return AnalyzeOutcome::Skipped { in_flight };
            }
        }

        let started = Instant::now();
        let image = match InputImage::from_camera_frame(&frame) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Dropping frame {index}: {e}");
                frame.close();
                lock_logger(&self.logger).event(FrameEvent::ConversionFailed);
                return AnalyzeOutcome::ConversionFailed(e);
            }
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        {
            let mut logger = lock_logger(&self.logger);
            logger.timing("convert", elapsed_ms(started));
            logger.event(FrameEvent::Submitted);
        }

        let pending = PendingDetection {
            frame,
            sequence,
            session: self.overlay.session(),
            submitted: Instant::now(),
            overlay: Arc::clone(&self.overlay),
            ordering: self.config.ordering,
            logger: Arc::clone(&self.logger),
            _slot: InFlightSlot::acquire(&self.in_flight),
        };
        lock_logger(&self.logger).metric("in_flight", self.in_flight() as f64);

        self.detector.detect_async(
            image,
            DetectionCompletion::new(move |result| pending.settle(result)),
        );

        AnalyzeOutcome::Submitted { sequence }
    }

    fn preview_dimensions(&self, frame: &CameraFrame) -> (u32, u32) {
        let (width, height) = (frame.width(), frame.height());
        match self.config.geometry_source {
            GeometrySource::Sensor => (width, height),
            GeometrySource::Upright => Rotation::from_degrees(frame.rotation_degrees())
                .map(|r| r.upright_dimensions(width, height))
                .unwrap_or((width, height)),
        }
    }
}

/// Everything a completion needs, owned so it can run on any thread.
struct PendingDetection {
    frame: CameraFrame,
    sequence: u64,
    session: u64,
    submitted: Instant,
    overlay: Arc<FaceOverlay>,
    ordering: CompletionOrdering,
    logger: SharedLogger,
    _slot: InFlightSlot,
}

impl PendingDetection {
    /// Success or failure handling first, frame release last.
    fn settle(self, result: DetectionResult) {
        let index = self.frame.index();
        let event = match result {
            Ok(faces) => {
                log::debug!("Frame {index}: {} faces detected", faces.len());
                lock_logger(&self.logger).metric("faces", faces.len() as f64);
                let update = FaceUpdate {
                    faces,
                    sequence: self.sequence,
                    session: self.session,
                };
                match self.overlay.apply_detection(update, self.ordering) {
                    Ok(()) => FrameEvent::Detected,
                    Err(stale) => {
                        log::debug!("Discarding detection for frame {index}: {stale}");
                        FrameEvent::Discarded
                    }
                }
            }
            Err(e) => {
                log::warn!("Face analysis failure on frame {index}: {e}");
                FrameEvent::DetectionFailed
            }
        };

        {
            let mut logger = lock_logger(&self.logger);
            logger.timing("detect", elapsed_ms(self.submitted));
            logger.timing("capture_to_result", elapsed_ms(self.frame.captured_at()));
            logger.event(event);
        }

        self.frame.close();
    }
}

/// Counts a detection as in flight for as long as it is alive.
struct InFlightSlot(Arc<AtomicUsize>);

impl InFlightSlot {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn lock_logger(logger: &SharedLogger) -> std::sync::MutexGuard<'_, Box<dyn AnalyzerLogger>> {
    logger.lock().unwrap_or_else(|e| e.into_inner())
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
