use std::sync::Mutex;
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, TrySendError};

use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::{DetectionCompletion, FaceDetector};
use crate::detection::domain::face_model::FaceModel;
use crate::detection::domain::input_image::InputImage;
use crate::shared::error::DetectionError;

struct DetectionJob {
    image: InputImage,
    options: DetectorOptions,
    completion: DetectionCompletion,
}

/// Runs blocking [`FaceModel`]s on dedicated worker threads.
///
/// Layout: `detect_async → bounded queue → N workers (one model each)`
///
/// Submission never blocks: when the queue is full or the detector has been
/// shut down the completion settles immediately with
/// [`DetectionError::Unavailable`]. Workers finish independently, so
/// completions can arrive out of submission order. Model output passes
/// through the configured [`DetectorOptions`] before it is delivered.
pub struct ThreadedFaceDetector {
    job_tx: Mutex<Option<Sender<DetectionJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    options: DetectorOptions,
}

impl ThreadedFaceDetector {
    /// Spawns `workers` threads, each owning the model built by `factory(worker_index)`.
    pub fn new<F>(workers: usize, queue_capacity: usize, factory: F) -> std::io::Result<Self>
    where
        F: Fn(usize) -> Box<dyn FaceModel>,
    {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<DetectionJob>(queue_capacity.max(1));

        let mut handles = Vec::with_capacity(workers.max(1));
        for worker in 0..workers.max(1) {
            let mut model = factory(worker);
            let job_rx = job_rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("face-detector-{worker}"))
                .spawn(move || {
                    for job in job_rx {
                        let width = job.image.width();
                        let result = model
                            .detect(&job.image)
                            .map(|faces| job.options.apply(faces, width))
                            .map_err(|e| DetectionError::Failed(e.to_string()));
                        job.completion.complete(result);
                    }
                })?;
            handles.push(handle);
        }

        Ok(Self {
            job_tx: Mutex::new(Some(job_tx)),
            workers: Mutex::new(handles),
            options: DetectorOptions::default(),
        })
    }

    pub fn with_options(mut self, options: DetectorOptions) -> Self {
        self.options = options;
        self
    }

    /// Stops accepting work, lets the workers drain queued jobs and joins them.
    pub fn shutdown(&self) {
        self.job_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        let handles: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Face detector worker panicked");
            }
        }
    }

    /// Jobs waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.job_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(0, |tx| tx.len())
    }
}

impl FaceDetector for ThreadedFaceDetector {
    fn detect_async(&self, image: InputImage, completion: DetectionCompletion) {
        let job = DetectionJob {
            image,
            options: self.options,
            completion,
        };
        let rejected = {
            let guard = self.job_tx.lock().unwrap_or_else(|e| e.into_inner());
            match guard.as_ref() {
                Some(tx) => match tx.try_send(job) {
                    Ok(()) => None,
                    Err(TrySendError::Full(job)) => Some((job, "detection queue is full")),
                    Err(TrySendError::Disconnected(job)) => Some((job, "detector workers exited")),
                },
                None => Some((job, "detector has been shut down")),
            }
        };

        if let Some((job, reason)) = rejected {
            job.completion
                .complete(Err(DetectionError::Unavailable(reason.to_string())));
        }
    }
}

impl Drop for ThreadedFaceDetector {
    fn drop(&mut self) {
        self.shutdown();
    }
}
