use std::collections::HashMap;
use std::time::Instant;

/// What happened to a frame or its detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameEvent {
    Submitted,
    Skipped,
    ConversionFailed,
    Detected,
    DetectionFailed,
    Discarded,
}

impl FrameEvent {
    fn label(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Skipped => "skipped",
            Self::ConversionFailed => "conversion_failed",
            Self::Detected => "detected",
            Self::DetectionFailed => "detection_failed",
            Self::Discarded => "discarded",
        }
    }
}

/// Observer for analyzer activity.
///
/// Called from the camera thread and from detection completions; the
/// analyzer serializes calls behind a mutex.
pub trait AnalyzerLogger: Send {
    /// A frame arrived from the camera.
    fn frame(&mut self, index: u64);

    fn event(&mut self, event: FrameEvent);

    /// How long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time measurement (e.g. in-flight detections, face count).
    fn metric(&mut self, name: &str, value: f64);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Default for hosts with their own telemetry.
pub struct NullAnalyzerLogger;

impl AnalyzerLogger for NullAnalyzerLogger {
    fn frame(&mut self, _index: u64) {}
    fn event(&mut self, _event: FrameEvent) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
}

/// Running aggregate of one named timing or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SampleStats {
    pub count: u64,
    pub sum: f64,
    pub max: f64,
}

impl SampleStats {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Accumulates stage timings, metrics and event counts and reports them
/// through the `log` facade.
///
/// Samples are folded into per-name aggregates, so memory stays bounded
/// over an endless camera stream. Progress is logged every
/// `throttle_frames` frames.
pub struct StdoutAnalyzerLogger {
    throttle_frames: u64,
    frames: u64,
    events: HashMap<FrameEvent, usize>,
    timings: HashMap<String, SampleStats>,
    metrics: HashMap<String, SampleStats>,
    start_time: Instant,
}

impl StdoutAnalyzerLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            frames: 0,
            events: HashMap::new(),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn count(&self, event: FrameEvent) -> usize {
        self.events.get(&event).copied().unwrap_or(0)
    }

    pub fn timings_for(&self, stage: &str) -> Option<SampleStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<SampleStats> {
        self.metrics.get(name).copied()
    }

    /// Returns the formatted summary, or `None` before the first frame.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Analyzer summary ({} frames, {elapsed_s:.1}s):",
            self.frames
        )];

        let mut events: Vec<_> = self.events.iter().collect();
        events.sort();
        for (event, count) in events {
            lines.push(format!("  {:18}: {count}", event.label()));
        }

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, stats) in stages {
            lines.push(format!(
                "  {stage:18}: avg {:6.1}ms  max {:6.1}ms",
                stats.mean(),
                stats.max
            ));
        }

        let mut names: Vec<_> = self.metrics.iter().collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        for (name, stats) in names {
            lines.push(format!("  {name}: avg {:.1}", stats.mean()));
        }

        if elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames as f64 / elapsed_s
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StdoutAnalyzerLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl AnalyzerLogger for StdoutAnalyzerLogger {
    fn frame(&mut self, _index: u64) {
        self.frames += 1;
        if self.frames % self.throttle_frames == 0 {
            log::info!(
                "Analyzed {} frames, {} faces applied, {} skipped",
                self.frames,
                self.count(FrameEvent::Detected),
                self.count(FrameEvent::Skipped)
            );
        }
    }

    fn event(&mut self, event: FrameEvent) {
        *self.events.entry(event).or_default() += 1;
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        match self.timings.get_mut(stage) {
            Some(stats) => stats.record(duration_ms),
            None => {
                let mut stats = SampleStats::default();
                stats.record(duration_ms);
                self.timings.insert(stage.to_string(), stats);
            }
        }
    }

    fn metric(&mut self, name: &str, value: f64) {
        match self.metrics.get_mut(name) {
            Some(stats) => stats.record(value),
            None => {
                let mut stats = SampleStats::default();
                stats.record(value);
                self.metrics.insert(name.to_string(), stats);
            }
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
