use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use faceoverlay_core::camera::infrastructure::frame_pool::FramePool;
use faceoverlay_core::camera::infrastructure::synthetic_frame_source::SyntheticFrameSource;
use faceoverlay_core::detection::domain::face_model::FaceModel;
use faceoverlay_core::detection::infrastructure::replay_face_model::{
    ReplayFaceModel, ReplayScript,
};
use faceoverlay_core::detection::infrastructure::threaded_face_detector::ThreadedFaceDetector;
use faceoverlay_core::overlay::face_overlay::FaceOverlay;
use faceoverlay_core::overlay::infrastructure::recording_surface::{DrawOp, RecordingSurface};
use faceoverlay_core::overlay::overlay_state::CameraFacing;
use faceoverlay_core::pipeline::analyzer_logger::StdoutAnalyzerLogger;
use faceoverlay_core::pipeline::camera_session::CameraSession;
use faceoverlay_core::pipeline::frame_analyzer::FrameAnalyzer;
use faceoverlay_core::shared::config::{AppConfig, CompletionOrdering};
use faceoverlay_core::shared::frame::{FrameLayout, PixelFormat};
use faceoverlay_core::shared::rotation::Rotation;

/// How long to wait for the synthetic camera to deliver every frame.
const SOURCE_TIMEOUT: Duration = Duration::from_secs(60);

/// Replays scripted face detections through the live overlay pipeline and
/// prints what the final draw tick paints.
#[derive(Parser)]
#[command(name = "faceoverlay")]
struct Cli {
    /// JSON detection script (frames keyed by index).
    script: PathBuf,

    /// Number of camera frames to generate.
    #[arg(long, default_value = "30")]
    frames: u64,

    /// Sensor frame width in pixels.
    #[arg(long, default_value = "640")]
    width: u32,

    /// Sensor frame height in pixels.
    #[arg(long, default_value = "480")]
    height: u32,

    /// Sensor rotation in degrees (0, 90, 180 or 270).
    #[arg(long, default_value = "0")]
    rotation: i32,

    /// Treat the camera as front-facing (mirrored overlay).
    #[arg(long)]
    front: bool,

    /// Drawing surface size, e.g. 1080x1920.
    #[arg(long, default_value = "1080x1920", value_parser = parse_size)]
    surface: (u32, u32),

    /// Maximum detections in flight (0 = unlimited).
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Ignore detections that finish after a newer one was applied.
    #[arg(long)]
    discard_stale: bool,

    /// Detector worker threads.
    #[arg(long)]
    workers: Option<usize>,

    /// Smallest face to report, as a fraction of the image width.
    #[arg(long)]
    min_face_size: Option<f32>,

    /// Config file (defaults to the user config directory).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    Rotation::from_degrees(cli.rotation)?;

    let config = load_config(&cli)?;
    let script = ReplayScript::load(&cli.script)?;
    log::info!(
        "Loaded {} scripted frames from {}",
        script.frames.len(),
        cli.script.display()
    );

    let model = ReplayFaceModel::new(script);
    let detector = ThreadedFaceDetector::new(
        config.detector_workers,
        config.detector_queue,
        |_| Box::new(model.clone()) as Box<dyn FaceModel>,
    )?;
    let detector = Arc::new(detector.with_options(config.detector));

    let overlay = Arc::new(FaceOverlay::new(config.overlay.clone()));
    overlay.set_surface_size(cli.surface.0, cli.surface.1);
    let analyzer = FrameAnalyzer::new(detector.clone(), overlay.clone(), config.analyzer.clone())
        .with_logger(Box::new(StdoutAnalyzerLogger::default()));

    let layout = FrameLayout {
        width: cli.width,
        height: cli.height,
        format: PixelFormat::Nv21,
        rotation_degrees: cli.rotation,
    };
    let pool = Arc::new(FramePool::new(config.pool_size, layout.buffer_len()));
    let source = SyntheticFrameSource::new(pool, layout, cli.frames);

    let session = CameraSession::start(Box::new(source), analyzer)?;
    if !session.wait_for_source(SOURCE_TIMEOUT) {
        log::warn!("Camera did not finish within {SOURCE_TIMEOUT:?}; stopping early");
    }
    // Let every queued detection settle before the final draw.
    detector.shutdown();

    let mut surface = RecordingSurface::new(cli.surface.0, cli.surface.1);
    overlay.draw(&mut surface);
    print_ops(&surface);

    let report = session.stop()?;
    println!(
        "frames={} submitted={} skipped={} conversion_failed={}",
        report.frames_delivered, report.submitted, report.skipped, report.conversion_failed
    );
    if let Some(error) = report.source_error {
        return Err(error.into());
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(),
    };

    if let Some(max) = cli.max_in_flight {
        config.analyzer.max_in_flight = (max > 0).then_some(max);
    }
    if cli.discard_stale {
        config.analyzer.ordering = CompletionOrdering::DiscardStale;
    }
    if let Some(workers) = cli.workers {
        config.detector_workers = workers;
    }
    if let Some(min_face_size) = cli.min_face_size {
        config.detector.min_face_size = min_face_size;
    }
    if cli.front {
        config.overlay.facing = CameraFacing::Front;
    }
    log_config_source(cli.config.as_deref());
    Ok(config)
}

fn log_config_source(path: Option<&Path>) {
    match path.map(Path::to_path_buf).or_else(AppConfig::default_path) {
        Some(path) => log::debug!("Config: {}", path.display()),
        None => log::debug!("Config: built-in defaults"),
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid dimension '{v}': {e}"))
    };
    Ok((parse(w)?, parse(h)?))
}

fn print_ops(surface: &RecordingSurface) {
    for op in surface.ops() {
        match op {
            DrawOp::Rect(r, _) => println!(
                "rect {:.1} {:.1} {:.1} {:.1}",
                r.left, r.top, r.right, r.bottom
            ),
            DrawOp::Point(p, _) => println!("point {:.1} {:.1}", p.x, p.y),
            DrawOp::Polyline(points, _) => println!("polyline {} points", points.len()),
            DrawOp::Text(p, text) => println!("text {:.1} {:.1} {text}", p.x, p.y),
        }
    }
}
