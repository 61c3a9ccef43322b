use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::detection::domain::detector_options::DetectorOptions;
use crate::overlay::domain::drawing_surface::{Color, Stroke};
use crate::overlay::overlay_state::CameraFacing;
use crate::shared::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_DETECTOR_QUEUE, DEFAULT_DETECTOR_WORKERS,
    DEFAULT_MAX_IN_FLIGHT, DEFAULT_POOL_SIZE,
};
use crate::shared::error::ConfigError;

/// How completions that finish out of submission order are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOrdering {
    /// Whichever completion reaches the overlay last wins.
    #[default]
    LastWriterWins,
    /// Completions older than the last applied frame sequence are dropped.
    DiscardStale,
}

/// Which dimensions the analyzer reports as the preview geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometrySource {
    /// Raw sensor buffer width and height.
    #[default]
    Sensor,
    /// Width and height after rotating the buffer upright.
    Upright,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// `None` disables the cap.
    pub max_in_flight: Option<usize>,
    pub ordering: CompletionOrdering,
    pub geometry_source: GeometrySource,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: Some(DEFAULT_MAX_IN_FLIGHT),
            ordering: CompletionOrdering::default(),
            geometry_source: GeometrySource::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub facing: CameraFacing,
    pub box_stroke: Stroke,
    pub landmark_stroke: Stroke,
    pub contour_stroke: Stroke,
    pub label_stroke: Stroke,
    pub draw_labels: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            facing: CameraFacing::Back,
            box_stroke: Stroke::new(Color::GREEN, 6.0),
            landmark_stroke: Stroke::new(Color::RED, 8.0),
            contour_stroke: Stroke::new(Color::YELLOW, 3.0),
            label_stroke: Stroke::new(Color::WHITE, 32.0),
            draw_labels: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analyzer: AnalyzerConfig,
    pub overlay: OverlayConfig,
    pub pool_size: usize,
    pub detector_workers: usize,
    pub detector_queue: usize,
    pub detector: DetectorOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            overlay: OverlayConfig::default(),
            pool_size: DEFAULT_POOL_SIZE,
            detector_workers: DEFAULT_DETECTOR_WORKERS,
            detector_queue: DEFAULT_DETECTOR_QUEUE,
            detector: DetectorOptions::default(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Loads from the default location, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => config,
            Err(ConfigError::Read { .. }) => Self::default(),
            Err(e) => {
                log::warn!("Ignoring config at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(write_err)
    }
}
