//! Configuration management for the head tracking display

use crate::{
    constants::{
        DEFAULT_BASE_DEPTH, DEFAULT_CUBE_COUNT, DEFAULT_EPSILON, DEFAULT_HISTOGRAM_BINS, DEFAULT_MAX_CUBE_SIZE,
        DEFAULT_MAX_DEPTH, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_FACE_SIZE, DEFAULT_MIN_NEIGHBORS,
        DEFAULT_SCALE_FACTOR, DEFAULT_SCREEN_WIDTH, DEFAULT_SMIN, DEFAULT_VMAX, DEFAULT_VMIN, HUE_RANGE,
        THRESHOLD_SLIDER_MAX,
    },
    controller::ControllerSettings,
    frame_processor::ColorThresholds,
    tracker::TermCriteria,
    world::SceneLayout,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Video capture configuration
    pub camera: CameraConfig,

    /// Head detector configuration
    pub detector: DetectorConfig,

    /// Color model configuration
    pub color: ColorConfig,

    /// Mean-shift configuration
    pub tracker: TrackerConfig,

    /// Scene generation configuration
    pub world: WorldConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Video capture configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device index
    pub index: i32,
}

/// Cascade detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the cascade classifier XML
    pub cascade_path: PathBuf,

    /// Image pyramid scale step (> 1.0)
    pub scale_factor: f64,

    /// Neighbouring hits required to keep a candidate
    pub min_neighbors: i32,

    /// Smallest head size in pixels
    pub min_size: i32,
}

/// Color model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Initial value threshold (0-256)
    pub vmin: i32,

    /// Initial value threshold (0-256), either order with `vmin`
    pub vmax: i32,

    /// Initial minimum saturation (0-256)
    pub smin: i32,

    /// Number of hue histogram bins (1-180)
    pub histogram_bins: usize,
}

/// Mean-shift termination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Iteration cap per tick
    pub max_iterations: usize,

    /// Movement below which iteration stops, in pixels
    pub epsilon: f64,
}

/// Scene generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Number of cubes
    pub cube_count: usize,

    /// Largest cube side
    pub max_cube_size: i32,

    /// Deepest cube position
    pub max_depth: f32,

    /// Eye depth with the head centered
    pub base_depth: f32,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rendered screen width; height follows the camera aspect ratio
    pub screen_width: i32,

    /// Main window title
    pub window_name: String,

    /// Show the target's hue histogram in a second window
    pub show_histogram: bool,

    /// Histogram window width
    pub histogram_width: usize,

    /// Histogram window height
    pub histogram_height: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cascade_path: PathBuf::from("./haarcascade_frontalface_alt.xml"),
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: DEFAULT_MIN_FACE_SIZE,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            vmin: DEFAULT_VMIN,
            vmax: DEFAULT_VMAX,
            smin: DEFAULT_SMIN,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cube_count: DEFAULT_CUBE_COUNT,
            max_cube_size: DEFAULT_MAX_CUBE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            base_depth: DEFAULT_BASE_DEPTH,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            screen_width: DEFAULT_SCREEN_WIDTH,
            window_name: "Tracker 3D".to_string(),
            show_histogram: false,
            histogram_width: 320,
            histogram_height: 200,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first out-of-range setting
    pub fn validate(&self) -> Result<()> {
        // Live thresholds share the slider range
        for (name, value) in [("vmin", self.color.vmin), ("vmax", self.color.vmax), ("smin", self.color.smin)] {
            if !(0..=THRESHOLD_SLIDER_MAX).contains(&value) {
                return Err(Error::ConfigError(format!(
                    "{name} must be between 0 and {THRESHOLD_SLIDER_MAX}, got {value}"
                )));
            }
        }
        if !(1..=usize::from(HUE_RANGE)).contains(&self.color.histogram_bins) {
            return Err(Error::ConfigError(format!(
                "Histogram bins must be between 1 and {HUE_RANGE}"
            )));
        }

        if self.tracker.max_iterations == 0 {
            return Err(Error::ConfigError("Tracker max_iterations must be greater than 0".to_string()));
        }
        if !(self.tracker.epsilon.is_finite() && self.tracker.epsilon >= 0.0) {
            return Err(Error::ConfigError("Tracker epsilon must be a non-negative number".to_string()));
        }

        if self.detector.scale_factor <= 1.0 {
            return Err(Error::ConfigError("Detector scale factor must be greater than 1.0".to_string()));
        }
        if self.detector.min_neighbors < 0 || self.detector.min_size < 0 {
            return Err(Error::ConfigError(
                "Detector min_neighbors and min_size must not be negative".to_string(),
            ));
        }

        if self.world.base_depth == 0.0 || !self.world.base_depth.is_finite() {
            return Err(Error::ConfigError("World base depth must be a non-zero number".to_string()));
        }
        if self.world.max_cube_size < 0 || self.world.max_depth < 0.0 {
            return Err(Error::ConfigError(
                "World cube size and depth must not be negative".to_string(),
            ));
        }

        if self.display.screen_width <= 0 {
            return Err(Error::ConfigError("Screen width must be greater than 0".to_string()));
        }
        if self.display.histogram_width == 0 || self.display.histogram_height == 0 {
            return Err(Error::ConfigError("Histogram window must not be empty".to_string()));
        }

        Ok(())
    }

    /// Initial live color thresholds
    #[must_use]
    pub const fn thresholds(&self) -> ColorThresholds {
        ColorThresholds {
            vmin: self.color.vmin,
            vmax: self.color.vmax,
            smin: self.color.smin,
        }
    }

    /// Mean-shift termination criteria
    #[must_use]
    pub const fn criteria(&self) -> TermCriteria {
        TermCriteria {
            max_iterations: self.tracker.max_iterations,
            epsilon: self.tracker.epsilon,
        }
    }

    /// Screen height for a camera producing `camera_width` x `camera_height` frames
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn screen_height(&self, camera_width: f64, camera_height: f64) -> usize {
        let width = f64::from(self.display.screen_width.max(0));
        if camera_width <= 0.0 || !camera_height.is_finite() {
            return (width * 0.75) as usize;
        }
        (width * camera_height / camera_width).max(1.0) as usize
    }

    /// Controller parameters for a screen of the given height
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn controller_settings(&self, screen_height: usize) -> ControllerSettings {
        ControllerSettings {
            thresholds: self.thresholds(),
            criteria: self.criteria(),
            histogram_bins: self.color.histogram_bins,
            screen_width: self.display.screen_width.max(0) as usize,
            screen_height,
            base_depth: self.world.base_depth,
        }
    }

    /// Layout of the generated scene for a screen of the given height
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn scene_layout(&self, screen_height: usize) -> SceneLayout {
        SceneLayout {
            width: self.display.screen_width as f32,
            height: screen_height as f32,
            cube_count: self.world.cube_count,
            max_cube_size: self.world.max_cube_size,
            max_depth: self.world.max_depth,
        }
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head Tracker 3D Configuration

# Video capture
camera:
  index: 0

# Cascade head detector
detector:
  cascade_path: "./haarcascade_frontalface_alt.xml"
  scale_factor: 1.1
  min_neighbors: 2
  min_size: 30

# Color model (thresholds are live-tunable from the window)
color:
  vmin: 10
  vmax: 256
  smin: 50
  histogram_bins: 24

# Mean-shift termination
tracker:
  max_iterations: 10
  epsilon: 1.0

# Generated scene
world:
  cube_count: 10
  max_cube_size: 300
  max_depth: 1000.0
  base_depth: 600.0

# Display settings
display:
  screen_width: 1000
  window_name: "Tracker 3D"
  show_histogram: false
  histogram_width: 320
  histogram_height: 200
"#;
