//! Command-line arguments and how they override the configuration file.

use crate::config::Config;
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

/// Head-tracked parallax display
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "head-parallax", author, version, about, long_about = None)]
pub struct Args {
    /// Camera index to use
    #[arg(long)]
    pub cam: Option<i32>,

    /// Video file to play instead of a camera
    #[arg(short, long, conflicts_with = "cam")]
    pub video: Option<PathBuf>,

    /// Cascade classifier XML used for head detection
    #[arg(long)]
    pub cascade: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Number of hue histogram bins
    #[arg(long)]
    pub bins: Option<usize>,

    /// Show the target's hue histogram in a second window
    #[arg(long)]
    pub show_histogram: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Write the effective configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub write_config: Option<PathBuf>,
}

impl Args {
    /// Default log filter for `env_logger`
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Configuration from `--config`, or defaults when absent or unreadable
    #[must_use]
    pub fn load_config(&self) -> Config {
        let Some(path) = &self.config else {
            return Config::default();
        };
        info!("Loading configuration from: {}", path.display());
        Config::from_file(path).unwrap_or_else(|e| {
            warn!("Failed to load config file: {e}. Using defaults.");
            Config::default()
        })
    }

    /// Apply command-line values on top of `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(cam) = self.cam {
            config.camera.index = cam;
        }
        if let Some(cascade) = &self.cascade {
            config.detector.cascade_path.clone_from(cascade);
        }
        if let Some(bins) = self.bins {
            config.color.histogram_bins = bins;
        }
        if self.show_histogram {
            config.display.show_histogram = true;
        }
    }

    /// Loaded configuration with command-line overrides applied
    #[must_use]
    pub fn effective_config(&self) -> Config {
        let mut config = self.load_config();
        self.apply(&mut config);
        config
    }
}
