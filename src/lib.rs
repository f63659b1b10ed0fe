//! Head-tracked parallax display.
//!
//! A head is located once by a detector, then followed frame to frame by CamShift
//! over a hue histogram of its appearance. The tracked position becomes the virtual
//! eye from which a wireframe scene of cubes is projected, so the scene shifts with
//! the viewer's head like a window.
//!
//! The pipeline for one tick:
//! 1. [`frame_processor`] turns a BGR frame into a hue channel and a validity mask
//! 2. [`color_model`] holds the target's hue histogram and back-projects it
//! 3. [`tracker`] moves the search window onto the target and recovers from collapse
//! 4. [`projection`] derives the eye and draws the [`world`] scene onto a [`canvas`]
//!
//! [`controller`] sequences these per mode, driven by key and pointer input.
//!
//! # Examples
//!
//! ## Tracking a colored patch
//!
//! ```
//! use head_parallax::{
//!     frame_processor::{Frame, FrameProcessor},
//!     geometry::Region,
//!     tracker::{RegionTracker, TermCriteria},
//! };
//! use ndarray::s;
//!
//! # fn main() -> head_parallax::Result<()> {
//! let mut frame = Frame::filled(160, 120, [128, 128, 128]);
//! frame
//!     .pixels_mut()
//!     .slice_mut(s![40..70, 60..90, ..])
//!     .assign(&ndarray::arr1(&[0u8, 0, 255]));
//!
//! let processed = FrameProcessor::default().process(&frame).expect("frame has pixels");
//! let mut tracker = RegionTracker::new(TermCriteria::default(), 16);
//! tracker.lock(&processed, Region::new(60, 40, 30, 30))?;
//!
//! let outcome = tracker.track(&processed)?;
//! assert!((outcome.tracked.center.x - 75.0).abs() <= 1.5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Rendering the scene from a viewpoint
//!
//! ```
//! use head_parallax::{
//!     projection::SceneRenderer,
//!     world::{Scene, SceneLayout},
//! };
//! use nalgebra::Point3;
//!
//! let layout = SceneLayout {
//!     width: 640.0,
//!     height: 480.0,
//!     cube_count: 10,
//!     max_cube_size: 300,
//!     max_depth: 1000.0,
//! };
//! let scene = Scene::generate(&mut rand::thread_rng(), &layout);
//! let canvas = SceneRenderer::new(640, 480).render(&scene, &Point3::new(320.0, 240.0, 600.0));
//! assert_eq!(canvas.width(), 640);
//! ```

/// Rectangles, oriented rectangles and colors
pub mod geometry;

/// Per-frame hue and validity mask extraction
pub mod frame_processor;

/// Hue histogram of the target and its back-projection
pub mod color_model;

/// CamShift tracking with collapse recovery
pub mod tracker;

/// Head detector boundary and target selection
pub mod detector;

/// Procedurally generated wireframe scene
pub mod world;

/// Viewpoint projection and scene rendering
pub mod projection;

/// BGR raster for rendered views
pub mod canvas;

/// Mode state machine driven by key and pointer input
pub mod controller;

/// Utility functions for numeric casts and `OpenCV` interop
pub mod utils;

/// Error types and result handling
pub mod error;

/// Camera and GUI main loop
#[cfg(feature = "opencv")]
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

/// Command-line arguments
pub mod cli;

pub use error::{Error, Result};
