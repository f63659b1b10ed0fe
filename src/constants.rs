//! Constants used throughout the application

/// Upper bound (exclusive) of the 8-bit hue channel
pub const HUE_RANGE: u8 = 180;

/// Value a normalized histogram's largest bin maps to
pub const HISTOGRAM_MAX: f32 = 255.0;

/// Default number of hue histogram bins
pub const DEFAULT_HISTOGRAM_BINS: usize = 24;

/// Default live color thresholds
pub const DEFAULT_VMIN: i32 = 10;
pub const DEFAULT_VMAX: i32 = 256;
pub const DEFAULT_SMIN: i32 = 50;

/// Upper bound of every live color threshold slider
pub const THRESHOLD_SLIDER_MAX: i32 = 256;

/// Mean-shift termination defaults
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_EPSILON: f64 = 1.0;

/// Pixels the CamShift window grows by on each side before measuring orientation
pub const CAMSHIFT_TOLERANCE: i32 = 10;

/// Scene generation defaults
pub const DEFAULT_CUBE_COUNT: usize = 10;
pub const DEFAULT_MAX_CUBE_SIZE: i32 = 300;
pub const DEFAULT_MAX_DEPTH: f32 = 1000.0;

/// Depth of the virtual eye when the head is centered
pub const DEFAULT_BASE_DEPTH: f32 = 600.0;

/// Width of the rendered canvas
pub const DEFAULT_SCREEN_WIDTH: i32 = 1000;

/// Cascade detector parameters
pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;
pub const DEFAULT_MIN_NEIGHBORS: i32 = 2;
pub const DEFAULT_MIN_FACE_SIZE: i32 = 30;

/// Key code that ends the main loop
pub const KEY_ESCAPE: i32 = 27;
