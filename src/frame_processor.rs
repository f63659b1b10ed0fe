//! Per-tick conversion of a color frame into a hue channel and a validity mask.

use crate::{
    constants::{DEFAULT_SMIN, DEFAULT_VMAX, DEFAULT_VMIN, HUE_RANGE},
    Error, Result,
};
use log::warn;
use ndarray::{Array2, Array3, Axis, Zip};
#[cfg(not(feature = "opencv"))]
use ndarray::ArrayView1;

/// Color frame in BGR channel order, shaped `(rows, cols, 3)`
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Array3<u8>,
}

impl Frame {
    /// Wrap a `(rows, cols, 3)` BGR array
    ///
    /// # Errors
    ///
    /// Returns an error if the array does not have exactly three channels
    pub fn from_bgr(pixels: Array3<u8>) -> Result<Self> {
        if pixels.dim().2 != 3 {
            return Err(Error::InvalidInput(format!(
                "Expected 3 color channels, got {}",
                pixels.dim().2
            )));
        }
        Ok(Self { pixels })
    }

    /// Frame filled with one color
    #[must_use]
    pub fn filled(width: usize, height: usize, bgr: [u8; 3]) -> Self {
        let pixels = Array3::from_shape_fn((height, width, 3), |(_, _, c)| bgr[c]);
        Self { pixels }
    }

    /// Frame with no pixels, as returned by a failed capture
    #[must_use]
    pub fn empty() -> Self {
        Self {
            pixels: Array3::zeros((0, 0, 3)),
        }
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    /// True when the capture produced no pixels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Underlying BGR array
    #[must_use]
    pub const fn pixels(&self) -> &Array3<u8> {
        &self.pixels
    }

    /// Mutable access to the underlying BGR array
    pub fn pixels_mut(&mut self) -> &mut Array3<u8> {
        &mut self.pixels
    }
}

/// Live saturation/value thresholds deciding which pixels carry a usable hue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorThresholds {
    /// One end of the accepted value range
    pub vmin: i32,
    /// Other end of the accepted value range
    pub vmax: i32,
    /// Minimum accepted saturation
    pub smin: i32,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            vmin: DEFAULT_VMIN,
            vmax: DEFAULT_VMAX,
            smin: DEFAULT_SMIN,
        }
    }
}

impl ColorThresholds {
    /// True when a pixel with this saturation and value belongs to the mask.
    /// The value bounds are accepted in either order.
    #[must_use]
    pub fn accepts(&self, saturation: u8, value: u8) -> bool {
        let low = self.vmin.min(self.vmax);
        let high = self.vmin.max(self.vmax);
        let s = i32::from(saturation);
        let v = i32::from(value);
        s >= self.smin && v >= low && v <= high
    }
}

/// Derived per-frame grids consumed by the tracker
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFrame {
    /// Hue of every pixel, in [0, 180)
    pub hue: Array2<u8>,
    /// 255 where the pixel passes the thresholds, 0 elsewhere
    pub mask: Array2<u8>,
}

impl ProcessedFrame {
    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> usize {
        self.hue.ncols()
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> usize {
        self.hue.nrows()
    }
}

/// Converts raw frames into hue + mask using live thresholds
#[derive(Debug, Clone, Default)]
pub struct FrameProcessor {
    thresholds: ColorThresholds,
}

impl FrameProcessor {
    /// Create a processor with initial thresholds
    #[must_use]
    pub const fn new(thresholds: ColorThresholds) -> Self {
        Self { thresholds }
    }

    /// Current thresholds
    #[must_use]
    pub const fn thresholds(&self) -> ColorThresholds {
        self.thresholds
    }

    /// Replace the thresholds; applies from the next call to [`Self::process`]
    pub fn set_thresholds(&mut self, thresholds: ColorThresholds) {
        self.thresholds = thresholds;
    }

    /// Convert a frame into its hue channel and validity mask.
    ///
    /// Returns `None` for an empty frame so the caller can skip the tick.
    #[must_use]
    pub fn process(&self, frame: &Frame) -> Option<ProcessedFrame> {
        if frame.is_empty() {
            return None;
        }

        let hsv = match hsv_planes(frame) {
            Ok(hsv) => hsv,
            Err(e) => {
                warn!("Skipping frame, HSV conversion failed: {e}");
                return None;
            }
        };

        let hue = hsv.index_axis(Axis(2), 0).to_owned();
        let mask = Zip::from(hsv.lanes(Axis(2))).map_collect(|px| {
            if self.thresholds.accepts(px[1], px[2]) {
                255
            } else {
                0
            }
        });

        Some(ProcessedFrame { hue, mask })
    }
}

/// Frame converted to 8-bit HSV planes, shaped `(rows, cols, 3)`
#[cfg(feature = "opencv")]
fn hsv_planes(frame: &Frame) -> Result<Array3<u8>> {
    use crate::utils::image_conversion::{frame_to_mat, mat_to_array};
    use opencv::{core::Mat, imgproc};

    let bgr = frame_to_mat(frame)?;
    let mut hsv = Mat::default();
    imgproc::cvt_color(&bgr, &mut hsv, imgproc::COLOR_BGR2HSV, 0)?;
    mat_to_array(&hsv)
}

/// Frame converted to 8-bit HSV planes, shaped `(rows, cols, 3)`
#[cfg(not(feature = "opencv"))]
#[allow(clippy::unnecessary_wraps)]
fn hsv_planes(frame: &Frame) -> Result<Array3<u8>> {
    let mut hsv = Array3::zeros(frame.pixels().dim());
    Zip::from(hsv.lanes_mut(Axis(2)))
        .and(frame.pixels().lanes(Axis(2)))
        .for_each(|mut out, bgr| {
            let (h, s, v) = bgr_to_hsv(bgr);
            out[0] = h;
            out[1] = s;
            out[2] = v;
        });
    Ok(hsv)
}

/// 8-bit HSV of one BGR pixel: hue in [0, 180), saturation and value in [0, 255]
///
/// Matches `COLOR_BGR2HSV` for builds without `OpenCV`.
#[cfg(not(feature = "opencv"))]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bgr_to_hsv(bgr: ArrayView1<'_, u8>) -> (u8, u8, u8) {
    let b = i32::from(bgr[0]);
    let g = i32::from(bgr[1]);
    let r = i32::from(bgr[2]);

    let value = b.max(g).max(r);
    let diff = value - b.min(g).min(r);

    let saturation = if value == 0 {
        0
    } else {
        (255.0 * diff as f32 / value as f32).round() as i32
    };

    let hue = if diff == 0 {
        0
    } else {
        // Hue in units of diff, 0..6 sectors of 60 degrees, then halved to 8-bit
        let sector = if value == r {
            g - b
        } else if value == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        let h = (30.0 * sector as f32 / diff as f32 + 0.5).floor() as i32;
        if h < 0 {
            h + i32::from(HUE_RANGE)
        } else {
            h
        }
    };

    (hue as u8, saturation as u8, value as u8)
}
