//! Hue histogram of a tracked target and its back-projection over a frame.

use crate::{
    canvas::Canvas,
    constants::{HISTOGRAM_MAX, HUE_RANGE},
    frame_processor::ProcessedFrame,
    geometry::{Color, Region},
    utils::safe_cast::{f32_to_i32_clamp, i32_to_usize, usize_to_i32},
    Error, Result,
};
use ndarray::{s, Array2, Zip};

/// Normalized hue histogram with a fixed number of equal-width bins over [0, 180)
#[derive(Debug, Clone, PartialEq)]
pub struct ColorHistogram {
    bins: Vec<f32>,
}

impl ColorHistogram {
    /// Build the histogram of `region`, counting only pixels where the mask is set,
    /// then min-max normalize it to [0, 255].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `bin_count` is zero or wider than the hue range
    /// - `region` has no pixels inside the frame
    pub fn build(processed: &ProcessedFrame, region: Region, bin_count: usize) -> Result<Self> {
        if bin_count == 0 || bin_count > usize::from(HUE_RANGE) {
            return Err(Error::InvalidInput(format!(
                "Histogram bin count must be in 1..={HUE_RANGE}, got {bin_count}"
            )));
        }

        let width = usize_to_i32(processed.width())?;
        let height = usize_to_i32(processed.height())?;
        let roi = region.clip_to(width, height);
        if roi.is_empty() {
            return Err(Error::DegenerateRegion(format!(
                "Cannot build a color model over {region:?} in a {width}x{height} frame"
            )));
        }

        let rows = i32_to_usize(roi.y)?..i32_to_usize(roi.bottom())?;
        let cols = i32_to_usize(roi.x)?..i32_to_usize(roi.right())?;
        let hue = processed.hue.slice(s![rows.clone(), cols.clone()]);
        let mask = processed.mask.slice(s![rows, cols]);

        let mut bins = vec![0.0_f32; bin_count];
        Zip::from(&hue).and(&mask).for_each(|&h, &m| {
            if m != 0 {
                if let Some(bin) = hue_bin(h, bin_count) {
                    bins[bin] += 1.0;
                }
            }
        });

        let mut histogram = Self { bins };
        histogram.normalize();
        Ok(histogram)
    }

    /// Wrap raw bin values without normalizing them
    ///
    /// # Errors
    ///
    /// Returns an error if `bins` is empty
    pub fn from_bins(bins: Vec<f32>) -> Result<Self> {
        if bins.is_empty() || bins.len() > usize::from(HUE_RANGE) {
            return Err(Error::InvalidInput(format!(
                "Histogram bin count must be in 1..={HUE_RANGE}, got {}",
                bins.len()
            )));
        }
        Ok(Self { bins })
    }

    /// Min-max normalization to [0, 255]. Equal non-zero bins all map to 255.
    fn normalize(&mut self) {
        let min = self.bins.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.bins.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        if max <= 0.0 {
            self.bins.iter_mut().for_each(|b| *b = 0.0);
        } else if max - min <= f32::EPSILON {
            self.bins.iter_mut().for_each(|b| *b = HISTOGRAM_MAX);
        } else {
            let scale = HISTOGRAM_MAX / (max - min);
            self.bins.iter_mut().for_each(|b| *b = (*b - min) * scale);
        }
    }

    /// Normalized bin values
    #[must_use]
    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    /// Number of bins
    #[must_use]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Always false; a histogram has at least one bin
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Index of the largest bin (first one on ties)
    #[must_use]
    pub fn peak_bin(&self) -> usize {
        self.bins
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0
    }

    /// Probability that a pixel of this hue belongs to the target, in [0, 255]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn probability(&self, hue: u8) -> u8 {
        hue_bin(hue, self.bins.len())
            .map_or(0, |bin| self.bins[bin].round().clamp(0.0, 255.0) as u8)
    }

    /// Map every pixel's hue through the histogram
    #[must_use]
    pub fn back_project(&self, hue: &Array2<u8>) -> Array2<u8> {
        hue.mapv(|h| self.probability(h))
    }

    /// Bar chart of the histogram; each bar drawn in its bin's hue
    #[must_use]
    pub fn render(&self, width: usize, height: usize) -> Canvas {
        let mut canvas = Canvas::new(width, height, Color::BLACK);
        let bin_width = width / self.bins.len();
        if bin_width == 0 {
            return canvas;
        }

        let Ok(canvas_height) = usize_to_i32(height) else {
            return canvas;
        };
        let bin_count = self.bins.len() as f32;
        for (i, &value) in self.bins.iter().enumerate() {
            let color = Color::from_hue(i as f32 * f32::from(HUE_RANGE) / bin_count);
            let bar = f32_to_i32_clamp(value * canvas_height as f32 / HISTOGRAM_MAX, 0, canvas_height);
            let (Ok(left), Ok(bar_width)) = (usize_to_i32(i * bin_width), usize_to_i32(bin_width)) else {
                continue;
            };
            canvas.fill_region(Region::new(left, canvas_height - bar, bar_width, bar), color);
        }
        canvas
    }
}

/// Histogram bin of an 8-bit hue; `None` outside [0, 180)
#[must_use]
pub fn hue_bin(hue: u8, bin_count: usize) -> Option<usize> {
    let range = usize::from(HUE_RANGE);
    let h = usize::from(hue);
    (h < range).then(|| h * bin_count / range)
}
