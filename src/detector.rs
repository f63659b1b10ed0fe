//! Head detection boundary and target selection.
//!
//! The detector itself is a black box returning candidate rectangles; the core only
//! decides which candidate becomes the target.

use crate::{frame_processor::Frame, geometry::Region, Result};

#[cfg(feature = "opencv")]
use crate::{config::DetectorConfig, utils::image_conversion::frame_to_mat, Error};
#[cfg(feature = "opencv")]
use opencv::{
    core::{Mat, Rect, Size, Vector},
    imgproc,
    objdetect::{self, CascadeClassifier},
    prelude::*,
};

/// Source of candidate head regions
pub trait HeadDetector {
    /// Candidate regions believed to contain a head; empty when nothing was found
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying detector fails to run
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>>;
}

impl<F> HeadDetector for F
where
    F: FnMut(&Frame) -> Vec<Region>,
{
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>> {
        Ok(self(frame))
    }
}

/// Pick the widest candidate, the first one on ties, clipped to the frame.
///
/// Returns `None` when there are no candidates or the chosen one lies outside the frame.
#[must_use]
pub fn select_target(candidates: &[Region], width: i32, height: i32) -> Option<Region> {
    let widest = candidates
        .iter()
        .fold(None::<&Region>, |best, c| match best {
            Some(b) if b.width >= c.width => Some(b),
            _ => Some(c),
        })?;
    let target = widest.clip_to(width, height);
    (!target.is_empty()).then_some(target)
}

/// Haar/LBP cascade classifier loaded from an XML file
#[cfg(feature = "opencv")]
pub struct CascadeDetector {
    classifier: CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
    min_size: i32,
    gray: Mat,
}

#[cfg(feature = "opencv")]
impl CascadeDetector {
    /// Load the cascade named in the detector configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the cascade file is missing or cannot be parsed
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let path = config.cascade_path.to_string_lossy();
        let classifier = CascadeClassifier::new(&path)?;
        if classifier.empty()? {
            return Err(Error::Detector(format!("Could not load cascade from {path}")));
        }
        log::info!("Loaded cascade classifier from {path}");

        Ok(Self {
            classifier,
            scale_factor: config.scale_factor,
            min_neighbors: config.min_neighbors,
            min_size: config.min_size,
            gray: Mat::default(),
        })
    }
}

#[cfg(feature = "opencv")]
impl HeadDetector for CascadeDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>> {
        let image = frame_to_mat(frame)?;
        imgproc::cvt_color(&image, &mut self.gray, imgproc::COLOR_BGR2GRAY, 0)?;

        let mut found = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &self.gray,
            &mut found,
            self.scale_factor,
            self.min_neighbors,
            objdetect::CASCADE_SCALE_IMAGE,
            Size::new(self.min_size, self.min_size),
            Size::default(),
        )?;

        let regions: Vec<Region> = found
            .iter()
            .map(|r| Region::new(r.x, r.y, r.width, r.height))
            .collect();
        log::debug!("Cascade found {} candidate(s)", regions.len());
        Ok(regions)
    }
}
