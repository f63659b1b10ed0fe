//! Frame-to-frame relocation of the tracked head using CamShift over a hue back-projection.
//!
//! Each tick the target's [`ColorHistogram`] is back-projected onto the hue channel,
//! masked by the saturation/value validity mask, and a search window is driven to the
//! local probability centroid by mean-shift. The converged window is then grown,
//! its second moments give the orientation and extent of the target, and the window
//! is resized to that extent for the next tick. A window that collapses is replaced
//! by a small recovery square so tracking can pick the target up again.

use crate::{
    color_model::ColorHistogram,
    constants::{CAMSHIFT_TOLERANCE, DEFAULT_EPSILON, DEFAULT_MAX_ITERATIONS},
    frame_processor::ProcessedFrame,
    geometry::{Region, TrackedRegion},
    utils::safe_cast::{round_clamp, usize_to_i32},
    Error, Result,
};
use log::{debug, info};
use nalgebra::Point2;
use ndarray::{Array2, Zip};

/// When mean-shift stops iterating
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermCriteria {
    /// Iteration cap
    pub max_iterations: usize,
    /// Stop once the window moves less than this many pixels
    pub epsilon: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Result of one tracking tick
#[derive(Debug, Clone)]
pub struct TrackOutcome {
    /// Oriented extent of the target
    pub tracked: TrackedRegion,
    /// Search window for the next tick, inside the frame
    pub region: Region,
    /// Masked probability map the search ran on
    pub back_projection: Array2<u8>,
    /// True when the window collapsed and was replaced by the recovery square
    pub recovered: bool,
}

/// Raw spatial moments of a probability window, in window-local coordinates
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    m00: f64,
    m10: f64,
    m01: f64,
    m20: f64,
    m11: f64,
    m02: f64,
}

impl Moments {
    /// Moments of `window`, which must lie inside `prob`
    fn of(prob: &Array2<u8>, window: Region) -> Self {
        let mut m = Self::default();
        let (Ok(x0), Ok(y0)) = (usize::try_from(window.x), usize::try_from(window.y)) else {
            return m;
        };
        let (Ok(w), Ok(h)) = (usize::try_from(window.width), usize::try_from(window.height)) else {
            return m;
        };

        for (row, line) in prob.outer_iter().skip(y0).take(h).enumerate() {
            let y = row as f64;
            let mut row_sum = 0.0;
            let mut row_x = 0.0;
            let mut row_xx = 0.0;
            for (col, &p) in line.iter().skip(x0).take(w).enumerate() {
                if p == 0 {
                    continue;
                }
                let p = f64::from(p);
                let x = col as f64;
                row_sum += p;
                row_x += x * p;
                row_xx += x * x * p;
            }
            m.m00 += row_sum;
            m.m10 += row_x;
            m.m01 += y * row_sum;
            m.m20 += row_xx;
            m.m11 += y * row_x;
            m.m02 += y * y * row_sum;
        }
        m
    }

    fn is_empty(&self) -> bool {
        self.m00.abs() < f64::EPSILON
    }
}

/// Frame size of a probability map as pixel coordinates
fn frame_size(prob: &Array2<u8>) -> (i32, i32) {
    let width = usize_to_i32(prob.ncols()).unwrap_or(i32::MAX);
    let height = usize_to_i32(prob.nrows()).unwrap_or(i32::MAX);
    (width, height)
}

/// Back-project `histogram` over the frame's hue and zero out masked pixels
///
/// # Errors
///
/// Returns an error if the hue and mask grids differ in shape
pub fn back_projection(processed: &ProcessedFrame, histogram: &ColorHistogram) -> Result<Array2<u8>> {
    if processed.hue.dim() != processed.mask.dim() {
        return Err(Error::InvalidInput(format!(
            "Hue {:?} and mask {:?} shapes differ",
            processed.hue.dim(),
            processed.mask.dim()
        )));
    }
    let mut prob = histogram.back_project(&processed.hue);
    Zip::from(&mut prob).and(&processed.mask).for_each(|p, &m| *p &= m);
    Ok(prob)
}

/// Move `window` onto the local probability centroid.
///
/// Returns the converged window, clipped to the frame and at least 1x1, together
/// with the number of iterations run.
#[must_use]
pub fn mean_shift(prob: &Array2<u8>, window: Region, criteria: TermCriteria) -> (Region, usize) {
    let (width, height) = frame_size(prob);
    if width == 0 || height == 0 {
        return (window, 0);
    }

    let bounds = Region::frame(width, height);
    let eps = (criteria.epsilon * criteria.epsilon).round_ties_even();
    let mut window = window;
    let mut iterations = 0;

    while iterations < criteria.max_iterations {
        iterations += 1;

        let mut current = window.intersect(&bounds);
        if current.is_empty() {
            current = Region::new(width / 2, height / 2, 1, 1);
        }
        current.width = current.width.max(1);
        current.height = current.height.max(1);

        let m = Moments::of(prob, current);
        if m.is_empty() {
            window = current;
            break;
        }

        let dx = round_clamp(m.m10 / m.m00 - f64::from(current.width) * 0.5, -width, width);
        let dy = round_clamp(m.m01 / m.m00 - f64::from(current.height) * 0.5, -height, height);

        let nx = (current.x + dx).clamp(0, width - current.width);
        let ny = (current.y + dy).clamp(0, height - current.height);
        let shift = f64::from((nx - current.x).pow(2) + (ny - current.y).pow(2));

        current.x = nx;
        current.y = ny;
        window = current;

        if shift < eps {
            break;
        }
    }

    (window, iterations)
}

/// Continuously adaptive mean-shift.
///
/// Returns the oriented target extent and the next search window. When the window
/// holds no probability mass the returned window has zero size at the corner of the
/// mean-shift window and the tracked region is the default (zero-sized) one.
#[must_use]
#[allow(clippy::similar_names)]
pub fn cam_shift(prob: &Array2<u8>, window: Region, criteria: TermCriteria) -> (TrackedRegion, Region) {
    let (width, height) = frame_size(prob);
    let (converged, _) = mean_shift(prob, window, criteria);
    let collapsed = Region::new(converged.x.clamp(0, width), converged.y.clamp(0, height), 0, 0);

    let mut search = converged;
    search.x = (search.x - CAMSHIFT_TOLERANCE).max(0);
    search.y = (search.y - CAMSHIFT_TOLERANCE).max(0);
    search.width += 2 * CAMSHIFT_TOLERANCE;
    search.height += 2 * CAMSHIFT_TOLERANCE;
    let search = search.clip_to(width, height);
    if search.is_empty() {
        return (TrackedRegion::default(), collapsed);
    }

    let m = Moments::of(prob, search);
    if m.is_empty() {
        return (TrackedRegion::default(), collapsed);
    }

    let inv_m00 = 1.0 / m.m00;
    let x_bar = m.m10 * inv_m00;
    let y_bar = m.m01 * inv_m00;
    let xc = round_clamp(x_bar + f64::from(search.x), 0, width - 1);
    let yc = round_clamp(y_bar + f64::from(search.y), 0, height - 1);

    let mu20 = m.m20 - x_bar * m.m10;
    let mu11 = m.m11 - x_bar * m.m01;
    let mu02 = m.m02 - y_bar * m.m01;

    let a = mu20 * inv_m00;
    let b = mu11 * inv_m00;
    let c = mu02 * inv_m00;

    let square = (4.0 * b * b + (a - c) * (a - c)).sqrt();
    let mut theta = (2.0 * b).atan2(a - c + square);
    let (mut sn, mut cs) = theta.sin_cos();

    let rotate_a = (cs * cs * mu20 + 2.0 * cs * sn * mu11 + sn * sn * mu02).max(0.0);
    let rotate_c = (sn * sn * mu20 - 2.0 * cs * sn * mu11 + cs * cs * mu02).max(0.0);
    let mut length = (rotate_a * inv_m00).sqrt() * 4.0;
    let mut breadth = (rotate_c * inv_m00).sqrt() * 4.0;

    if length < breadth {
        std::mem::swap(&mut length, &mut breadth);
        std::mem::swap(&mut cs, &mut sn);
        theta = std::f64::consts::FRAC_PI_2 - theta;
    }

    let extent = |along: f64, across: f64, limit: i32| {
        let t0 = round_clamp(along.abs(), 0, limit);
        let t1 = round_clamp(across.abs(), 0, limit);
        t0.max(t1).saturating_add(2)
    };

    let mut next = Region::default();
    next.width = extent(length * cs, breadth * sn, width).min((width - xc) * 2);
    next.height = extent(length * sn, breadth * cs, height).min((height - yc) * 2);
    next.x = (xc - next.width / 2).max(0);
    next.y = (yc - next.height / 2).max(0);
    next.width = next.width.min(width - next.x);
    next.height = next.height.min(height - next.y);

    let mut angle = (std::f64::consts::FRAC_PI_2 + theta).to_degrees().rem_euclid(360.0);
    if angle >= 180.0 {
        angle -= 180.0;
    }

    let tracked = TrackedRegion {
        center: Point2::new(
            next.x as f32 + next.width as f32 * 0.5,
            next.y as f32 + next.height as f32 * 0.5,
        ),
        width: breadth as f32,
        height: length as f32,
        angle: angle as f32,
    };

    (tracked, next)
}

/// Square of side `(min(width, height) + 5) / 6` centered on the corner of `collapsed`,
/// clipped to the frame
#[must_use]
pub fn recovery_window(collapsed: Region, width: i32, height: i32) -> Region {
    let side = (width.min(height) + 5) / 6;
    Region::new(collapsed.x - side / 2, collapsed.y - side / 2, side, side).clip_to(width, height)
}

/// Relocate `region` on a new frame.
///
/// # Errors
///
/// Returns an error if the hue and mask grids differ in shape
pub fn track(
    processed: &ProcessedFrame,
    histogram: &ColorHistogram,
    region: Region,
    criteria: TermCriteria,
) -> Result<TrackOutcome> {
    let prob = back_projection(processed, histogram)?;
    let (width, height) = frame_size(&prob);

    let (tracked, mut next) = cam_shift(&prob, region, criteria);
    let recovered = next.area() <= 1;
    if recovered {
        next = recovery_window(next, width, height);
    }

    Ok(TrackOutcome {
        tracked,
        region: next,
        back_projection: prob,
        recovered,
    })
}

/// Whether the tracker holds a target model
#[derive(Debug, Clone, Default)]
pub enum TrackerState {
    /// No color model yet
    #[default]
    Idle,
    /// Target model and current search window
    Locked {
        /// Hue distribution of the target
        histogram: ColorHistogram,
        /// Search window for the next tick
        region: Region,
    },
}

/// Stateful tracker: a color model plus the window it is following
#[derive(Debug, Clone)]
pub struct RegionTracker {
    state: TrackerState,
    criteria: TermCriteria,
    bin_count: usize,
}

impl RegionTracker {
    /// Create an idle tracker
    #[must_use]
    pub fn new(criteria: TermCriteria, bin_count: usize) -> Self {
        Self {
            state: TrackerState::Idle,
            criteria,
            bin_count,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &TrackerState {
        &self.state
    }

    /// True once a target model has been built
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self.state, TrackerState::Locked { .. })
    }

    /// Target model, if locked
    #[must_use]
    pub const fn histogram(&self) -> Option<&ColorHistogram> {
        match &self.state {
            TrackerState::Locked { histogram, .. } => Some(histogram),
            TrackerState::Idle => None,
        }
    }

    /// Current search window, if locked
    #[must_use]
    pub const fn region(&self) -> Option<Region> {
        match &self.state {
            TrackerState::Locked { region, .. } => Some(*region),
            TrackerState::Idle => None,
        }
    }

    /// Number of histogram bins used for new targets
    #[must_use]
    pub const fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Build a model of `region` and start following it.
    ///
    /// # Errors
    ///
    /// Returns an error if the region clipped to the frame has no pixels; the tracker
    /// state is left unchanged in that case
    pub fn lock(&mut self, processed: &ProcessedFrame, region: Region) -> Result<()> {
        let width = usize_to_i32(processed.width())?;
        let height = usize_to_i32(processed.height())?;
        let target = region.clip_to(width, height);
        let histogram = ColorHistogram::build(processed, target, self.bin_count)?;

        info!("Target locked at {:?}, peak hue bin {}", target, histogram.peak_bin());
        self.state = TrackerState::Locked {
            histogram,
            region: target,
        };
        Ok(())
    }

    /// Drop the model; tracking needs a new lock afterwards
    pub fn reset(&mut self) {
        if self.is_locked() {
            debug!("Tracker reset to idle");
        }
        self.state = TrackerState::Idle;
    }

    /// Follow the target onto a new frame
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No target is locked
    /// - The hue and mask grids differ in shape
    pub fn track(&mut self, processed: &ProcessedFrame) -> Result<TrackOutcome> {
        let TrackerState::Locked { histogram, region } = &mut self.state else {
            return Err(Error::TrackerIdle);
        };

        let outcome = track(processed, histogram, *region, self.criteria)?;
        if outcome.recovered {
            debug!("Tracking window collapsed, searching {:?}", outcome.region);
        }
        *region = outcome.region;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::s;
    use proptest::prelude::*;

    /// Frame whose probability map is a single bright rectangle
    fn blob(width: usize, height: usize, patch: Region) -> Array2<u8> {
        let mut prob = Array2::zeros((height, width));
        let rows = patch.y as usize..patch.bottom() as usize;
        let cols = patch.x as usize..patch.right() as usize;
        prob.slice_mut(s![rows, cols]).fill(255);
        prob
    }

    fn patch_frame(width: usize, height: usize, patch: Region) -> ProcessedFrame {
        let mut hue = Array2::from_elem((height, width), 120);
        hue.slice_mut(s![
            patch.y as usize..patch.bottom() as usize,
            patch.x as usize..patch.right() as usize
        ])
        .fill(60);
        ProcessedFrame {
            hue,
            mask: Array2::from_elem((height, width), 255),
        }
    }

    #[test]
    fn test_mean_shift_moves_toward_mass() {
        let prob = blob(100, 100, Region::new(40, 40, 20, 20));
        let (window, iterations) = mean_shift(&prob, Region::new(30, 30, 20, 20), TermCriteria::default());
        assert!(iterations >= 1);
        // Half-pixel steps round to even, so it settles just short of the blob corner
        assert_eq!(window, Region::new(38, 38, 20, 20));
    }

    #[test]
    fn test_mean_shift_respects_iteration_cap() {
        let prob = blob(200, 20, Region::new(180, 0, 20, 20));
        let criteria = TermCriteria { max_iterations: 1, epsilon: 1.0 };
        let (window, iterations) = mean_shift(&prob, Region::new(150, 0, 40, 20), criteria);
        assert_eq!(iterations, 1);
        assert!(window.x > 150);
    }

    #[test]
    fn test_mean_shift_empty_window_stays_put() {
        let prob = Array2::zeros((50, 50));
        let (window, _) = mean_shift(&prob, Region::new(10, 10, 5, 5), TermCriteria::default());
        assert_eq!(window, Region::new(10, 10, 5, 5));
    }

    #[test]
    fn test_cam_shift_fits_uniform_patch() {
        let patch = Region::new(60, 40, 30, 30);
        let prob = blob(160, 120, patch);
        let (tracked, window) = cam_shift(&prob, patch, TermCriteria::default());

        assert!((tracked.center.x - 75.0).abs() <= 1.0);
        assert!((tracked.center.y - 55.0).abs() <= 1.0);
        assert!(window.is_within(160, 120));
        // Square patch: both axes about 4 sigma of a 30 pixel uniform run
        assert!((tracked.width - tracked.height).abs() < 1e-3);
        assert!((tracked.height - 34.6).abs() < 0.5);
    }

    #[test]
    fn test_cam_shift_orientation_of_tall_patch() {
        let prob = blob(100, 100, Region::new(45, 20, 10, 60));
        let (tracked, _) = cam_shift(&prob, Region::new(40, 20, 20, 60), TermCriteria::default());
        assert!(tracked.height > tracked.width);
        // Major axis vertical
        assert!(tracked.angle.abs() < 1.0 || (tracked.angle - 180.0).abs() < 1.0, "angle {}", tracked.angle);
    }

    #[test]
    fn test_cam_shift_without_mass_collapses() {
        let prob = Array2::zeros((60, 80));
        let (tracked, window) = cam_shift(&prob, Region::new(20, 10, 15, 15), TermCriteria::default());
        assert_eq!(tracked, TrackedRegion::default());
        assert_eq!(window, Region::new(20, 10, 0, 0));
    }

    #[test]
    fn test_recovery_window_side_and_clip() {
        assert_eq!(recovery_window(Region::new(50, 50, 0, 0), 120, 90), Region::new(43, 43, 15, 15));
        // Corner at the frame origin: the square is cut by the frame
        assert_eq!(recovery_window(Region::default(), 120, 90), Region::new(0, 0, 8, 8));
    }

    #[test]
    fn test_track_recovers_from_lost_target() {
        let frame = patch_frame(120, 90, Region::new(10, 10, 20, 20));
        let histogram = ColorHistogram::build(&frame, Region::new(10, 10, 20, 20), 16).unwrap();

        // Target left the frame: nothing matches any more
        let mut empty = frame.clone();
        empty.hue.fill(120);
        let outcome = track(&empty, &histogram, Region::new(60, 40, 1, 1), TermCriteria::default()).unwrap();

        assert!(outcome.recovered);
        assert_eq!(outcome.region.width, 15);
        assert_eq!(outcome.region.height, 15);
        assert!(outcome.region.is_within(120, 90));
    }

    #[test]
    fn test_track_is_stable_without_motion() {
        let patch = Region::new(50, 30, 24, 24);
        let frame = patch_frame(160, 120, patch);
        let histogram = ColorHistogram::build(&frame, patch, 16).unwrap();

        let outcome = track(&frame, &histogram, patch, TermCriteria::default()).unwrap();
        let center = patch.center();
        assert!(!outcome.recovered);
        assert!((outcome.tracked.center.x - center.x).abs() <= 1.5);
        assert!((outcome.tracked.center.y - center.y).abs() <= 1.5);
    }

    #[test]
    fn test_track_rejects_mismatched_mask() {
        let frame = ProcessedFrame {
            hue: Array2::zeros((10, 10)),
            mask: Array2::zeros((5, 10)),
        };
        let histogram = ColorHistogram::from_bins(vec![255.0; 16]).unwrap();
        assert!(track(&frame, &histogram, Region::new(0, 0, 5, 5), TermCriteria::default()).is_err());
    }

    #[test]
    fn test_back_projection_is_masked() {
        let mut frame = patch_frame(20, 20, Region::new(0, 0, 20, 20));
        frame.mask.slice_mut(s![.., 10..]).fill(0);
        let histogram = ColorHistogram::build(&frame, Region::new(0, 0, 10, 20), 16).unwrap();
        let prob = back_projection(&frame, &histogram).unwrap();
        assert_eq!(prob[[5, 5]], 255);
        assert_eq!(prob[[5, 15]], 0);
    }

    #[test]
    fn test_region_tracker_requires_lock() {
        let frame = patch_frame(40, 40, Region::new(5, 5, 10, 10));
        let mut tracker = RegionTracker::new(TermCriteria::default(), 16);
        assert!(matches!(tracker.track(&frame), Err(Error::TrackerIdle)));

        tracker.lock(&frame, Region::new(5, 5, 10, 10)).unwrap();
        assert!(tracker.is_locked());
        assert!(tracker.track(&frame).is_ok());

        tracker.reset();
        assert!(!tracker.is_locked());
        assert!(tracker.histogram().is_none());
    }

    #[test]
    fn test_failed_lock_keeps_state() {
        let frame = patch_frame(40, 40, Region::new(5, 5, 10, 10));
        let mut tracker = RegionTracker::new(TermCriteria::default(), 16);
        assert!(tracker.lock(&frame, Region::new(100, 100, 10, 10)).is_err());
        assert!(!tracker.is_locked());
    }

    #[test]
    fn test_region_tracker_follows_moving_patch() {
        let mut tracker = RegionTracker::new(TermCriteria::default(), 16);
        let start = Region::new(40, 40, 20, 20);
        tracker.lock(&patch_frame(200, 150, start), start).unwrap();

        for step in 1..=5 {
            let moved = Region::new(40 + step * 6, 40 + step * 3, 20, 20);
            let outcome = tracker.track(&patch_frame(200, 150, moved)).unwrap();
            let center = moved.center();
            assert!((outcome.tracked.center.x - center.x).abs() <= 2.0, "step {step}");
            assert!((outcome.tracked.center.y - center.y).abs() <= 2.0, "step {step}");
        }
    }

    #[test]
    fn test_window_near_i32_limits() {
        let patch = Region::new(50, 30, 30, 30);
        let frame = patch_frame(120, 90, patch);
        let histogram = ColorHistogram::build(&frame, patch, 16).unwrap();
        for window in [
            Region::new(i32::MAX - 5, 10, 100, 100),
            Region::new(10, i32::MAX, i32::MAX, i32::MAX),
            Region::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX),
        ] {
            let outcome = track(&frame, &histogram, window, TermCriteria::default()).unwrap();
            assert!(outcome.region.is_within(120, 90), "{window:?}");
            assert!(outcome.region.area() > 0, "{window:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_track_region_stays_in_frame(
            x in any::<i32>(),
            y in any::<i32>(),
            w in any::<i32>(),
            h in any::<i32>(),
            px in 0usize..90,
            py in 0usize..70,
        ) {
            let patch = Region::new(px as i32, py as i32, 10, 10);
            let frame = patch_frame(100, 80, patch);
            let histogram = ColorHistogram::build(&frame, patch, 16).unwrap();
            let outcome = track(&frame, &histogram, Region::new(x, y, w, h), TermCriteria::default()).unwrap();
            prop_assert!(outcome.region.is_within(100, 80));
            prop_assert!(outcome.region.area() > 0);
        }
    }
}
