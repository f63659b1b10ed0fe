//! Edge case tests for tracking, color modelling, projection and drawing


use head_parallax::{
    canvas::Canvas,
    color_model::ColorHistogram,
    frame_processor::{ColorThresholds, Frame, FrameProcessor},
    geometry::{Color, Region, TrackedRegion},
    projection::project,
    tracker::{recovery_window, track, RegionTracker, TermCriteria},
};
use nalgebra::{Point2, Point3};
use ndarray::Array2;
use proptest::prelude::*;
use test_helpers::{processed_patch, RED};

#[test]
fn test_recovery_square_sizes() {
    // Side is (min(W, H) + 5) / 6
    for (width, height, side) in [(640, 480, 80), (320, 240, 40), (7, 7, 2), (1, 1, 1)] {
        let square = recovery_window(Region::new(width / 2, height / 2, 0, 0), width, height);
        assert_eq!((square.width, square.height), (side, side), "{width}x{height}");
        assert!(square.is_within(width, height));
    }
}

#[test]
fn test_blank_map_recovers_with_recovery_square() {
    let processed = processed_patch(120, 90, Region::default(), RED);
    let histogram = ColorHistogram::from_bins(vec![255.0; 16]).unwrap();

    let outcome = track(&processed, &histogram, Region::new(60, 45, 0, 0), TermCriteria::default()).unwrap();
    assert!(outcome.recovered);
    assert_eq!((outcome.region.width, outcome.region.height), (15, 15));
}

#[test]
fn test_tiny_frames() {
    let processed = processed_patch(1, 1, Region::new(0, 0, 1, 1), RED);
    let mut tracker = RegionTracker::new(TermCriteria::default(), 8);
    tracker.lock(&processed, Region::new(0, 0, 1, 1)).unwrap();
    let outcome = tracker.track(&processed).unwrap();
    assert_eq!(outcome.region, Region::new(0, 0, 1, 1));
}

#[test]
fn test_zero_iterations_still_returns_valid_region() {
    let processed = processed_patch(100, 100, Region::new(40, 40, 20, 20), RED);
    let histogram = ColorHistogram::build(&processed, Region::new(40, 40, 20, 20), 16).unwrap();
    let criteria = TermCriteria {
        max_iterations: 0,
        epsilon: 1.0,
    };
    let outcome = track(&processed, &histogram, Region::new(-50, -50, 500, 500), criteria).unwrap();
    assert!(outcome.region.is_within(100, 100));
}

#[test]
fn test_inverted_value_bounds_are_accepted() {
    let thresholds = ColorThresholds {
        vmin: 256,
        vmax: 10,
        smin: 50,
    };
    let processed = FrameProcessor::new(thresholds)
        .process(&Frame::filled(4, 4, [0, 0, 200]))
        .unwrap();
    assert!(processed.mask.iter().all(|&m| m == 255));
}

#[test]
fn test_empty_frame_is_skipped() {
    assert!(FrameProcessor::default().process(&Frame::empty()).is_none());
}

#[test]
fn test_projection_of_eye_depth_points() {
    // Target on the eye's depth plane sits halfway between them
    let p = project(&Point3::new(0.0, 0.0, 100.0), &Point3::new(50.0, 20.0, -100.0)).unwrap();
    assert_eq!(p, Point2::new(25.0, 10.0));

    assert!(project(&Point3::new(0.0, 0.0, 0.0), &Point3::new(1.0, 1.0, 0.0)).is_none());
    assert!(project(&Point3::new(0.0, 0.0, f32::NAN), &Point3::new(1.0, 1.0, 1.0)).is_none());
}

#[test]
fn test_degenerate_ellipse_does_not_panic() {
    let mut canvas = Canvas::new(10, 10, Color::BLACK);
    canvas.draw_ellipse(&TrackedRegion::default(), Color::GREEN, 3);
    canvas.draw_ellipse(
        &TrackedRegion {
            center: Point2::new(1e9, -1e9),
            width: f32::INFINITY,
            height: 3.0,
            angle: 45.0,
        },
        Color::GREEN,
        1,
    );
    assert_eq!(canvas.width(), 10);
}

#[test]
fn test_histogram_single_bin() {
    let processed = processed_patch(10, 10, Region::new(0, 0, 10, 10), RED);
    let histogram = ColorHistogram::build(&processed, Region::frame(10, 10), 1).unwrap();
    assert_eq!(histogram.bins(), &[255.0]);
    assert!(histogram.back_project(&Array2::from_elem((2, 2), 179)).iter().all(|&p| p == 255));
}

proptest! {
    #[test]
    fn prop_tracked_region_stays_in_frame(
        width in 8usize..120,
        height in 8usize..120,
        px in -20i32..120,
        py in -20i32..120,
        size in 1i32..60,
        x in any::<i32>(),
        y in any::<i32>(),
        w in any::<i32>(),
        h in any::<i32>(),
    ) {
        let processed = processed_patch(width, height, Region::new(px, py, size, size), RED);
        let histogram = ColorHistogram::from_bins(vec![255.0; 12]).unwrap();
        let outcome = track(&processed, &histogram, Region::new(x, y, w, h), TermCriteria::default()).unwrap();

        prop_assert!(outcome.region.is_within(width as i32, height as i32));
        prop_assert!(outcome.region.area() > 0);
        prop_assert!((0.0..=180.0).contains(&outcome.tracked.angle));
    }

    #[test]
    fn prop_histogram_max_is_255_unless_masked_out(
        hues in proptest::collection::vec(0u8..180, 64),
        masked in proptest::collection::vec(any::<bool>(), 64),
        bins in 1usize..=180,
    ) {
        let hue = Array2::from_shape_vec((8, 8), hues).unwrap();
        let mask = Array2::from_shape_vec((8, 8), masked.iter().map(|&m| if m { 255 } else { 0 }).collect()).unwrap();
        let any_valid = masked.iter().any(|&m| m);
        let processed = head_parallax::frame_processor::ProcessedFrame { hue, mask };

        let histogram = ColorHistogram::build(&processed, Region::frame(8, 8), bins).unwrap();
        let max = histogram.bins().iter().copied().fold(0.0f32, f32::max);
        prop_assert!(histogram.bins().iter().all(|&b| (-1e-3..=255.001).contains(&b)));
        let expected = if any_valid { 255.0 } else { 0.0 };
        prop_assert!((max - expected).abs() < 1e-3, "max {} vs {}", max, expected);
    }

    #[test]
    fn prop_projection_between_eye_and_target(
        ex in -1000f32..1000.0, ey in -1000f32..1000.0, ez in 1f32..1000.0,
        tx in -1000f32..1000.0, ty in -1000f32..1000.0, tz in -1000f32..1000.0,
    ) {
        let p = project(&Point3::new(ex, ey, ez), &Point3::new(tx, ty, tz)).unwrap();
        prop_assert!(p.x >= ex.min(tx) - 1e-2 && p.x <= ex.max(tx) + 1e-2);
        prop_assert!(p.y >= ey.min(ty) - 1e-2 && p.y <= ey.max(ty) + 1e-2);
    }

    #[test]
    fn prop_lines_never_panic(
        x0 in proptest::num::f32::ANY, y0 in proptest::num::f32::ANY,
        x1 in -1e6f32..1e6, y1 in -1e6f32..1e6,
    ) {
        let mut canvas = Canvas::new(16, 16, Color::WHITE);
        canvas.draw_line(Point2::new(x0, y0), Point2::new(x1, y1), Color::BLACK);
        prop_assert_eq!(canvas.width(), 16);
    }
}
