//! Error handling tests for all modules


use head_parallax::{
    color_model::ColorHistogram,
    config::Config,
    error::{AppError, Result},
    frame_processor::{Frame, ProcessedFrame},
    geometry::Region,
    tracker::{back_projection, RegionTracker, TermCriteria},
    utils::safe_cast::*,
};
use ndarray::{Array2, Array3};
use test_helpers::{processed_patch, RED};

#[test]
fn test_frame_channel_errors() {
    let result = Frame::from_bgr(Array3::zeros((4, 4, 1)));
    match result {
        Err(AppError::InvalidInput(msg)) => assert!(msg.contains("channels")),
        _ => panic!("Expected InvalidInput"),
    }

    assert!(Frame::from_bgr(Array3::zeros((4, 4, 3))).is_ok());
}

#[test]
fn test_histogram_errors() {
    let processed = processed_patch(20, 20, Region::new(5, 5, 10, 10), RED);

    // Bin counts outside 1..=180
    for bins in [0, 181] {
        match ColorHistogram::build(&processed, Region::new(5, 5, 10, 10), bins) {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("bin count")),
            other => panic!("Expected InvalidInput for {bins} bins, got {other:?}"),
        }
    }
    assert!(ColorHistogram::from_bins(Vec::new()).is_err());

    // Regions with no pixels on the frame
    for region in [Region::new(5, 5, 0, 10), Region::new(30, 30, 5, 5), Region::new(-10, -10, 5, 5)] {
        assert!(
            matches!(
                ColorHistogram::build(&processed, region, 16),
                Err(AppError::DegenerateRegion(_))
            ),
            "{region:?}"
        );
    }
}

#[test]
fn test_tracker_errors() {
    let processed = processed_patch(20, 20, Region::new(5, 5, 10, 10), RED);
    let mut tracker = RegionTracker::new(TermCriteria::default(), 16);

    assert!(matches!(tracker.track(&processed), Err(AppError::TrackerIdle)));

    // A failed lock keeps the tracker idle
    assert!(tracker.lock(&processed, Region::new(50, 50, 10, 10)).is_err());
    assert!(!tracker.is_locked());

    tracker.lock(&processed, Region::new(5, 5, 10, 10)).unwrap();
    assert!(tracker.track(&processed).is_ok());

    // Hue and mask must agree in shape
    let mismatched = ProcessedFrame {
        hue: Array2::zeros((20, 20)),
        mask: Array2::zeros((10, 20)),
    };
    assert!(matches!(tracker.track(&mismatched), Err(AppError::InvalidInput(_))));
    let histogram = tracker.histogram().unwrap();
    assert!(back_projection(&mismatched, histogram).is_err());
}

#[test]
fn test_config_validation_errors() {
    assert!(Config::default().validate().is_ok());

    let cases: [(&str, fn(&mut Config)); 8] = [
        ("vmin", |c| c.color.vmin = -1),
        ("smin", |c| c.color.smin = 257),
        ("bins", |c| c.color.histogram_bins = 0),
        ("max_iterations", |c| c.tracker.max_iterations = 0),
        ("epsilon", |c| c.tracker.epsilon = f64::NAN),
        ("scale factor", |c| c.detector.scale_factor = 1.0),
        ("base depth", |c| c.world.base_depth = 0.0),
        ("screen width", |c| c.display.screen_width = 0),
    ];
    for (name, corrupt) in cases {
        let mut config = Config::default();
        corrupt(&mut config);
        assert!(
            matches!(config.validate(), Err(AppError::ConfigError(_))),
            "{name} should be rejected"
        );
    }
}

#[test]
fn test_config_file_errors() {
    match Config::from_file("/nonexistent/head-parallax.yaml") {
        Err(AppError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("Expected Io error, got {other:?}"),
    }

    let path = std::env::temp_dir().join(format!("head-parallax-bad-{}.yaml", std::process::id()));
    std::fs::write(&path, "color: [not, a, mapping]").unwrap();
    let result = Config::from_file(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(result, Err(AppError::ConfigError(_))));
}

#[test]
fn test_safe_cast_errors() {
    assert!(usize_to_i32(usize::MAX).is_err());
    assert!(i32_to_usize(-1).is_err());
    assert_eq!(round_clamp(2.5, 0, 10), 2);
    assert_eq!(round_clamp(f64::INFINITY, 0, 10), 0);
    assert_eq!(round_clamp(f64::NAN, -3, 10), -3);
    assert_eq!(f32_to_i32_clamp(1e12, -5, 5), 5);
}

#[test]
fn test_error_display() {
    let errors = [
        (AppError::TrackerIdle, "Tracker has no target locked"),
        (AppError::DegenerateRegion("empty".into()), "Degenerate region: empty"),
        (AppError::Camera("index 3".into()), "Camera error: index 3"),
        (AppError::ConfigError("bad".into()), "Configuration error: bad"),
    ];
    for (error, text) in errors {
        assert_eq!(error.to_string(), text);
    }

    let io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(io.to_string().starts_with("IO error"));
}

#[test]
fn test_error_propagation() {
    fn lock_outside() -> Result<()> {
        let processed = processed_patch(10, 10, Region::new(0, 0, 5, 5), RED);
        let mut tracker = RegionTracker::new(TermCriteria::default(), 16);
        tracker.lock(&processed, Region::new(20, 20, 5, 5))?;
        Ok(())
    }

    assert!(matches!(lock_outside(), Err(AppError::DegenerateRegion(_))));
}
