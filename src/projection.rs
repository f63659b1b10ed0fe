//! Depth-weighted projection of the scene onto the screen plane, driven by a virtual eye.

use crate::{
    canvas::Canvas,
    geometry::{Color, TrackedRegion},
    world::Scene,
};
use nalgebra::{Point2, Point3};

/// Project `target` onto the `z = 0` plane as seen from `eye`.
///
/// The result is the average of the two points' `xy`, each weighted by the other's
/// absolute depth. Returns `None` when both depths are zero.
#[must_use]
pub fn project(eye: &Point3<f32>, target: &Point3<f32>) -> Option<Point2<f32>> {
    let eye_depth = eye.z.abs();
    let target_depth = target.z.abs();
    let total = eye_depth + target_depth;
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    Some(Point2::new(
        (eye.x * target_depth + target.x * eye_depth) / total,
        (eye.y * target_depth + target.y * eye_depth) / total,
    ))
}

/// Maps the tracked head position to a viewpoint in scene space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeModel {
    /// Width of the rendered screen
    pub screen_width: f32,
    /// Eye depth when the head is horizontally centered
    pub base_depth: f32,
}

impl EyeModel {
    /// Viewpoint for a tracked head.
    ///
    /// `x` is mirrored across the screen so the scene moves like a window, and the
    /// eye moves away from the plane as the head leaves the horizontal center.
    #[must_use]
    pub fn eye(&self, tracked: &TrackedRegion) -> Point3<f32> {
        let x = self.screen_width - tracked.center.x;
        let y = tracked.center.y;
        let z = self.base_depth - (x - self.screen_width / 2.0).abs().sqrt();
        Point3::new(x, y, z)
    }
}

/// Draws a [`Scene`] onto a fixed-size canvas
#[derive(Debug, Clone)]
pub struct SceneRenderer {
    width: usize,
    height: usize,
    background: Color,
}

impl SceneRenderer {
    /// Renderer for a `width` x `height` screen on a white background
    #[must_use]
    pub const fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            background: Color::WHITE,
        }
    }

    /// Screen size in pixels
    #[must_use]
    pub const fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Fresh canvas with every edge of `scene` projected from `eye`
    #[must_use]
    pub fn render(&self, scene: &Scene, eye: &Point3<f32>) -> Canvas {
        let mut canvas = Canvas::new(self.width, self.height, self.background);
        self.render_into(&mut canvas, scene, eye);
        canvas
    }

    /// Clear `canvas` and draw `scene` into it.
    ///
    /// Edges whose endpoints cannot be projected are skipped.
    pub fn render_into(&self, canvas: &mut Canvas, scene: &Scene, eye: &Point3<f32>) {
        canvas.fill(self.background);
        for line in scene.lines() {
            if let (Some(a), Some(b)) = (project(eye, &line.p1), project(eye, &line.p2)) {
                canvas.draw_line(a, b, line.color);
            }
        }
    }
}
