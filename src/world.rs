//! Static wireframe scene of randomly placed cubes.

use crate::geometry::Color;
use log::debug;
use nalgebra::Point3;
use rand::Rng;

/// Number of edges in one cube
pub const CUBE_EDGES: usize = 12;

/// Colored segment in scene space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line3 {
    /// First endpoint
    pub p1: Point3<f32>,
    /// Second endpoint
    pub p2: Point3<f32>,
    /// Stroke color
    pub color: Color,
}

impl Line3 {
    /// Create a segment
    #[must_use]
    pub const fn new(p1: Point3<f32>, p2: Point3<f32>, color: Color) -> Self {
        Self { p1, p2, color }
    }
}

/// Corner `index` (0..8) of the cube centered at `center` with half side `half`.
///
/// Corners 0..4 sit on the `+x` face and 4..8 on the `-x` face, each face walked
/// around its perimeter so consecutive corners share an edge.
#[must_use]
pub fn cube_vertex(center: Point3<f32>, half: f32, index: usize) -> Point3<f32> {
    let dx = if index < 4 { half } else { -half };
    let dy = if (index / 2) % 2 == 0 { half } else { -half };
    let dz = if (1..3).contains(&index) || (5..7).contains(&index) {
        -half
    } else {
        half
    };
    Point3::new(center.x + dx, center.y + dy, center.z + dz)
}

/// The 12 black edges of an axis-aligned cube; `size` is halved with integer division
#[must_use]
pub fn create_cube(center: Point3<f32>, size: i32) -> [Line3; CUBE_EDGES] {
    let half = (size / 2) as f32;
    let v: [Point3<f32>; 8] = std::array::from_fn(|i| cube_vertex(center, half, i));

    let mut edges = [Line3::new(center, center, Color::BLACK); CUBE_EDGES];
    for i in 0..4 {
        let next = (i + 1) % 4;
        edges[i * 3] = Line3::new(v[i], v[next], Color::BLACK);
        edges[i * 3 + 1] = Line3::new(v[i + 4], v[next + 4], Color::BLACK);
        edges[i * 3 + 2] = Line3::new(v[i], v[i + 4], Color::BLACK);
    }
    edges
}

/// Parameters of a generated scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLayout {
    /// Visible width cubes are spread over
    pub width: f32,
    /// Visible height cubes are spread over
    pub height: f32,
    /// Number of cubes
    pub cube_count: usize,
    /// Largest cube side
    pub max_cube_size: i32,
    /// Cubes are placed at depths in `[-max_depth, 0]`
    pub max_depth: f32,
}

/// Immutable set of segments drawn every render tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    lines: Vec<Line3>,
}

impl Scene {
    /// Scene made of the given segments
    #[must_use]
    pub fn from_lines(lines: Vec<Line3>) -> Self {
        Self { lines }
    }

    /// Place `layout.cube_count` cubes at random positions and sizes.
    ///
    /// Every coordinate factor is drawn from `{0.00, 0.01, ..., 1.00}`.
    #[must_use]
    pub fn generate<R: Rng>(rng: &mut R, layout: &SceneLayout) -> Self {
        let mut unit = || rng.gen_range(0..=100u8) as f32 / 100.0;

        let mut lines = Vec::with_capacity(layout.cube_count * CUBE_EDGES);
        for _ in 0..layout.cube_count {
            let center = Point3::new(
                layout.width * unit(),
                layout.height * unit(),
                -layout.max_depth * unit(),
            );
            let size = (layout.max_cube_size as f32 * unit()) as i32;
            lines.extend_from_slice(&create_cube(center, size));
        }

        debug!("Generated scene with {} cubes, {} edges", layout.cube_count, lines.len());
        Self { lines }
    }

    /// All segments
    #[must_use]
    pub fn lines(&self) -> &[Line3] {
        &self.lines
    }

    /// Number of segments
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when there is nothing to draw
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
