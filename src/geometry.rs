//! Rectangles, oriented rectangles and colors shared by the tracker and renderer.

use nalgebra::Point2;

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Region {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Region {
    /// Create a region from its top-left corner and size
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Region covering a whole `width` x `height` frame
    #[must_use]
    pub const fn frame(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Region spanned by two opposite corners, in any order
    #[must_use]
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        let (left, right) = (a.0.min(b.0), a.0.max(b.0));
        let (top, bottom) = (a.1.min(b.1), a.1.max(b.1));
        Self::new(left, top, right.saturating_sub(left), bottom.saturating_sub(top))
    }

    /// Pixel count, zero for regions with a non-positive side
    #[must_use]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width) * i64::from(self.height)
        }
    }

    /// True when the region holds no pixels
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Exclusive right edge, saturating at the `i32` range
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at the `i32` range
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Geometric center
    #[must_use]
    pub fn center(&self) -> Point2<f32> {
        Point2::new(
            self.x as f32 + self.width as f32 * 0.5,
            self.y as f32 + self.height as f32 * 0.5,
        )
    }

    /// Overlap of two regions; the empty region when they do not overlap
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let width = self.right().min(other.right()).saturating_sub(x);
        let height = self.bottom().min(other.bottom()).saturating_sub(y);
        if width <= 0 || height <= 0 {
            Self::default()
        } else {
            Self::new(x, y, width, height)
        }
    }

    /// Restrict the region to a `width` x `height` frame
    #[must_use]
    pub fn clip_to(&self, width: i32, height: i32) -> Self {
        self.intersect(&Self::frame(width, height))
    }

    /// True when every pixel of the region lies inside a `width` x `height` frame
    #[must_use]
    pub const fn is_within(&self, width: i32, height: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.right() <= width && self.bottom() <= height
    }
}

/// Oriented rectangle produced by CamShift
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedRegion {
    /// Center in pixel coordinates
    pub center: Point2<f32>,
    /// Extent across the minor axis
    pub width: f32,
    /// Extent along the major axis
    pub height: f32,
    /// Rotation in degrees, in [0, 180)
    pub angle: f32,
}

impl Default for TrackedRegion {
    fn default() -> Self {
        Self {
            center: Point2::origin(),
            width: 0.0,
            height: 0.0,
            angle: 0.0,
        }
    }
}

/// 8-bit color in BGR channel order, matching camera frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Blue channel
    pub b: u8,
    /// Green channel
    pub g: u8,
    /// Red channel
    pub r: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const GREEN: Self = Self::new(0, 255, 0);

    /// Create a color from blue, green and red channels
    #[must_use]
    pub const fn new(b: u8, g: u8, r: u8) -> Self {
        Self { b, g, r }
    }

    /// Channels in memory order
    #[must_use]
    pub const fn to_bgr(self) -> [u8; 3] {
        [self.b, self.g, self.r]
    }

    /// Fully saturated, full-value color for an 8-bit hue in [0, 180)
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_hue(hue: f32) -> Self {
        let h = (hue.rem_euclid(180.0) * 2.0) / 60.0;
        let sector = h.floor();
        let frac = h - sector;
        let rise = (255.0 * frac).round() as u8;
        let fall = (255.0 * (1.0 - frac)).round() as u8;
        // (r, g, b) per 60 degree sector
        let (r, g, b) = match sector as u8 {
            0 => (255, rise, 0),
            1 => (fall, 255, 0),
            2 => (0, 255, rise),
            3 => (0, fall, 255),
            4 => (rise, 0, 255),
            _ => (255, 0, fall),
        };
        Self::new(b, g, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_overlapping() {
        let a = Region::new(0, 0, 10, 10);
        let b = Region::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Region::new(5, 5, 5, 5));
    }

    #[test]
    fn test_intersect_disjoint_is_empty() {
        let a = Region::new(0, 0, 10, 10);
        let b = Region::new(20, 20, 5, 5);
        let overlap = a.intersect(&b);
        assert!(overlap.is_empty());
        assert_eq!(overlap.area(), 0);
    }

    #[test]
    fn test_clip_to_frame() {
        let region = Region::new(-5, 90, 20, 20);
        assert_eq!(region.clip_to(100, 100), Region::new(0, 90, 15, 10));
        assert!(region.clip_to(100, 100).is_within(100, 100));
    }

    #[test]
    fn test_from_corners_any_order() {
        assert_eq!(Region::from_corners((10, 20), (4, 2)), Region::new(4, 2, 6, 18));
        assert_eq!(Region::from_corners((4, 2), (10, 20)), Region::new(4, 2, 6, 18));
    }

    #[test]
    fn test_negative_size_has_no_area() {
        assert_eq!(Region::new(0, 0, -3, 4).area(), 0);
    }

    #[test]
    fn test_edges_saturate_near_i32_limits() {
        let far = Region::new(i32::MAX - 5, 10, 100, 100);
        assert_eq!(far.right(), i32::MAX);
        assert!(far.clip_to(640, 480).is_empty());

        let wide = Region::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(wide.intersect(&Region::frame(10, 10)), Region::default());

        let spanning = Region::from_corners((-100, 0), (i32::MAX, 5));
        assert_eq!(spanning.width, i32::MAX);
        assert_eq!(spanning.clip_to(10, 10), Region::new(0, 0, 10, 5));
    }

    #[test]
    fn test_color_from_hue_primaries() {
        assert_eq!(Color::from_hue(0.0), Color::new(0, 0, 255));
        assert_eq!(Color::from_hue(60.0), Color::new(0, 255, 0));
        assert_eq!(Color::from_hue(120.0), Color::new(255, 0, 0));
    }
}
