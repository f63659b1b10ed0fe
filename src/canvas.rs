//! BGR raster the renderer and diagnostic views draw into.

use crate::{
    frame_processor::Frame,
    geometry::{Color, Region, TrackedRegion},
    utils::safe_cast::usize_to_i32,
};
use image::{imageops, GenericImage, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_line_segment_mut},
    rect::Rect,
};
use nalgebra::Point2;
use ndarray::Array2;

/// Number of segments used to approximate an ellipse outline
const ELLIPSE_SEGMENTS: usize = 72;

/// Drawable image whose three channels hold blue, green and red, in that order
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    /// Canvas of the given size filled with `background`
    #[must_use]
    pub fn new(width: usize, height: usize, background: Color) -> Self {
        Self {
            image: RgbImage::from_pixel(dim(width), dim(height), bgr_pixel(background)),
        }
    }

    /// Copy of a camera frame
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Self {
        let pixels = frame.pixels();
        Self {
            image: RgbImage::from_fn(dim(frame.width()), dim(frame.height()), |x, y| {
                let (x, y) = (x as usize, y as usize);
                Rgb([pixels[[y, x, 0]], pixels[[y, x, 1]], pixels[[y, x, 2]]])
            }),
        }
    }

    /// Gray image expanded to three equal channels
    #[must_use]
    pub fn from_gray(gray: &Array2<u8>) -> Self {
        let (rows, cols) = gray.dim();
        Self {
            image: RgbImage::from_fn(dim(cols), dim(rows), |x, y| Rgb([gray[[y as usize, x as usize]]; 3])),
        }
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> usize {
        self.image.width() as usize
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> usize {
        self.image.height() as usize
    }

    /// Underlying image, row-major with interleaved BGR bytes
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Color at `(x, y)`, `None` outside the canvas
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        let (x, y) = (u32::try_from(x).ok()?, u32::try_from(y).ok()?);
        if x >= self.image.width() || y >= self.image.height() {
            return None;
        }
        let [b, g, r] = self.image.get_pixel(x, y).0;
        Some(Color::new(b, g, r))
    }

    /// Overwrite every pixel with `color`
    pub fn fill(&mut self, color: Color) {
        let pixel = bgr_pixel(color);
        self.image.pixels_mut().for_each(|p| *p = pixel);
    }

    /// Fill the part of `region` that lies on the canvas
    pub fn fill_region(&mut self, region: Region, color: Color) {
        if let Some((x, y, width, height)) = self.visible_span(region) {
            let rect = Rect::at(x as i32, y as i32).of_size(width, height);
            draw_filled_rect_mut(&mut self.image, rect, bgr_pixel(color));
        }
    }

    /// Invert the colors inside `region`
    pub fn invert_region(&mut self, region: Region) {
        if let Some((x, y, width, height)) = self.visible_span(region) {
            imageops::invert(&mut *self.image.sub_image(x, y, width, height));
        }
    }

    /// Draw a one pixel wide segment, clipped to the canvas
    ///
    /// Segments with a non-finite endpoint are skipped.
    pub fn draw_line(&mut self, from: Point2<f32>, to: Point2<f32>, color: Color) {
        let (width, height) = (self.image.width() as f32, self.image.height() as f32);
        if let Some((a, b)) = clip_segment(from, to, width, height) {
            draw_line_segment_mut(
                &mut self.image,
                (a.x.round(), a.y.round()),
                (b.x.round(), b.y.round()),
                bgr_pixel(color),
            );
        }
    }

    /// Outline of the ellipse inscribed in an oriented rectangle
    ///
    /// A thick outline is drawn as concentric rings one pixel apart.
    pub fn draw_ellipse(&mut self, region: &TrackedRegion, color: Color, thickness: u32) {
        let (sin, cos) = region.angle.to_radians().sin_cos();
        let rings = thickness.max(1);
        let half = (rings - 1) as f32 * 0.5;
        for ring in 0..rings {
            let grow = ring as f32 - half;
            let a = (region.width * 0.5 + grow).max(0.0);
            let b = (region.height * 0.5 + grow).max(0.0);
            let point = |i: usize| {
                let t = i as f32 * std::f32::consts::TAU / ELLIPSE_SEGMENTS as f32;
                let (st, ct) = t.sin_cos();
                Point2::new(
                    region.center.x + a * ct * cos - b * st * sin,
                    region.center.y + a * ct * sin + b * st * cos,
                )
            };
            for i in 0..ELLIPSE_SEGMENTS {
                self.draw_line(point(i), point(i + 1), color);
            }
        }
    }

    /// Origin and size of the part of `region` on the canvas
    fn visible_span(&self, region: Region) -> Option<(u32, u32, u32, u32)> {
        let width = usize_to_i32(self.width()).ok()?;
        let height = usize_to_i32(self.height()).ok()?;
        let visible = region.clip_to(width, height);
        if visible.is_empty() {
            return None;
        }
        Some((
            u32::try_from(visible.x).ok()?,
            u32::try_from(visible.y).ok()?,
            u32::try_from(visible.width).ok()?,
            u32::try_from(visible.height).ok()?,
        ))
    }

    /// Number of pixels that differ from `color`
    #[must_use]
    pub fn count_not(&self, color: Color) -> usize {
        let pixel = bgr_pixel(color);
        self.image.pixels().filter(|&&p| p != pixel).count()
    }
}

fn bgr_pixel(color: Color) -> Rgb<u8> {
    Rgb(color.to_bgr())
}

fn dim(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Part of a segment inside `[-1, width] x [-1, height]` (Liang-Barsky)
///
/// `None` when the segment misses that box or is not finite.
fn clip_segment(from: Point2<f32>, to: Point2<f32>, width: f32, height: f32) -> Option<(Point2<f32>, Point2<f32>)> {
    let delta = to - from;
    if !(from.x.is_finite() && from.y.is_finite() && delta.x.is_finite() && delta.y.is_finite()) {
        return None;
    }

    let (mut t0, mut t1) = (0.0_f32, 1.0_f32);
    let edges = [
        (-delta.x, from.x + 1.0),
        (delta.x, width - from.x),
        (-delta.y, from.y + 1.0),
        (delta.y, height - from.y),
    ];
    for (p, q) in edges {
        if p.abs() < f32::EPSILON {
            if q < 0.0 {
                return None;
            }
        } else if p < 0.0 {
            t0 = t0.max(q / p);
        } else {
            t1 = t1.min(q / p);
        }
        if t0 > t1 {
            return None;
        }
    }

    // Rounding on far endpoints can land just outside the box
    let clamp = |p: Point2<f32>| Point2::new(p.x.clamp(-1.0, width), p.y.clamp(-1.0, height));
    Some((clamp(from + delta * t0), clamp(from + delta * t1)))
}
