//! CPU raster surfaces.
//!
//! Layers, the glyph atlas and the headless target are all [`RasterBuffer`]s:
//! a flat RGBA8 pixel vector with straight alpha. Pixel coverage follows
//! centre sampling, so a pixel is inside a rectangle when its centre is.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::primitives::{Color, Point, Rect, Size};

/// One RGBA8 pixel. `#[repr(C)]` so a whole buffer can be viewed as bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0 };

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Source-over blend of `color` at `coverage` (0.0-1.0) onto `self`.
    #[inline]
    pub fn over(self, color: Color, coverage: f32) -> Self {
        let sa = (color.a * coverage).clamp(0.0, 1.0);
        if sa <= 0.0 {
            return self;
        }
        if sa >= 1.0 {
            let [r, g, b, a] = color.with_alpha(1.0).to_rgba8();
            return Self { r, g, b, a };
        }
        let da = self.a as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        let mix = |s: f32, d: u8| {
            let d = d as f32 / 255.0;
            let v = (s * sa + d * da * (1.0 - sa)) / out_a;
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        };
        Self {
            r: mix(color.r, self.r),
            g: mix(color.g, self.g),
            b: mix(color.b, self.b),
            a: (out_a.clamp(0.0, 1.0) * 255.0).round() as u8,
        }
    }

    #[inline]
    pub fn to_color(self) -> Color {
        Color::rgba8(self.r, self.g, self.b, self.a)
    }
}

/// A straight line from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub from: Point,
    pub to: Point,
}

impl LineSegment {
    #[inline]
    pub const fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }

    /// Distance from `p` to the closest point on the segment.
    fn distance_to(&self, p: Point) -> f32 {
        let d = self.to - self.from;
        let len_sq = d.x * d.x + d.y * d.y;
        if len_sq == 0.0 {
            return p.distance(self.from);
        }
        let t = (((p.x - self.from.x) * d.x + (p.y - self.from.y) * d.y) / len_sq).clamp(0.0, 1.0);
        p.distance(Point::new(self.from.x + t * d.x, self.from.y + t * d.y))
    }
}

/// The drawing operations the engine needs from a target.
pub trait Surface {
    /// Surface size in pixels.
    fn size(&self) -> (u32, u32);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Stroke every segment with a round-capped line `width` pixels wide.
    fn stroke_path(&mut self, segments: &[LineSegment], width: f32, color: Color);

    /// Copy `src_rect` of `src` into `dst_rect`, scaling with nearest-neighbour
    /// sampling. With a tint the source is treated as a coverage mask: its
    /// alpha modulates `tint` and its color channels are ignored.
    fn blit(&mut self, src: &RasterBuffer, src_rect: Rect, dst_rect: Rect, tint: Option<Color>);

    /// Reset a region to fully transparent.
    fn clear_rect(&mut self, rect: Rect);
}

/// An owned RGBA8 pixel buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl std::fmt::Debug for RasterBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl RasterBuffer {
    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba8::TRANSPARENT; width as usize * height as usize],
        }
    }

    /// Resize and clear.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize, Rgba8::TRANSPARENT);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The whole buffer as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::of_size(Size::new(self.width as f32, self.height as f32))
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Rgba8::TRANSPARENT);
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, value: Rgba8) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.pixels[idx] = value;
        }
    }

    pub fn pixels(&self) -> &[Rgba8] {
        &self.pixels
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Write a white coverage mask at `(x, y)`, clipped to `clip`.
    ///
    /// Used by the atlas: glyphs are stored as white plus alpha so they can
    /// be tinted to any color at blit time.
    pub fn write_mask(&mut self, x: i32, y: i32, width: u32, height: u32, coverage: &[u8], clip: Rect) {
        let xs = span(clip.x, clip.right(), self.width);
        let ys = span(clip.y, clip.bottom(), self.height);
        for row in 0..height {
            let py = y + row as i32;
            if py < 0 || !ys.contains(&(py as u32)) {
                continue;
            }
            for col in 0..width {
                let px = x + col as i32;
                if px < 0 || !xs.contains(&(px as u32)) {
                    continue;
                }
                let alpha = coverage
                    .get((row * width + col) as usize)
                    .copied()
                    .unwrap_or(0);
                self.set_pixel(px as u32, py as u32, Rgba8::new(255, 255, 255, alpha));
            }
        }
    }

    /// Number of pixels with non-zero alpha inside `rect`.
    pub fn count_opaque(&self, rect: Rect) -> usize {
        let xs = span(rect.x, rect.right(), self.width);
        let ys = span(rect.y, rect.bottom(), self.height);
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| self.pixel(x, y).is_some_and(|p| p.a > 0))
            .count()
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Pixel indices whose centres lie in `[start, end)`, clamped to `limit`.
#[inline]
fn span(start: f32, end: f32, limit: u32) -> Range<u32> {
    let lo = start.round().clamp(0.0, limit as f32) as u32;
    let hi = end.round().clamp(0.0, limit as f32) as u32;
    lo..hi.max(lo)
}

impl Surface for RasterBuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        for y in span(rect.y, rect.bottom(), self.height) {
            for x in span(rect.x, rect.right(), self.width) {
                let idx = self.index(x, y);
                self.pixels[idx] = self.pixels[idx].over(color, 1.0);
            }
        }
    }

    fn stroke_path(&mut self, segments: &[LineSegment], width: f32, color: Color) {
        let half = width / 2.0;
        for seg in segments {
            let min_x = seg.from.x.min(seg.to.x) - half;
            let max_x = seg.from.x.max(seg.to.x) + half;
            let min_y = seg.from.y.min(seg.to.y) - half;
            let max_y = seg.from.y.max(seg.to.y) + half;
            let xs = (min_x.floor().max(0.0) as u32)..(max_x.ceil().clamp(0.0, self.width as f32) as u32);
            let ys = (min_y.floor().max(0.0) as u32)..(max_y.ceil().clamp(0.0, self.height as f32) as u32);
            for y in ys {
                for x in xs.clone() {
                    let centre = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                    if seg.distance_to(centre) <= half {
                        let idx = self.index(x, y);
                        self.pixels[idx] = self.pixels[idx].over(color, 1.0);
                    }
                }
            }
        }
    }

    fn blit(&mut self, src: &RasterBuffer, src_rect: Rect, dst_rect: Rect, tint: Option<Color>) {
        if dst_rect.is_empty() || src_rect.is_empty() {
            return;
        }
        let scale_x = src_rect.width / dst_rect.width;
        let scale_y = src_rect.height / dst_rect.height;
        let src_x = span(src_rect.x, src_rect.right(), src.width);
        let src_y = span(src_rect.y, src_rect.bottom(), src.height);
        if src_x.is_empty() || src_y.is_empty() {
            return;
        }

        for y in span(dst_rect.y, dst_rect.bottom(), self.height) {
            let sy = (src_rect.y + (y as f32 + 0.5 - dst_rect.y) * scale_y).floor() as i64;
            let sy = sy.clamp(src_y.start as i64, src_y.end as i64 - 1) as u32;
            for x in span(dst_rect.x, dst_rect.right(), self.width) {
                let sx = (src_rect.x + (x as f32 + 0.5 - dst_rect.x) * scale_x).floor() as i64;
                let sx = sx.clamp(src_x.start as i64, src_x.end as i64 - 1) as u32;
                let Some(sample) = src.pixel(sx, sy) else {
                    continue;
                };
                if sample.a == 0 {
                    continue;
                }
                let idx = self.index(x, y);
                self.pixels[idx] = match tint {
                    Some(color) => self.pixels[idx].over(color, sample.a as f32 / 255.0),
                    None => self.pixels[idx].over(sample.to_color(), 1.0),
                };
            }
        }
    }

    fn clear_rect(&mut self, rect: Rect) {
        for y in span(rect.y, rect.bottom(), self.height) {
            for x in span(rect.x, rect.right(), self.width) {
                let idx = self.index(x, y);
                self.pixels[idx] = Rgba8::TRANSPARENT;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(1.0, 0.0, 0.0);

    #[test]
    fn fill_uses_pixel_centres() {
        let mut buf = RasterBuffer::new(10, 10);
        buf.fill_rect(Rect::new(2.0, 2.0, 3.0, 3.0), RED);
        assert_eq!(buf.count_opaque(buf.bounds()), 9);
        assert_eq!(buf.pixel(2, 2), Some(Rgba8::new(255, 0, 0, 255)));
        assert_eq!(buf.pixel(5, 5), Some(Rgba8::TRANSPARENT));
    }

    #[test]
    fn fill_is_clipped_to_bounds() {
        let mut buf = RasterBuffer::new(4, 4);
        buf.fill_rect(Rect::new(-10.0, -10.0, 100.0, 100.0), RED);
        assert_eq!(buf.count_opaque(buf.bounds()), 16);
    }

    #[test]
    fn translucent_over_opaque_stays_opaque() {
        let base = Rgba8::new(255, 255, 255, 255);
        let out = base.over(Color::rgb(0.0, 0.0, 1.0).with_alpha(0.5), 1.0);
        assert_eq!(out.a, 255);
        assert_eq!(out.b, 255);
        assert!(out.r > 120 && out.r < 135);
    }

    #[test]
    fn clear_rect_only_touches_region() {
        let mut buf = RasterBuffer::new(8, 8);
        buf.fill_rect(buf.bounds(), RED);
        buf.clear_rect(Rect::new(0.0, 0.0, 4.0, 8.0));
        assert_eq!(buf.count_opaque(buf.bounds()), 32);
    }

    #[test]
    fn horizontal_stroke_on_pixel_centre_is_one_row() {
        let mut buf = RasterBuffer::new(10, 10);
        let seg = LineSegment::new(Point::new(0.0, 4.5), Point::new(10.0, 4.5));
        buf.stroke_path(&[seg], 1.0, RED);
        assert_eq!(buf.count_opaque(buf.bounds()), 10);
        assert!(buf.pixel(3, 4).is_some_and(|p| p.a == 255));
    }

    #[test]
    fn tinted_blit_uses_mask_alpha() {
        let mut mask = RasterBuffer::new(2, 1);
        mask.write_mask(0, 0, 2, 1, &[255, 0], mask.bounds());

        let mut dst = RasterBuffer::new(4, 2);
        dst.blit(&mask, mask.bounds(), Rect::new(0.0, 0.0, 4.0, 2.0), Some(RED));
        // Left half scaled from the opaque texel, right half from the empty one.
        assert_eq!(dst.pixel(1, 1), Some(Rgba8::new(255, 0, 0, 255)));
        assert_eq!(dst.pixel(2, 0), Some(Rgba8::TRANSPARENT));
    }

    #[test]
    fn untinted_blit_copies_pixels() {
        let mut src = RasterBuffer::new(3, 3);
        src.fill_rect(src.bounds(), RED);
        let mut dst = RasterBuffer::new(3, 3);
        dst.blit(&src, src.bounds(), dst.bounds(), None);
        assert_eq!(dst.as_bytes(), src.as_bytes());
    }

    #[test]
    fn as_bytes_is_rgba_row_major() {
        let mut buf = RasterBuffer::new(2, 1);
        buf.set_pixel(1, 0, Rgba8::new(1, 2, 3, 4));
        assert_eq!(buf.as_bytes(), &[0, 0, 0, 0, 1, 2, 3, 4]);
    }
}
