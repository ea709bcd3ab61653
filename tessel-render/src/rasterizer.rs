//! Glyph rasterizers.
//!
//! The atlas asks a [`GlyphRasterizer`] for one coverage bitmap per
//! character and packs it into a fixed-size slot. [`FontdueRasterizer`]
//! renders a real TTF/OTF font; [`BlockRasterizer`] draws deterministic boxes
//! and is used when no font is configured.

use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::error::RenderError;

/// An 8-bit coverage bitmap positioned relative to the top-left of its slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    /// Row-major coverage, `width * height` bytes.
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    /// A bitmap with nothing to draw (whitespace).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

pub trait GlyphRasterizer: Send {
    /// Rasterize `ch` at `font_size` pixels for a slot of `slot` (w, h).
    fn rasterize(&mut self, ch: char, font_size: f32, slot: (u32, u32)) -> GlyphBitmap;

    fn name(&self) -> &'static str;
}

/// Deterministic box glyphs. ASCII boxes are narrow, everything else fills
/// the slot width; the interior pattern depends on the code point so
/// different characters produce different pixels.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockRasterizer;

impl GlyphRasterizer for BlockRasterizer {
    fn rasterize(&mut self, ch: char, font_size: f32, (slot_w, slot_h): (u32, u32)) -> GlyphBitmap {
        if ch.is_whitespace() || ch.is_control() || slot_w == 0 || slot_h == 0 {
            return GlyphBitmap::empty();
        }
        let fs = font_size.floor().max(1.0);
        let wide = if ch.is_ascii() { 0.5 } else { 0.85 };
        let width = ((fs * wide).round() as u32).clamp(1, slot_w);
        let height = ((fs * 0.7).round() as u32).clamp(1, slot_h);
        let seed = ch as u32;

        let mut coverage = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let edge = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
                let value = if edge || (x + y + seed) % 3 == 0 { 255 } else { 64 };
                coverage.push(value);
            }
        }

        GlyphBitmap {
            width,
            height,
            left: 0,
            top: ((slot_h - height) / 2) as i32,
            coverage,
        }
    }

    fn name(&self) -> &'static str {
        "block"
    }
}

/// Renders glyphs from a TTF/OTF font through fontdue.
pub struct FontdueRasterizer {
    font: Font,
}

impl std::fmt::Debug for FontdueRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontdueRasterizer").finish_non_exhaustive()
    }
}

impl FontdueRasterizer {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self { font })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path.as_ref())?;
        tracing::debug!("loaded font {} ({} bytes)", path.as_ref().display(), bytes.len());
        Self::from_bytes(&bytes)
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn rasterize(&mut self, ch: char, font_size: f32, (_, slot_h): (u32, u32)) -> GlyphBitmap {
        let (metrics, coverage) = self.font.rasterize(ch, font_size);
        if metrics.width == 0 || metrics.height == 0 {
            return GlyphBitmap::empty();
        }

        // Centre the line box vertically in the slot and sit the glyph on
        // its baseline.
        let (ascent, descent) = self
            .font
            .horizontal_line_metrics(font_size)
            .map(|lm| (lm.ascent, lm.descent))
            .unwrap_or((font_size * 0.8, -font_size * 0.2));
        let baseline = (slot_h as f32 - (ascent - descent)) / 2.0 + ascent;
        let top = (baseline - (metrics.height as f32 + metrics.ymin as f32)).round() as i32;

        GlyphBitmap {
            width: metrics.width as u32,
            height: metrics.height as u32,
            left: metrics.xmin,
            top,
            coverage,
        }
    }

    fn name(&self) -> &'static str {
        "fontdue"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_whitespace_is_empty() {
        let mut r = BlockRasterizer;
        assert!(r.rasterize(' ', 14.0, (12, 19)).is_empty());
        assert!(r.rasterize('\u{3000}', 14.0, (12, 19)).is_empty());
        assert!(r.rasterize('\t', 14.0, (12, 19)).is_empty());
    }

    #[test]
    fn block_glyphs_fit_their_slot() {
        let mut r = BlockRasterizer;
        for ch in ['A', 'g', '张', '。'] {
            let bmp = r.rasterize(ch, 14.0, (12, 19));
            assert!(bmp.width <= 12 && bmp.height <= 19, "{ch}");
            assert_eq!(bmp.coverage.len(), (bmp.width * bmp.height) as usize);
            assert!(bmp.top >= 0);
        }
    }

    #[test]
    fn block_is_deterministic_and_distinct() {
        let mut r = BlockRasterizer;
        assert_eq!(r.rasterize('张', 14.0, (12, 19)), r.rasterize('张', 14.0, (12, 19)));
        assert_ne!(r.rasterize('A', 14.0, (12, 19)), r.rasterize('B', 14.0, (12, 19)));
        assert!(r.rasterize('张', 14.0, (12, 19)).width > r.rasterize('A', 14.0, (12, 19)).width);
    }

    #[test]
    fn fontdue_rejects_garbage() {
        let err = FontdueRasterizer::from_bytes(b"not a font").unwrap_err();
        assert!(matches!(err, RenderError::Font(_)));
    }

    #[test]
    fn missing_font_file_is_io_error() {
        let err = FontdueRasterizer::from_file("/nonexistent/font.ttf").unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }
}
