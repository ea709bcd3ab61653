//! Glyph atlas for cached text rendering.
//!
//! Every glyph lives in one slot of a single backing surface. Slots form a
//! fixed grid of `chars_per_row` columns; all slots share one size derived
//! from the font size. A static charset is rasterized up front into the
//! first rows, and characters met later are appended after it into a
//! reserved region. Slots are never moved or evicted, so a
//! [`GlyphRecord`] stays valid until the atlas is rebuilt for a new font
//! size.
//!
//! Lookups are O(1): ASCII goes through a 128-entry array, everything else
//! through a `HashMap`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::AtlasError;
use crate::primitives::Rect;
use crate::raster::RasterBuffer;
use crate::rasterizer::GlyphRasterizer;

/// Size of the ASCII fast-path table.
const ASCII_CACHE_SIZE: usize = 128;

/// Largest font size glyphs are rasterized at. Larger requests (a fitted
/// grid with very few rows) draw at this size.
pub const MAX_FONT_SIZE: f32 = 48.0;

/// Largest backing surface an atlas config may ask for, at [`MAX_FONT_SIZE`].
pub const MAX_ATLAS_BYTES: u64 = 128 * 1024 * 1024;

/// Characters rasterized when the atlas is built: digits, Latin letters,
/// basic and full-width punctuation, and frequent Han characters.
pub const DEFAULT_STATIC_CHARSET: &str = concat!(
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz .,()-+%$#@!?:;=*&_",
    "\"'[]{}",
    "，。！？；：【】（）",
    "的一是在不了有和人这中大为上个国我以要他时来用们生到作地于出就分对成会可主发年动同工也能下过子说产种面而方后多定行学法所民得经十三之进着等部度家电力里如水化高自二理起小物现实加量都两体制机当使点从业本去把性好应开它合还因由其些然前外天政四日那社义事平形相全表间样与关各重新线内数正心反你明看原又么利比或但质气第向道命此变条只没结解问意建月公无系军很情者最立代想已通并提直题党程展五果料象员革位入常文总次品式活设及管特件长求老头基资边流路级少图山统接知较将组见计别她手角期根论运农指几九区强放决西被干做必战先回则任取据处队南给色光门即保治北造百规热领七海口东导器压志世金增争济阶油思术极交受联什认六共权收证改清己美再采转更单风切打白教速花带安场身车例真务具万每目至达走积示议声报斗完类八离华名确才科张信马节话米整空元况今集温传土许步群广石记需段研界拉林律叫且究观越织装影算低持音众书布复容儿须际商非验连断深难近矿千周委素技备半办青省列习响约支般史感劳便团往酸历市克何除消构府称太准精值号率族维划选标写存候毛亲快效斯院查江型眼王按格养易置派层片始却专状育厂京识适属圆包火住调满县局照参红细引听该铁价严龙城拿兵位乐",
);

/// Atlas layout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub chars_per_row: u32,
    /// Rows kept free for characters discovered at runtime.
    pub reserve_rows: u32,
    /// Replaces [`DEFAULT_STATIC_CHARSET`] when set.
    pub static_charset: Option<String>,
}

impl AtlasConfig {
    /// The static charset with unrenderable characters and repeats removed.
    pub fn static_chars(&self) -> Vec<char> {
        let mut seen = HashSet::new();
        self.static_charset
            .as_deref()
            .unwrap_or(DEFAULT_STATIC_CHARSET)
            .chars()
            .filter(|&ch| is_renderable(ch) && seen.insert(ch))
            .collect()
    }

    /// Bytes of the backing surface an atlas built at `font_size` allocates.
    pub fn surface_bytes(&self, font_size: f32) -> u64 {
        let metrics = GlyphMetrics::for_font_size(font_size);
        let per_row = u64::from(self.chars_per_row.max(1));
        let static_rows = (self.static_chars().len() as u64).div_ceil(per_row);
        let rows = static_rows + u64::from(self.reserve_rows);
        let pixels = per_row * u64::from(metrics.slot_width) * rows * u64::from(metrics.slot_height);
        pixels * std::mem::size_of::<crate::raster::Rgba8>() as u64
    }
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            chars_per_row: 128,
            reserve_rows: 50,
            static_charset: None,
        }
    }
}

/// Width class used by layout: ASCII is narrow, everything else is wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Ascii,
    Wide,
}

impl CharClass {
    #[inline]
    pub fn of(ch: char) -> Self {
        if (ch as u32) < 128 { Self::Ascii } else { Self::Wide }
    }
}

/// Per-session size constants, all derived from the floored font size.
///
/// The font size is clamped to `1..=MAX_FONT_SIZE`.
///
/// Advances come from these constants rather than per-glyph font metrics,
/// which keeps measurement and drawing identical by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    pub font_size: f32,
    pub slot_width: u32,
    pub slot_height: u32,
    pub fixed_char_width: f32,
    pub ascii_spacing: f32,
    pub cjk_spacing: f32,
}

impl GlyphMetrics {
    pub fn for_font_size(font_size: f32) -> Self {
        let fs = font_size.floor().clamp(1.0, MAX_FONT_SIZE);
        Self {
            font_size: fs,
            slot_width: (fs * 0.85).ceil() as u32,
            slot_height: (fs * 1.3).ceil() as u32,
            fixed_char_width: (fs * 0.6).ceil(),
            ascii_spacing: (fs * -0.2).ceil(),
            cjk_spacing: (fs * 0.1).ceil(),
        }
    }

    #[inline]
    pub fn display_width(&self, ch: char) -> f32 {
        match CharClass::of(ch) {
            CharClass::Ascii => self.fixed_char_width,
            CharClass::Wide => self.fixed_char_width * 1.5,
        }
    }

    #[inline]
    pub fn spacing(&self, ch: char) -> f32 {
        match CharClass::of(ch) {
            CharClass::Ascii => self.ascii_spacing,
            CharClass::Wide => self.cjk_spacing,
        }
    }

    /// Pen advance: display width plus spacing.
    #[inline]
    pub fn advance(&self, ch: char) -> f32 {
        self.display_width(ch) + self.spacing(ch)
    }
}

/// One cached glyph. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphRecord {
    /// Slot rectangle in the atlas surface.
    pub source_rect: Rect,
    pub advance_width: f32,
    pub display_width: f32,
}

/// Whether a character may be placed in the atlas. Control characters other
/// than tab, newline and carriage return are rejected, as are Unicode
/// non-characters.
pub fn is_renderable(ch: char) -> bool {
    let cp = ch as u32;
    if cp < 32 {
        return matches!(ch, '\t' | '\n' | '\r');
    }
    !((0xFDD0..=0xFDEF).contains(&cp) || cp & 0xFFFE == 0xFFFE)
}

/// Append-only glyph cache backed by one raster surface.
pub struct GlyphAtlas {
    config: AtlasConfig,
    metrics: GlyphMetrics,
    rasterizer: Box<dyn GlyphRasterizer>,
    surface: RasterBuffer,
    /// Fast O(1) lookup for ASCII characters.
    ascii: [Option<GlyphRecord>; ASCII_CACHE_SIZE],
    /// Everything else.
    glyphs: HashMap<char, GlyphRecord>,
    static_count: usize,
    dynamic_count: usize,
    /// First row of the dynamic region.
    dynamic_start_row: u32,
    total_rows: u32,
    /// Next free dynamic slot.
    dyn_col: u32,
    dyn_row: u32,
    dynamic_growth: bool,
    rasterized: u64,
    /// Characters already reported as not fitting.
    warned: HashSet<char>,
}

impl std::fmt::Debug for GlyphAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphAtlas")
            .field("rasterizer", &self.rasterizer.name())
            .field("metrics", &self.metrics)
            .field("static_count", &self.static_count)
            .field("dynamic_count", &self.dynamic_count)
            .finish_non_exhaustive()
    }
}

impl GlyphAtlas {
    /// Build an atlas and rasterize the static charset.
    pub fn new(config: AtlasConfig, font_size: f32, rasterizer: Box<dyn GlyphRasterizer>) -> Self {
        let mut atlas = Self {
            config,
            metrics: GlyphMetrics::for_font_size(font_size),
            rasterizer,
            surface: RasterBuffer::new(0, 0),
            ascii: [None; ASCII_CACHE_SIZE],
            glyphs: HashMap::new(),
            static_count: 0,
            dynamic_count: 0,
            dynamic_start_row: 0,
            total_rows: 0,
            dyn_col: 0,
            dyn_row: 0,
            dynamic_growth: true,
            rasterized: 0,
            warned: HashSet::new(),
        };
        atlas.build(font_size);
        atlas
    }

    /// Throw away every slot and rebuild for a new font size. Records handed
    /// out earlier are invalid afterwards.
    pub fn rebuild(&mut self, font_size: f32) {
        self.build(font_size);
    }

    fn build(&mut self, font_size: f32) {
        self.metrics = GlyphMetrics::for_font_size(font_size);
        let per_row = self.per_row();
        let charset = self.config.static_chars();

        let static_rows = (charset.len() as u32).div_ceil(per_row);
        self.dynamic_start_row = static_rows;
        self.total_rows = static_rows + self.config.reserve_rows;
        self.surface = RasterBuffer::new(
            per_row * self.metrics.slot_width,
            self.total_rows * self.metrics.slot_height,
        );
        self.ascii = [None; ASCII_CACHE_SIZE];
        self.glyphs.clear();
        self.warned.clear();

        for (i, &ch) in charset.iter().enumerate() {
            let i = i as u32;
            self.place(ch, i / per_row, i % per_row);
        }
        self.static_count = charset.len();
        self.dynamic_count = 0;
        self.dyn_row = static_rows;
        self.dyn_col = 0;

        tracing::debug!(
            "glyph atlas built: {} static glyphs, {}x{} slots, {} reserve rows ({})",
            self.static_count,
            self.metrics.slot_width,
            self.metrics.slot_height,
            self.config.reserve_rows,
            self.rasterizer.name()
        );
    }

    #[inline]
    fn per_row(&self) -> u32 {
        self.config.chars_per_row.max(1)
    }

    /// Rasterize `ch` into slot `(row, col)` and record it.
    fn place(&mut self, ch: char, row: u32, col: u32) -> GlyphRecord {
        let (sw, sh) = (self.metrics.slot_width, self.metrics.slot_height);
        let slot = Rect::new((col * sw) as f32, (row * sh) as f32, sw as f32, sh as f32);

        let bitmap = self.rasterizer.rasterize(ch, self.metrics.font_size, (sw, sh));
        self.rasterized += 1;
        if !bitmap.is_empty() {
            self.surface.write_mask(
                slot.x as i32 + bitmap.left,
                slot.y as i32 + bitmap.top,
                bitmap.width,
                bitmap.height,
                &bitmap.coverage,
                slot,
            );
        }

        let record = GlyphRecord {
            source_rect: slot,
            advance_width: self.metrics.advance(ch),
            display_width: self.metrics.display_width(ch),
        };
        match self.ascii.get_mut(ch as usize) {
            Some(entry) => *entry = Some(record),
            None => {
                self.glyphs.insert(ch, record);
            }
        }
        record
    }

    /// Look up a cached glyph without rasterizing.
    #[inline]
    pub fn get(&self, ch: char) -> Option<GlyphRecord> {
        match self.ascii.get(ch as usize) {
            Some(entry) => *entry,
            None => self.glyphs.get(&ch).copied(),
        }
    }

    /// Get a glyph, rasterizing it into the next dynamic slot if needed.
    pub fn try_ensure(&mut self, ch: char) -> Result<GlyphRecord, AtlasError> {
        if let Some(record) = self.get(ch) {
            return Ok(record);
        }
        if !is_renderable(ch) {
            return Err(AtlasError::InvalidCharacter(ch));
        }
        if !self.dynamic_growth {
            return Err(AtlasError::GrowthDisabled(ch));
        }
        if self.dyn_row >= self.total_rows {
            return Err(AtlasError::OutOfCapacity(ch));
        }

        let (row, col) = (self.dyn_row, self.dyn_col);
        let record = self.place(ch, row, col);
        self.dynamic_count += 1;
        self.dyn_col += 1;
        if self.dyn_col >= self.per_row() {
            self.dyn_col = 0;
            self.dyn_row += 1;
        }
        tracing::debug!(
            "atlas: added {:?} (U+{:04X}) at ({}, {}), {} dynamic glyphs",
            ch,
            ch as u32,
            row,
            col,
            self.dynamic_count
        );
        Ok(record)
    }

    /// Like [`try_ensure`](Self::try_ensure) but maps every failure to
    /// `None`. Capacity exhaustion is logged once per character.
    pub fn ensure(&mut self, ch: char) -> Option<GlyphRecord> {
        match self.try_ensure(ch) {
            Ok(record) => Some(record),
            Err(AtlasError::OutOfCapacity(ch)) => {
                if self.warned.insert(ch) {
                    tracing::warn!("glyph atlas full, rendering {:?} as blank", ch);
                }
                None
            }
            Err(_) => None,
        }
    }

    /// `(row, col)` of the slot holding `ch`, if cached.
    pub fn slot_of(&self, ch: char) -> Option<(u32, u32)> {
        let rect = self.get(ch)?.source_rect;
        Some((
            rect.y as u32 / self.metrics.slot_height,
            rect.x as u32 / self.metrics.slot_width,
        ))
    }

    pub fn set_dynamic_growth(&mut self, enabled: bool) {
        self.dynamic_growth = enabled;
    }

    pub fn dynamic_growth(&self) -> bool {
        self.dynamic_growth
    }

    pub fn metrics(&self) -> &GlyphMetrics {
        &self.metrics
    }

    /// Backing surface holding every glyph as a white coverage mask.
    pub fn surface(&self) -> &RasterBuffer {
        &self.surface
    }

    /// Total rasterizer invocations since the last (re)build.
    pub fn rasterized_count(&self) -> u64 {
        self.rasterized
    }

    pub fn static_count(&self) -> usize {
        self.static_count
    }

    pub fn dynamic_count(&self) -> usize {
        self.dynamic_count
    }

    /// Cached glyphs.
    pub fn len(&self) -> usize {
        self.static_count + self.dynamic_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots in the dynamic region.
    pub fn dynamic_capacity(&self) -> usize {
        (self.config.reserve_rows * self.per_row()) as usize
    }

    pub fn remaining_capacity(&self) -> usize {
        self.dynamic_capacity().saturating_sub(self.dynamic_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::BlockRasterizer;

    fn atlas_with(config: AtlasConfig) -> GlyphAtlas {
        GlyphAtlas::new(config, 14.0, Box::new(BlockRasterizer))
    }

    fn small_atlas() -> GlyphAtlas {
        atlas_with(AtlasConfig {
            chars_per_row: 4,
            reserve_rows: 1,
            static_charset: Some("ab".into()),
        })
    }

    #[test]
    fn metrics_for_fourteen_px() {
        let m = GlyphMetrics::for_font_size(14.7);
        assert_eq!(m.font_size, 14.0);
        assert_eq!(m.slot_width, 12);
        assert_eq!(m.slot_height, 19);
        assert_eq!(m.fixed_char_width, 9.0);
        assert_eq!(m.ascii_spacing, -2.0);
        assert_eq!(m.cjk_spacing, 2.0);
        assert_eq!(m.advance('A'), 7.0);
        assert_eq!(m.advance('张'), 15.5);
    }

    #[test]
    fn font_size_is_capped() {
        let m = GlyphMetrics::for_font_size(256.0);
        assert_eq!(m.font_size, MAX_FONT_SIZE);
        assert_eq!(m, GlyphMetrics::for_font_size(MAX_FONT_SIZE));
        assert_eq!(GlyphMetrics::for_font_size(0.2).font_size, 1.0);
    }

    #[test]
    fn surface_bytes_matches_built_surface() {
        let config = AtlasConfig {
            reserve_rows: 2,
            ..AtlasConfig::default()
        };
        let atlas = GlyphAtlas::new(config.clone(), 300.0, Box::new(BlockRasterizer));
        let surface = atlas.surface();
        assert_eq!(
            config.surface_bytes(300.0),
            u64::from(surface.width()) * u64::from(surface.height()) * 4
        );
        assert!(AtlasConfig::default().surface_bytes(300.0) <= MAX_ATLAS_BYTES);
    }

    #[test]
    fn renderable_filter() {
        assert!(is_renderable('a'));
        assert!(is_renderable('\t'));
        assert!(is_renderable('\n'));
        assert!(is_renderable('\r'));
        assert!(is_renderable('张'));
        assert!(!is_renderable('\u{0}'));
        assert!(!is_renderable('\u{1b}'));
        assert!(!is_renderable('\u{FDD0}'));
        assert!(!is_renderable('\u{FFFE}'));
        assert!(!is_renderable('\u{1FFFF}'));
    }

    #[test]
    fn static_charset_is_prepopulated_once() {
        let atlas = atlas_with(AtlasConfig {
            static_charset: Some("aab张张".into()),
            ..AtlasConfig::default()
        });
        assert_eq!(atlas.static_count(), 3);
        assert_eq!(atlas.rasterized_count(), 3);
        assert_eq!(atlas.slot_of('b'), Some((0, 1)));
        assert_eq!(atlas.slot_of('张'), Some((0, 2)));
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut atlas = small_atlas();
        let first = atlas.ensure('龘').unwrap();
        let count = atlas.rasterized_count();
        let second = atlas.ensure('龘').unwrap();
        assert_eq!(first, second);
        assert_eq!(atlas.rasterized_count(), count);
    }

    #[test]
    fn dynamic_glyphs_start_after_static_rows() {
        let mut atlas = small_atlas();
        atlas.ensure('x').unwrap();
        // "ab" fills part of row 0; dynamic slots begin on row 1.
        assert_eq!(atlas.slot_of('x'), Some((1, 0)));
        assert_eq!(atlas.get('x').map(|r| r.display_width), Some(9.0));
    }

    #[test]
    fn capacity_exhaustion_is_not_fatal() {
        let mut atlas = small_atlas();
        for ch in ['c', 'd', 'e', 'f'] {
            assert!(atlas.ensure(ch).is_some());
        }
        assert_eq!(atlas.remaining_capacity(), 0);
        assert_eq!(atlas.try_ensure('g'), Err(AtlasError::OutOfCapacity('g')));
        assert_eq!(atlas.ensure('g'), None);
        assert_eq!(atlas.ensure('g'), None);
        // Existing glyphs keep resolving.
        assert!(atlas.ensure('a').is_some());
        assert!(atlas.ensure('f').is_some());
    }

    #[test]
    fn invalid_and_disabled() {
        let mut atlas = small_atlas();
        assert_eq!(atlas.try_ensure('\u{7}'), Err(AtlasError::InvalidCharacter('\u{7}')));
        atlas.set_dynamic_growth(false);
        assert_eq!(atlas.try_ensure('z'), Err(AtlasError::GrowthDisabled('z')));
        assert!(atlas.ensure('a').is_some());
    }

    #[test]
    fn glyph_pixels_land_inside_their_slot() {
        let mut atlas = small_atlas();
        let record = atlas.ensure('张').unwrap();
        let inside = atlas.surface().count_opaque(record.source_rect);
        assert!(inside > 0);
        let total = atlas.surface().count_opaque(atlas.surface().bounds());
        let a = atlas.surface().count_opaque(atlas.get('a').unwrap().source_rect);
        let b = atlas.surface().count_opaque(atlas.get('b').unwrap().source_rect);
        assert_eq!(total, inside + a + b);
    }

    #[test]
    fn rebuild_resets_dynamic_region() {
        let mut atlas = small_atlas();
        atlas.ensure('x').unwrap();
        atlas.rebuild(20.0);
        assert_eq!(atlas.metrics().slot_width, 17);
        assert_eq!(atlas.dynamic_count(), 0);
        assert!(atlas.get('x').is_none());
        assert!(atlas.get('a').is_some());
    }

    #[test]
    fn default_charset_has_no_duplicates_in_slots() {
        let atlas = atlas_with(AtlasConfig::default());
        let distinct: HashSet<char> = DEFAULT_STATIC_CHARSET.chars().collect();
        assert_eq!(atlas.static_count(), distinct.len());
        assert!(atlas.get('张').is_some());
        assert!(atlas.get('，').is_some());
    }
}
