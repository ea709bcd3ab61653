//! Text measurement, wrapping and caret placement.
//!
//! All widths come from [`GlyphMetrics::advance`], the same function the
//! painter uses to move its pen, so a measured line and a drawn line always
//! agree.

use std::ops::Range;

use crate::atlas::GlyphMetrics;
use crate::primitives::{Point, Rect};

/// Horizontal room lost to cell padding.
pub const CELL_TEXT_PADDING: f32 = 10.0;

/// Multi-line text uses this multiple of the slot height per line.
const LINE_HEIGHT_FACTOR: f32 = 1.1;

/// Caret height as a fraction of the slot height.
const CARET_HEIGHT_FACTOR: f32 = 0.8;

/// One visual line produced by [`TextLayout::wrap`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedLine {
    /// Byte range into the source text.
    pub byte_range: Range<usize>,
    /// Char index of the first character in the source text.
    pub start: usize,
    /// Number of chars.
    pub len: usize,
    pub width: f32,
    /// Last visual line of its paragraph (a `'\n'` or the end of text follows).
    pub ends_paragraph: bool,
}

impl WrappedLine {
    #[inline]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.byte_range.clone()]
    }

    /// Char index one past the last character.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Caret geometry for an edit session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Caret {
    pub x: f32,
    /// Vertical centre.
    pub y: f32,
    pub height: f32,
    pub line: usize,
    pub column: usize,
}

impl Caret {
    pub fn top(&self) -> Point {
        Point::new(self.x, self.y - self.height / 2.0)
    }

    pub fn bottom(&self) -> Point {
        Point::new(self.x, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayout {
    metrics: GlyphMetrics,
}

impl TextLayout {
    pub fn new(metrics: GlyphMetrics) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &GlyphMetrics {
        &self.metrics
    }

    pub fn set_metrics(&mut self, metrics: GlyphMetrics) {
        self.metrics = metrics;
    }

    #[inline]
    pub fn advance(&self, ch: char) -> f32 {
        self.metrics.advance(ch)
    }

    /// Sum of advances.
    pub fn measure(&self, text: &str) -> f32 {
        text.chars().map(|ch| self.metrics.advance(ch)).sum()
    }

    /// Usable text width inside a cell.
    #[inline]
    pub fn max_width_for(cell_width: f32) -> f32 {
        cell_width - CELL_TEXT_PADDING
    }

    /// Wrap `text` into lines no wider than `max_width`.
    ///
    /// Hard breaks on `'\n'`, then greedy per-character filling. A line
    /// always takes at least one character, and an empty paragraph yields one
    /// empty line, so `""` wraps to a single empty line.
    pub fn wrap(&self, text: &str, max_width: f32) -> Vec<WrappedLine> {
        let mut lines = Vec::new();
        self.wrap_into(text, max_width, &mut lines);
        lines
    }

    /// [`wrap`](Self::wrap) into a reused buffer.
    pub fn wrap_into(&self, text: &str, max_width: f32, out: &mut Vec<WrappedLine>) {
        out.clear();
        let mut char_base = 0;
        let mut byte_base = 0;

        for paragraph in text.split('\n') {
            let mut line_start_byte = byte_base;
            let mut line_start_char = char_base;
            let mut len = 0;
            let mut width = 0.0;

            for (offset, ch) in paragraph.char_indices() {
                let advance = self.metrics.advance(ch);
                if width + advance > max_width && len > 0 {
                    out.push(WrappedLine {
                        byte_range: line_start_byte..byte_base + offset,
                        start: line_start_char,
                        len,
                        width,
                        ends_paragraph: false,
                    });
                    line_start_byte = byte_base + offset;
                    line_start_char += len;
                    len = 0;
                    width = 0.0;
                }
                len += 1;
                width += advance;
            }

            out.push(WrappedLine {
                byte_range: line_start_byte..byte_base + paragraph.len(),
                start: line_start_char,
                len,
                width,
                ends_paragraph: true,
            });

            char_base = line_start_char + len + 1;
            byte_base += paragraph.len() + 1;
        }
    }

    /// Distance between baselines of consecutive lines.
    #[inline]
    pub fn line_height(&self) -> f32 {
        self.metrics.slot_height as f32 * LINE_HEIGHT_FACTOR
    }

    /// Vertical centre of line `index` in a block of `count` lines centred
    /// on `center_y`.
    #[inline]
    pub fn line_center_y(&self, center_y: f32, count: usize, index: usize) -> f32 {
        let lh = self.line_height();
        let top = center_y - count as f32 * lh / 2.0;
        top + index as f32 * lh + self.metrics.slot_height as f32 / 2.0
    }

    #[inline]
    pub fn caret_height(&self) -> f32 {
        self.metrics.slot_height as f32 * CARET_HEIGHT_FACTOR
    }

    /// Caret position for `cursor` (a char index) in `text` edited inside
    /// `cell`.
    ///
    /// Text that fits on one line keeps the caret on the cell's vertical
    /// centre; wrapped text puts it on the centre of its visual line. The two
    /// differ slightly for a single line, and both are kept that way.
    pub fn caret(&self, text: &str, cursor: usize, cell: Rect) -> Caret {
        let max_width = Self::max_width_for(cell.width);
        let center = cell.center();
        let lines = self.wrap(text, max_width);
        let height = self.caret_height();

        if lines.len() <= 1 {
            let before: f32 = text.chars().take(cursor).map(|ch| self.advance(ch)).sum();
            let total = self.measure(text);
            let column = cursor.min(text.chars().count());
            return Caret {
                x: center.x - total / 2.0 + before,
                y: center.y,
                height,
                line: 0,
                column,
            };
        }

        let (line, column) = locate(&lines, cursor);
        let wrapped = &lines[line];
        let line_text = wrapped.text(text);
        let before: f32 = line_text.chars().take(column).map(|ch| self.advance(ch)).sum();
        Caret {
            x: center.x - wrapped.width / 2.0 + before,
            y: self.line_center_y(center.y, lines.len(), line),
            height,
            line,
            column,
        }
    }
}

/// Visual `(line, column)` for a char index. At a soft wrap the index belongs
/// to the end of the earlier line.
pub fn locate(lines: &[WrappedLine], cursor: usize) -> (usize, usize) {
    for (i, line) in lines.iter().enumerate() {
        if cursor <= line.end() {
            return (i, cursor.saturating_sub(line.start));
        }
    }
    match lines.last() {
        Some(last) => (lines.len() - 1, last.len),
        None => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> TextLayout {
        TextLayout::new(GlyphMetrics::for_font_size(14.0))
    }

    fn texts<'a>(lines: &[WrappedLine], source: &'a str) -> Vec<&'a str> {
        lines.iter().map(|l| l.text(source)).collect()
    }

    fn rejoin(lines: &[WrappedLine], source: &str) -> String {
        let mut out = String::new();
        for (i, line) in lines.iter().enumerate() {
            out.push_str(line.text(source));
            if line.ends_paragraph && i + 1 < lines.len() {
                out.push('\n');
            }
        }
        out
    }

    #[test]
    fn measure_mixed() {
        let l = layout();
        assert_eq!(l.measure(""), 0.0);
        assert_eq!(l.measure("AB"), 14.0);
        assert_eq!(l.measure("张三"), 31.0);
        assert_eq!(l.measure("A张"), 22.5);
    }

    #[test]
    fn wrap_at_five_ascii_advances() {
        let l = layout();
        let text = "ABCDEFGHIJ";
        let lines = l.wrap(text, 35.0);
        assert_eq!(texts(&lines, text), vec!["ABCDE", "FGHIJ"]);
        assert_eq!(lines[1].start, 5);
        assert!(!lines[0].ends_paragraph);
        assert!(lines[1].ends_paragraph);
    }

    #[test]
    fn wrap_empty_and_hard_breaks() {
        let l = layout();
        assert_eq!(l.wrap("", 100.0).len(), 1);

        let text = "ab\n\ncd";
        let lines = l.wrap(text, 100.0);
        assert_eq!(texts(&lines, text), vec!["ab", "", "cd"]);
        assert_eq!(lines.iter().map(|l| l.start).collect::<Vec<_>>(), vec![0, 3, 4]);
    }

    #[test]
    fn oversized_char_still_advances() {
        let l = layout();
        let text = "张张";
        let lines = l.wrap(text, 5.0);
        assert_eq!(texts(&lines, text), vec!["张", "张"]);
    }

    #[test]
    fn wrap_covers_input() {
        let l = layout();
        for text in ["", "\n", "hello world", "a\nb\n", "张三李四王五赵六abc\n\nxyz 测试", "ABCDEFGHIJKLMNOP"] {
            for width in [5.0, 20.0, 35.0, 140.0] {
                let lines = l.wrap(text, width);
                assert_eq!(rejoin(&lines, text), text, "{text:?} @ {width}");
                for line in &lines {
                    assert_eq!(line.width, l.measure(line.text(text)));
                    assert_eq!(line.len, line.text(text).chars().count());
                }
            }
        }
    }

    #[test]
    fn single_line_caret_is_centred_on_cell() {
        let l = layout();
        let cell = Rect::new(0.0, 0.0, 150.0, 40.0);
        let caret = l.caret("AB", 1, cell);
        // centre 75, total width 14, one advance in.
        assert_eq!(caret.x, 75.0 - 7.0 + 7.0);
        assert_eq!(caret.y, 20.0);
        assert_eq!(caret.height, 19.0 * 0.8);
    }

    #[test]
    fn multi_line_caret_follows_line_centres() {
        let l = layout();
        let cell = Rect::new(0.0, 0.0, 45.0, 80.0);
        let text = "ABCDEFGHIJ";
        // 35px usable: two lines of five.
        let lh = l.line_height();
        let start = l.caret(text, 5, cell);
        assert_eq!((start.line, start.column), (0, 5));
        let next = l.caret(text, 6, cell);
        assert_eq!((next.line, next.column), (1, 1));
        assert!((next.y - start.y - lh).abs() < 1e-4);
        assert_eq!(next.x, 22.5 - 17.5 + 7.0);
    }

    #[test]
    fn caret_after_hard_break() {
        let l = layout();
        let cell = Rect::new(0.0, 0.0, 150.0, 80.0);
        let caret = l.caret("ab\ncd", 3, cell);
        assert_eq!((caret.line, caret.column), (1, 0));
        assert_eq!(caret.x, 75.0 - 7.0);
    }

    #[test]
    fn caret_is_monotonic_within_lines() {
        let l = layout();
        let cell = Rect::new(10.0, 10.0, 60.0, 120.0);
        let text = "张三abc李四defg\nxyz王五";
        let lines = l.wrap(text, TextLayout::max_width_for(cell.width));
        assert!(lines.len() > 1);
        for (index, line) in lines.iter().enumerate() {
            let mut prev = f32::NEG_INFINITY;
            for cursor in line.start..=line.end() {
                let caret = l.caret(text, cursor, cell);
                if caret.line != index {
                    continue;
                }
                assert!(caret.x >= prev, "cursor {cursor}");
                prev = caret.x;
            }
        }
    }

    #[test]
    fn locate_past_end_clamps() {
        let l = layout();
        let lines = l.wrap("abc", 100.0);
        assert_eq!(locate(&lines, 99), (0, 3));
    }
}
