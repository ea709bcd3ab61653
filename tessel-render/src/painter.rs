//! Turns text and shapes into queued draw operations.
//!
//! Nothing here touches a layer directly. The painter fills a queue of
//! pooled [`DrawOp`]s that the compositor executes in budgeted batches, so
//! a large pass can be split across frames.

use std::collections::VecDeque;

use crate::atlas::GlyphAtlas;
use crate::error::RenderError;
use crate::pool::{Pool, Poolable};
use crate::primitives::{Color, Point, Rect};
use crate::raster::{LineSegment, RasterBuffer, Surface};
use crate::text_layout::{TextLayout, WrappedLine};

/// Draw ops kept ready at startup and the most retained afterwards.
pub const DRAW_OP_PREALLOCATED: usize = 1000;
pub const DRAW_OP_MAX_RETAINED: usize = 1000;
/// Line records kept ready at startup.
pub const LINE_INFO_PREALLOCATED: usize = 50;
pub const LINE_INFO_MAX_RETAINED: usize = 1000;

/// Tolerance when comparing measured and drawn line widths.
const WIDTH_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpKind {
    /// Blit an atlas slot tinted with `color`.
    #[default]
    Glyph,
    Fill,
    /// Line from `dst`'s origin to its far corner.
    Stroke,
}

/// One queued draw call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawOp {
    pub kind: OpKind,
    pub src: Rect,
    pub dst: Rect,
    /// Nothing outside this rectangle is touched. Ignored by strokes.
    pub clip: Rect,
    pub color: Color,
    /// Pen advance after a glyph.
    pub advance: f32,
    pub line_width: f32,
}

impl Poolable for DrawOp {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl DrawOp {
    /// Execute against `surface`, reading glyphs from `atlas`.
    pub fn execute(&self, atlas: &RasterBuffer, surface: &mut RasterBuffer) {
        match self.kind {
            OpKind::Glyph => {
                if let Some((src, dst)) = clip_scaled(self.src, self.dst, self.clip) {
                    surface.blit(atlas, src, dst, Some(self.color));
                }
            }
            OpKind::Fill => {
                if let Some(dst) = self.dst.intersection(&self.clip) {
                    surface.fill_rect(dst, self.color);
                }
            }
            OpKind::Stroke => {
                let segment = LineSegment::new(
                    self.dst.origin(),
                    Point::new(self.dst.right(), self.dst.bottom()),
                );
                surface.stroke_path(&[segment], self.line_width, self.color);
            }
        }
    }
}

/// Clip a scaled blit: shrink `dst` to `clip` and cut `src` by the same
/// proportions.
pub fn clip_scaled(src: Rect, dst: Rect, clip: Rect) -> Option<(Rect, Rect)> {
    let clipped = dst.intersection(&clip)?;
    if dst.width <= 0.0 || dst.height <= 0.0 {
        return None;
    }
    let sx = src.width / dst.width;
    let sy = src.height / dst.height;
    let src = Rect::new(
        src.x + (clipped.x - dst.x) * sx,
        src.y + (clipped.y - dst.y) * sy,
        clipped.width * sx,
        clipped.height * sy,
    );
    Some((src, clipped))
}

/// Position of one visual line of a text run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineInfo {
    pub text: String,
    pub width: f32,
    pub start_x: f32,
    /// Vertical centre.
    pub y: f32,
}

impl Poolable for LineInfo {
    fn reset(&mut self) {
        self.text.clear();
        self.width = 0.0;
        self.start_x = 0.0;
        self.y = 0.0;
    }
}

/// Pools for the two kinds of per-pass records.
#[derive(Debug)]
pub struct ScratchPools {
    pub draw_ops: Pool<DrawOp>,
    pub line_infos: Pool<LineInfo>,
}

impl Default for ScratchPools {
    fn default() -> Self {
        Self {
            draw_ops: Pool::with_preallocated(DRAW_OP_PREALLOCATED, DRAW_OP_MAX_RETAINED),
            line_infos: Pool::with_preallocated(LINE_INFO_PREALLOCATED, LINE_INFO_MAX_RETAINED),
        }
    }
}

/// A block of text centred on a point.
#[derive(Debug, Clone, Copy)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub center: Point,
    pub max_width: f32,
    pub clip: Rect,
    pub color: Color,
}

#[derive(Debug)]
pub struct Painter {
    layout: TextLayout,
    pools: ScratchPools,
    lines: Vec<WrappedLine>,
    infos: Vec<LineInfo>,
}

impl Painter {
    pub fn new(layout: TextLayout) -> Self {
        Self {
            layout,
            pools: ScratchPools::default(),
            lines: Vec::new(),
            infos: Vec::new(),
        }
    }

    pub fn layout(&self) -> &TextLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: TextLayout) {
        self.layout = layout;
    }

    pub fn pools(&self) -> &ScratchPools {
        &self.pools
    }

    /// Return an executed op to its pool.
    #[inline]
    pub fn recycle(&mut self, op: DrawOp) {
        self.pools.draw_ops.release(op);
    }

    pub fn queue_fill(&mut self, rect: Rect, color: Color, clip: Rect, out: &mut VecDeque<DrawOp>) {
        let mut op = self.pools.draw_ops.acquire();
        op.kind = OpKind::Fill;
        op.dst = rect;
        op.clip = clip;
        op.color = color;
        out.push_back(op);
    }

    pub fn queue_stroke(&mut self, from: Point, to: Point, width: f32, color: Color, out: &mut VecDeque<DrawOp>) {
        let mut op = self.pools.draw_ops.acquire();
        op.kind = OpKind::Stroke;
        op.dst = Rect::new(from.x, from.y, to.x - from.x, to.y - from.y);
        op.line_width = width;
        op.color = color;
        out.push_back(op);
    }

    /// Queue glyph ops for a text run and return how many were queued.
    ///
    /// Missing characters are added to the atlas first. A glyph the atlas
    /// cannot hold is skipped but its advance is still applied, so the drawn
    /// width of every line must equal its measured width.
    pub fn queue_text(
        &mut self,
        atlas: &mut GlyphAtlas,
        run: TextRun<'_>,
        out: &mut VecDeque<DrawOp>,
    ) -> Result<usize, RenderError> {
        if run.text.is_empty() {
            return Ok(0);
        }
        for ch in run.text.chars() {
            if ch != '\n' {
                atlas.ensure(ch);
            }
        }

        self.layout.wrap_into(run.text, run.max_width, &mut self.lines);
        let count = self.lines.len();
        for (index, line) in self.lines.iter().enumerate() {
            if line.len == 0 {
                continue;
            }
            let mut info = self.pools.line_infos.acquire();
            info.text.push_str(line.text(run.text));
            info.width = line.width;
            info.start_x = run.center.x - line.width / 2.0;
            info.y = self.layout.line_center_y(run.center.y, count, index);
            self.infos.push(info);
        }

        let slot_height = self.layout.metrics().slot_height as f32;
        let mut queued = 0;
        let mut result = Ok(());
        for info in &self.infos {
            let top = info.y - slot_height / 2.0;
            let mut pen = info.start_x;
            for ch in info.text.chars() {
                match atlas.get(ch) {
                    Some(record) => {
                        let mut op = self.pools.draw_ops.acquire();
                        op.kind = OpKind::Glyph;
                        op.src = record.source_rect;
                        op.dst = Rect::new(pen, top, record.display_width, slot_height);
                        op.clip = run.clip;
                        op.color = run.color;
                        op.advance = record.advance_width;
                        out.push_back(op);
                        queued += 1;
                        pen += record.advance_width;
                    }
                    None => pen += self.layout.advance(ch),
                }
            }
            let drawn = pen - info.start_x;
            if (drawn - info.width).abs() > WIDTH_EPSILON {
                tracing::error!(
                    "layout inconsistency in {:?}: measured {}, drawn {}",
                    info.text,
                    info.width,
                    drawn
                );
                result = Err(RenderError::LayoutInconsistency {
                    text: info.text.clone(),
                    measured: info.width,
                    drawn,
                });
                break;
            }
        }

        for info in self.infos.drain(..) {
            self.pools.line_infos.release(info);
        }
        result.map(|()| queued)
    }
}
