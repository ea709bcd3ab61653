//! Layered compositing.
//!
//! Three layers are painted into their own buffers and stacked onto the
//! target in a fixed order:
//!
//! | layer      | depends on                       |
//! |------------|----------------------------------|
//! | Background | geometry, theme, headers         |
//! | Data       | cell contents                    |
//! | Edit       | edit session, click ripples      |
//!
//! Only dirty layers are repainted. The data layer also tracks individual
//! dirty cells: when only a few cells changed, just their rectangles are
//! cleared and redrawn.
//!
//! Repainting a layer queues pooled [`DrawOp`]s. [`Compositor::composite`]
//! executes at most `op_budget` of them per call; when the budget runs out
//! the pass yields and the next call resumes where it stopped. The target is
//! only written once every queued op has run, so a yielded pass never shows
//! a half-painted layer.

use std::collections::{BTreeSet, VecDeque};
use std::f32::consts::TAU;

use tessel_grid::{CellRef, GridModel};

use crate::atlas::GlyphAtlas;
use crate::config::Capabilities;
use crate::edit_session::EditSession;
use crate::error::RenderError;
use crate::frame_timing;
use crate::geometry::GridGeometry;
use crate::painter::{DrawOp, Painter, TextRun};
use crate::primitives::{Point, Rect};
use crate::raster::{RasterBuffer, Surface};
use crate::text_layout::TextLayout;
use crate::theme::Theme;

/// How long a click ripple stays on screen.
pub const RIPPLE_DURATION_MS: f64 = 300.0;
const RIPPLE_SEGMENTS: usize = 32;
const RIPPLE_LINE_WIDTH: f32 = 2.0;
const CARET_WIDTH: f32 = 2.0;
const BORDER_WIDTH: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Background,
    Data,
    Edit,
}

impl LayerKind {
    /// Paint order, bottom first.
    pub const ORDER: [LayerKind; 3] = [LayerKind::Background, LayerKind::Data, LayerKind::Edit];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeStatus {
    /// Every dirty layer was repainted and the target is up to date.
    Complete,
    /// The op budget ran out. Call `composite` again to continue.
    Yielded { remaining_ops: usize },
}

/// Everything a pass reads but does not own.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub model: &'a GridModel,
    pub geometry: &'a GridGeometry,
    pub theme: &'a Theme,
    pub capabilities: Capabilities,
    /// Milliseconds, used to animate ripples.
    pub now: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositorStats {
    /// Calls to `composite`, complete or not. Numbers timing samples.
    pub frames: u64,
    /// Completed passes.
    pub passes: u64,
    pub yields: u64,
    pub ops_executed: u64,
    /// Repaints per layer, in [`LayerKind::ORDER`].
    pub repaints: [u64; 3],
}

#[derive(Debug)]
struct LayerState {
    surface: RasterBuffer,
    dirty: bool,
    /// The whole layer must be repainted, not just `dirty_cells`.
    full: bool,
    dirty_cells: BTreeSet<CellRef>,
}

impl LayerState {
    fn new(width: u32, height: u32) -> Self {
        Self {
            surface: RasterBuffer::new(width, height),
            dirty: true,
            full: true,
            dirty_cells: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Ripple {
    center: Point,
    started: f64,
}

#[derive(Debug)]
pub struct Compositor {
    layers: [LayerState; 3],
    atlas: GlyphAtlas,
    painter: Painter,
    session: Option<EditSession>,
    ripples: Vec<Ripple>,
    pending: VecDeque<DrawOp>,
    /// Layer the pending ops paint into.
    pending_layer: Option<LayerKind>,
    op_budget: usize,
    stats: CompositorStats,
}

impl Compositor {
    pub fn new(width: u32, height: u32, atlas: GlyphAtlas, op_budget: usize) -> Self {
        let layout = TextLayout::new(*atlas.metrics());
        Self {
            layers: LayerKind::ORDER.map(|_| LayerState::new(width, height)),
            atlas,
            painter: Painter::new(layout),
            session: None,
            ripples: Vec::new(),
            pending: VecDeque::new(),
            pending_layer: None,
            op_budget: op_budget.max(1),
            stats: CompositorStats::default(),
        }
    }

    /// Mark a whole layer for repaint.
    pub fn invalidate(&mut self, kind: LayerKind) {
        let layer = &mut self.layers[kind.index()];
        layer.dirty = true;
        layer.full = true;
        layer.dirty_cells.clear();
    }

    pub fn invalidate_all(&mut self) {
        for kind in LayerKind::ORDER {
            self.invalidate(kind);
        }
    }

    /// Mark one cell of the data layer for repaint.
    pub fn invalidate_cell(&mut self, cell: CellRef) {
        let layer = &mut self.layers[LayerKind::Data.index()];
        layer.dirty = true;
        if !layer.full {
            layer.dirty_cells.insert(cell);
        }
    }

    pub fn is_dirty(&self, kind: LayerKind) -> bool {
        self.layers[kind.index()].dirty
    }

    /// Cells queued for a partial data repaint. Empty when the data layer is
    /// clean or due for a full repaint.
    pub fn dirty_cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        self.layers[LayerKind::Data.index()].dirty_cells.iter().copied()
    }

    /// True when nothing is dirty and no pass is in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.layers.iter().all(|l| !l.dirty)
    }

    pub fn layer(&self, kind: LayerKind) -> &RasterBuffer {
        &self.layers[kind.index()].surface
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn atlas_mut(&mut self) -> &mut GlyphAtlas {
        &mut self.atlas
    }

    pub fn painter(&self) -> &Painter {
        &self.painter
    }

    pub fn layout(&self) -> &TextLayout {
        self.painter.layout()
    }

    pub fn stats(&self) -> CompositorStats {
        self.stats
    }

    pub fn op_budget(&self) -> usize {
        self.op_budget
    }

    pub fn pending_ops(&self) -> usize {
        self.pending.len()
    }

    /// Rebuild the atlas for a new font size. Queued ops reference old atlas
    /// slots, so they are dropped and everything is repainted.
    pub fn rebuild_atlas(&mut self, font_size: f32) {
        self.atlas.rebuild(font_size);
        self.painter.set_layout(TextLayout::new(*self.atlas.metrics()));
        self.drop_pending();
        self.invalidate_all();
    }

    /// Resize every layer buffer. Drops any pass in flight.
    pub fn resize(&mut self, width: u32, height: u32) {
        for layer in &mut self.layers {
            layer.surface.resize(width, height);
        }
        self.drop_pending();
        self.invalidate_all();
    }

    fn drop_pending(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!("dropping {} queued draw ops", self.pending.len());
        }
        for op in self.pending.drain(..) {
            self.painter.recycle(op);
        }
        self.pending_layer = None;
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// Replace the edit session. Returns the previous one.
    pub fn set_session(&mut self, session: Option<EditSession>) -> Option<EditSession> {
        self.invalidate(LayerKind::Edit);
        std::mem::replace(&mut self.session, session)
    }

    pub fn take_session(&mut self) -> Option<EditSession> {
        self.set_session(None)
    }

    /// Run `f` on the active session and mark the edit layer dirty.
    pub fn with_session<R>(&mut self, f: impl FnOnce(&mut EditSession) -> R) -> Option<R> {
        let session = self.session.as_mut()?;
        let result = f(session);
        self.invalidate(LayerKind::Edit);
        Some(result)
    }

    pub fn add_ripple(&mut self, center: Point, now: f64) {
        self.ripples.push(Ripple { center, started: now });
        self.invalidate(LayerKind::Edit);
    }

    /// Drop finished ripples. Returns true while any remain, in which case
    /// the edit layer is marked for the next animation frame.
    pub fn step_ripples(&mut self, now: f64) -> bool {
        let before = self.ripples.len();
        self.ripples.retain(|r| now - r.started < RIPPLE_DURATION_MS);
        let alive = !self.ripples.is_empty();
        if alive || before != self.ripples.len() {
            self.invalidate(LayerKind::Edit);
        }
        alive
    }

    pub fn ripple_count(&self) -> usize {
        self.ripples.len()
    }

    /// Run one budgeted slice of the current pass.
    pub fn composite<S: Surface + ?Sized>(
        &mut self,
        scene: &Scene<'_>,
        target: &mut S,
    ) -> Result<CompositeStatus, RenderError> {
        let frame = self.stats.frames;
        self.stats.frames += 1;
        let mut budget = self.op_budget;
        loop {
            budget -= self.drain(budget);
            if !self.pending.is_empty() {
                self.stats.yields += 1;
                frame_timing::stat("yielded with ops", frame, self.pending.len());
                return Ok(CompositeStatus::Yielded {
                    remaining_ops: self.pending.len(),
                });
            }
            self.pending_layer = None;

            let Some(kind) = LayerKind::ORDER.into_iter().find(|k| self.layers[k.index()].dirty) else {
                break;
            };
            frame_timing::measure("prepare layer", frame, || self.prepare(kind, scene))?;
            self.pending_layer = Some(kind);
        }

        frame_timing::measure("present", frame, || self.present(target));
        self.stats.passes += 1;
        frame_timing::stat("ops executed", frame, self.stats.ops_executed);
        Ok(CompositeStatus::Complete)
    }

    /// Execute up to `budget` pending ops. Returns how many ran.
    fn drain(&mut self, budget: usize) -> usize {
        let Some(kind) = self.pending_layer else {
            return 0;
        };
        let surface = &mut self.layers[kind.index()].surface;
        let atlas = self.atlas.surface();
        let mut executed = 0;
        while executed < budget {
            let Some(op) = self.pending.pop_front() else {
                break;
            };
            op.execute(atlas, surface);
            self.painter.recycle(op);
            executed += 1;
        }
        self.stats.ops_executed += executed as u64;
        executed
    }

    fn present<S: Surface + ?Sized>(&self, target: &mut S) {
        let (width, height) = target.size();
        target.clear_rect(Rect::new(0.0, 0.0, width as f32, height as f32));
        for layer in &self.layers {
            let bounds = layer.surface.bounds();
            target.blit(&layer.surface, bounds, bounds, None);
        }
    }

    /// Clear a dirty layer and queue the ops that repaint it.
    fn prepare(&mut self, kind: LayerKind, scene: &Scene<'_>) -> Result<(), RenderError> {
        let layer = &mut self.layers[kind.index()];
        let full = layer.full;
        let cells = std::mem::take(&mut layer.dirty_cells);
        layer.dirty = false;
        layer.full = false;
        self.stats.repaints[kind.index()] += 1;

        match kind {
            LayerKind::Background => self.prepare_background(scene),
            LayerKind::Data if full => {
                self.layers[kind.index()].surface.clear();
                for (cell, _) in scene.model.filled_cells() {
                    self.queue_cell(cell, scene)?;
                }
                Ok(())
            }
            LayerKind::Data => {
                for cell in cells {
                    if cell.row < scene.geometry.rows && cell.col < scene.geometry.cols {
                        let rect = scene.geometry.cell_rect(cell.row, cell.col);
                        self.layers[kind.index()].surface.clear_rect(rect);
                    }
                    self.queue_cell(cell, scene)?;
                }
                Ok(())
            }
            LayerKind::Edit => self.prepare_edit(scene),
        }
    }

    fn prepare_background(&mut self, scene: &Scene<'_>) -> Result<(), RenderError> {
        let Scene { model, geometry, theme, .. } = *scene;
        let surface = &mut self.layers[LayerKind::Background.index()].surface;
        surface.clear();
        let bounds = surface.bounds();

        self.painter.queue_fill(geometry.header_band(), theme.header_bg, bounds, &mut self.pending);
        for row in 0..geometry.rows {
            self.painter
                .queue_fill(geometry.row_rect(row), theme.row_fill(row), bounds, &mut self.pending);
        }

        for col in 0..geometry.cols {
            let Some(caption) = model.header(col) else {
                continue;
            };
            let rect = geometry.header_rect(col);
            let run = TextRun {
                text: caption,
                center: rect.center(),
                max_width: TextLayout::max_width_for(rect.width),
                clip: rect.inset(1.0),
                color: theme.header_text,
            };
            self.painter.queue_text(&mut self.atlas, run, &mut self.pending)?;
        }

        for segment in geometry.border_segments() {
            self.painter
                .queue_stroke(segment.from, segment.to, BORDER_WIDTH, theme.border, &mut self.pending);
        }
        Ok(())
    }

    fn queue_cell(&mut self, cell: CellRef, scene: &Scene<'_>) -> Result<(), RenderError> {
        let geometry = scene.geometry;
        if cell.row >= geometry.rows || cell.col >= geometry.cols {
            return Ok(());
        }
        let Some(text) = scene.model.get(cell.row, cell.col) else {
            return Ok(());
        };
        let rect = geometry.cell_rect(cell.row, cell.col);
        let run = TextRun {
            text,
            center: rect.center(),
            max_width: TextLayout::max_width_for(rect.width),
            clip: rect.inset(1.0),
            color: scene.theme.text,
        };
        self.painter.queue_text(&mut self.atlas, run, &mut self.pending)?;
        Ok(())
    }

    fn prepare_edit(&mut self, scene: &Scene<'_>) -> Result<(), RenderError> {
        let Scene { geometry, theme, .. } = *scene;
        let surface = &mut self.layers[LayerKind::Edit.index()].surface;
        surface.clear();
        let bounds = surface.bounds();

        if let Some(session) = &self.session {
            let cell = session.cell();
            if cell.row < geometry.rows && cell.col < geometry.cols {
                let rect = geometry.cell_rect(cell.row, cell.col);
                let inner = rect.inset(1.0);
                // Opaque fill hides the committed text underneath.
                self.painter.queue_fill(inner, theme.row_fill(cell.row), bounds, &mut self.pending);
                self.painter.queue_fill(inner, theme.highlight(), bounds, &mut self.pending);

                let run = TextRun {
                    text: session.text(),
                    center: rect.center(),
                    max_width: TextLayout::max_width_for(rect.width),
                    clip: inner,
                    color: theme.text,
                };
                self.painter.queue_text(&mut self.atlas, run, &mut self.pending)?;

                if session.cursor_visible() {
                    let caret = self.painter.layout().caret(session.text(), session.cursor(), rect);
                    self.painter
                        .queue_stroke(caret.top(), caret.bottom(), CARET_WIDTH, theme.cursor, &mut self.pending);
                }
            }
        }

        if scene.capabilities.click_effect {
            let max_radius = geometry.cell_width.min(geometry.cell_height) / 2.0;
            for ripple in &self.ripples {
                let progress = ((scene.now - ripple.started) / RIPPLE_DURATION_MS).clamp(0.0, 1.0) as f32;
                let radius = max_radius * progress;
                if radius <= 0.0 {
                    continue;
                }
                let color = theme.selection.with_alpha(1.0 - progress);
                let point = |i: usize| {
                    let angle = TAU * i as f32 / RIPPLE_SEGMENTS as f32;
                    Point::new(
                        ripple.center.x + radius * angle.cos(),
                        ripple.center.y + radius * angle.sin(),
                    )
                };
                for i in 0..RIPPLE_SEGMENTS {
                    self.painter
                        .queue_stroke(point(i), point(i + 1), RIPPLE_LINE_WIDTH, color, &mut self.pending);
                }
            }
        }
        Ok(())
    }
}
