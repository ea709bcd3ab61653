//! The grid engine: one editable grid, its layers and its input handling.
//!
//! `GridEngine` ties the model, geometry, theme and compositor together and
//! turns mutations into dirty layers plus redraw requests. Hosts drive it by
//! feeding [`EngineEvent`]s to [`GridEngine::handle_event`] and calling
//! [`GridEngine::tick`] from their frame loop; the engine decides whether a
//! composite pass is due.
//!
//! Engines share no state beyond the process-wide timing switch in
//! [`frame_timing`](crate::frame_timing), so any number may coexist.

use tessel_grid::{CellRef, Dataset, GridModel, SizePreset, ThemeSpec};

use crate::atlas::{GlyphAtlas, GlyphMetrics};
use crate::clock::{Clock, SystemClock};
use crate::compositor::{CompositeStatus, Compositor, CompositorStats, LayerKind, Scene};
use crate::config::EngineConfig;
use crate::edit_session::{EditSession, sanitize_input};
use crate::error::{ConfigError, RenderError};
use crate::event::{Direction, EngineEvent, EventOutcome, Key};
use crate::geometry::GridGeometry;
use crate::hit_test::HitTester;
use crate::primitives::{Point, Size};
use crate::raster::Surface;
use crate::rasterizer::{BlockRasterizer, FontdueRasterizer, GlyphRasterizer};
use crate::scheduler::{RedrawScheduler, SchedulerStats, Urgency};
use crate::text_layout::TextLayout;
use crate::theme::Theme;

/// Counters reported when an engine is destroyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub compositor: CompositorStats,
    pub scheduler: SchedulerStats,
    pub static_glyphs: usize,
    pub dynamic_glyphs: usize,
    pub glyphs_rasterized: u64,
    pub draw_ops_retained: usize,
    pub draw_op_allocations: u64,
    pub line_infos_retained: usize,
    pub hit_cache_resets: u64,
}

pub struct GridEngine {
    config: EngineConfig,
    model: GridModel,
    /// Size in effect; differs from `config.size` when fitting the viewport.
    size: SizePreset,
    viewport: Size,
    geometry: GridGeometry,
    theme: Theme,
    compositor: Compositor,
    scheduler: RedrawScheduler,
    hit: HitTester,
    clock: Box<dyn Clock>,
    next_blink: Option<f64>,
}

impl std::fmt::Debug for GridEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridEngine")
            .field("grid", &self.model.size())
            .field("viewport", &self.viewport)
            .field("editing", &self.compositor.session().map(|s| s.cell()))
            .finish_non_exhaustive()
    }
}

impl GridEngine {
    /// Build an engine from a validated config. Uses the configured font, or
    /// the built-in block rasterizer when none is set.
    pub fn create(config: EngineConfig) -> Result<Self, RenderError> {
        let rasterizer = Self::rasterizer_for(&config)?;
        Self::with_parts(config, rasterizer, Box::new(SystemClock::new()))
    }

    /// The rasterizer `create` would use for `config`.
    pub fn rasterizer_for(config: &EngineConfig) -> Result<Box<dyn GlyphRasterizer>, RenderError> {
        Ok(match &config.font_path {
            Some(path) => Box::new(FontdueRasterizer::from_file(path)?),
            None => Box::new(BlockRasterizer),
        })
    }

    pub fn with_rasterizer(config: EngineConfig, rasterizer: Box<dyn GlyphRasterizer>) -> Result<Self, RenderError> {
        Self::with_parts(config, rasterizer, Box::new(SystemClock::new()))
    }

    pub fn with_parts(
        config: EngineConfig,
        rasterizer: Box<dyn GlyphRasterizer>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, RenderError> {
        config.validate()?;
        let theme = Theme::from_spec(&config.theme)?;
        let model = GridModel::new(config.rows, config.cols);
        let viewport = Size::new(config.viewport_width, config.viewport_height);
        let size = effective_size(&config, viewport, model.rows());
        let geometry = GridGeometry::compute(viewport, &size, model.rows(), model.cols());

        let mut atlas = GlyphAtlas::new(config.atlas.clone(), size.font_size, rasterizer);
        atlas.set_dynamic_growth(config.capabilities.dynamic_glyph_growth);
        let (width, height) = surface_size(viewport);
        let compositor = Compositor::new(width, height, atlas, config.op_budget());
        let scheduler = RedrawScheduler::new(config.scheduler);

        tracing::info!(
            "grid engine created: {}x{} cells, viewport {}x{}",
            model.rows(),
            model.cols(),
            width,
            height
        );

        let mut engine = Self {
            config,
            model,
            size,
            viewport,
            geometry,
            theme,
            compositor,
            scheduler,
            hit: HitTester::new(),
            clock,
            next_blink: None,
        };
        engine.request(Urgency::Immediate);
        Ok(engine)
    }

    /// Tear the engine down. A running edit session is dropped without
    /// committing.
    pub fn destroy(mut self) -> EngineStats {
        if let Some(session) = self.compositor.take_session() {
            tracing::debug!("discarding uncommitted edit of {}", session.cell());
        }
        let stats = self.stats();
        tracing::info!(
            "grid engine destroyed: {} passes, {} yields, {} glyphs ({} dynamic), {} draw ops pooled",
            stats.compositor.passes,
            stats.compositor.yields,
            stats.static_glyphs + stats.dynamic_glyphs,
            stats.dynamic_glyphs,
            stats.draw_ops_retained
        );
        stats
    }

    pub fn stats(&self) -> EngineStats {
        let atlas = self.compositor.atlas();
        let pools = self.compositor.painter().pools();
        EngineStats {
            compositor: self.compositor.stats(),
            scheduler: self.scheduler.stats(),
            static_glyphs: atlas.static_count(),
            dynamic_glyphs: atlas.dynamic_count(),
            glyphs_rasterized: atlas.rasterized_count(),
            draw_ops_retained: pools.draw_ops.retained(),
            draw_op_allocations: pools.draw_ops.fresh_allocations(),
            line_infos_retained: pools.line_infos.retained(),
            hit_cache_resets: self.hit.resets(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn model(&self) -> &GridModel {
        &self.model
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn size(&self) -> &SizePreset {
        &self.size
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn scheduler(&self) -> &RedrawScheduler {
        &self.scheduler
    }

    pub fn layout(&self) -> &TextLayout {
        self.compositor.layout()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.compositor.session()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.model.get(row, col)
    }

    fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    fn request(&mut self, urgency: Urgency) {
        let now = self.now();
        self.scheduler.request_draw(now, urgency);
    }

    // ---- grid -------------------------------------------------------------

    /// Set a cell's text and repaint just that cell. Out-of-range cells are
    /// ignored: references can go stale after rows or columns are removed.
    pub fn update_cell(&mut self, row: usize, col: usize, value: impl Into<String>) -> bool {
        match self.model.set(row, col, value) {
            Ok(()) => {
                self.compositor.invalidate_cell(CellRef::new(row, col));
                self.request(Urgency::Debounced);
                true
            }
            Err(err) => {
                tracing::debug!("ignoring cell update: {}", err);
                false
            }
        }
    }

    pub fn add_row(&mut self) {
        self.model.add_row();
        self.relayout();
    }

    /// Remove the last row. The grid never drops below one row.
    pub fn remove_row(&mut self) -> bool {
        if !self.model.remove_row() {
            return false;
        }
        self.drop_stale_session();
        self.relayout();
        true
    }

    pub fn add_column(&mut self) {
        self.model.add_column();
        self.relayout();
    }

    pub fn remove_column(&mut self) -> bool {
        if !self.model.remove_column() {
            return false;
        }
        self.drop_stale_session();
        self.relayout();
        true
    }

    /// Replace the grid contents. A running edit is cancelled.
    pub fn load_dataset(&mut self, dataset: &Dataset) -> Result<(), RenderError> {
        self.model.load_dataset(dataset)?;
        if self.compositor.take_session().is_some() {
            self.next_blink = None;
        }
        self.relayout();
        Ok(())
    }

    fn drop_stale_session(&mut self) {
        let stale = self
            .compositor
            .session()
            .is_some_and(|s| !self.model.contains(s.cell()));
        if stale {
            if let Some(session) = self.compositor.take_session() {
                tracing::debug!("cancelled edit of removed cell {}", session.cell());
            }
            self.next_blink = None;
        }
    }

    /// Apply theme overrides field by field. Rejected fields keep their old
    /// value and are returned.
    pub fn apply_theme(&mut self, spec: &ThemeSpec) -> Vec<ConfigError> {
        let errors = self.theme.apply_spec(spec);
        self.compositor.invalidate_all();
        self.request(Urgency::Immediate);
        errors
    }

    pub fn apply_theme_preset(&mut self, name: &str) -> Result<(), RenderError> {
        let spec = ThemeSpec::preset(name)?;
        match self.apply_theme(&spec).into_iter().next() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Switch to explicit cell dimensions. Turns viewport fitting off.
    pub fn apply_size(&mut self, size: SizePreset) -> Result<(), RenderError> {
        let mut config = self.config.clone();
        config.size = size;
        config.fit_to_viewport = false;
        config.validate()?;
        self.config = config;
        self.relayout();
        Ok(())
    }

    pub fn apply_size_preset(&mut self, name: &str) -> Result<(), RenderError> {
        self.apply_size(SizePreset::preset(name)?)
    }

    /// Resize the viewport and every layer buffer.
    pub fn resize(&mut self, width: f32, height: f32) -> Result<(), RenderError> {
        let mut config = self.config.clone();
        config.viewport_width = width;
        config.viewport_height = height;
        config.validate()?;
        self.config = config;
        self.viewport = Size::new(width, height);
        let (w, h) = surface_size(self.viewport);
        self.compositor.resize(w, h);
        self.relayout();
        Ok(())
    }

    /// Force a full repaint.
    pub fn refresh(&mut self) {
        self.compositor.invalidate_all();
        self.request(Urgency::Immediate);
    }

    /// Recompute geometry after a size, viewport or row/column change.
    fn relayout(&mut self) {
        let size = effective_size(&self.config, self.viewport, self.model.rows());
        let font_changed =
            GlyphMetrics::for_font_size(size.font_size).font_size != self.compositor.atlas().metrics().font_size;
        self.size = size;
        self.geometry = GridGeometry::compute(self.viewport, &self.size, self.model.rows(), self.model.cols());
        self.hit.clear();
        if font_changed {
            self.compositor.rebuild_atlas(self.size.font_size);
        } else {
            self.compositor.invalidate_all();
        }
        self.request(Urgency::Immediate);
    }

    pub fn cell_at(&mut self, x: f32, y: f32) -> Option<CellRef> {
        self.hit.cell_at(x, y, &self.geometry)
    }

    // ---- editing ----------------------------------------------------------

    /// Start editing a cell, committing any edit already running.
    pub fn begin_edit(&mut self, row: usize, col: usize) -> bool {
        let cell = CellRef::new(row, col);
        if !self.model.contains(cell) {
            tracing::debug!("ignoring edit of {} outside the grid", cell);
            return false;
        }
        self.commit_edit();
        let text = self.model.get(row, col).unwrap_or_default().to_string();
        self.compositor.set_session(Some(EditSession::new(cell, text)));
        self.restart_blink();
        self.request(Urgency::Immediate);
        true
    }

    /// Write the session text back to the model.
    pub fn commit_edit(&mut self) -> Option<CellRef> {
        let session = self.compositor.take_session()?;
        let cell = session.cell();
        self.next_blink = None;
        if self.model.get(cell.row, cell.col) != Some(session.text()) {
            match self.model.set(cell.row, cell.col, session.into_text()) {
                Ok(()) => self.compositor.invalidate_cell(cell),
                Err(err) => tracing::debug!("dropping edit: {}", err),
            }
        }
        self.request(Urgency::Immediate);
        Some(cell)
    }

    /// End the session and leave the cell unchanged.
    pub fn cancel_edit(&mut self) -> Option<CellRef> {
        let session = self.compositor.take_session()?;
        self.next_blink = None;
        self.request(Urgency::Immediate);
        Some(session.cell())
    }

    pub fn move_cursor(&mut self, delta: isize) -> bool {
        self.edit(Urgency::Immediate, |s| s.move_cursor(delta)).unwrap_or(false)
    }

    pub fn navigate(&mut self, direction: Direction) -> bool {
        match direction {
            Direction::Left => self.move_cursor(-1),
            Direction::Right => self.move_cursor(1),
            Direction::Home => self.edit(Urgency::Immediate, |s| s.home()).is_some(),
            Direction::End => self.edit(Urgency::Immediate, |s| s.end()).is_some(),
        }
    }

    /// Insert text at the cursor. Control characters are stripped; newlines
    /// only survive when multi-line editing is enabled.
    pub fn insert_text(&mut self, text: &str) -> bool {
        let clean = sanitize_input(text, self.config.capabilities.multiline_edit);
        if clean.is_empty() {
            return false;
        }
        self.edit(Urgency::Debounced, |s| s.insert_str(&clean)).is_some()
    }

    pub fn delete_backward(&mut self) -> bool {
        self.edit(Urgency::Debounced, |s| s.delete_backward()).unwrap_or(false)
    }

    pub fn delete_forward(&mut self) -> bool {
        self.edit(Urgency::Debounced, |s| s.delete_forward()).unwrap_or(false)
    }

    /// Apply `f` to the session. Any edit shows the caret and restarts the
    /// blink cycle.
    fn edit<R>(&mut self, urgency: Urgency, f: impl FnOnce(&mut EditSession) -> R) -> Option<R> {
        let result = self.compositor.with_session(|s| {
            let result = f(s);
            s.set_cursor_visible(true);
            result
        })?;
        self.restart_blink();
        self.request(urgency);
        Some(result)
    }

    fn restart_blink(&mut self) {
        self.next_blink = Some(self.now() + self.config.scheduler.blink_interval_ms);
    }

    // ---- input ------------------------------------------------------------

    pub fn handle_event(&mut self, event: EngineEvent) -> EventOutcome {
        let editing = self.compositor.session().is_some();
        match event {
            EngineEvent::InsertText { text, cursor } => {
                if !editing {
                    return EventOutcome::Ignored;
                }
                if let Some(index) = cursor {
                    self.compositor.with_session(|s| s.set_cursor(index));
                }
                self.insert_text(&text);
                EventOutcome::Handled
            }
            EngineEvent::Navigate(direction) => {
                self.navigate(direction);
                handled_if(editing)
            }
            EngineEvent::DeleteBackward => {
                self.delete_backward();
                handled_if(editing)
            }
            EngineEvent::DeleteForward => {
                self.delete_forward();
                handled_if(editing)
            }
            EngineEvent::Key(Key::Enter { shift: true }) => {
                self.insert_text("\n");
                handled_if(editing)
            }
            EngineEvent::Key(Key::Enter { shift: false }) | EngineEvent::Commit => self
                .commit_edit()
                .map_or(EventOutcome::Ignored, EventOutcome::EditCommitted),
            EngineEvent::Key(Key::Escape) | EngineEvent::Cancel => self
                .cancel_edit()
                .map_or(EventOutcome::Ignored, EventOutcome::EditCancelled),
            EngineEvent::Click { x, y } => self.click(x, y),
        }
    }

    fn click(&mut self, x: f32, y: f32) -> EventOutcome {
        let rippled = self.config.capabilities.click_effect;
        if rippled {
            let now = self.now();
            self.compositor.add_ripple(Point::new(x, y), now);
            self.request(Urgency::Immediate);
        }

        let Some(cell) = self.cell_at(x, y) else {
            return match self.commit_edit() {
                Some(committed) => EventOutcome::EditCommitted(committed),
                None => handled_if(rippled),
            };
        };
        if self.compositor.session().is_some_and(|s| s.cell() == cell) {
            return EventOutcome::Handled;
        }
        if let Some(&kind) = self.config.picker_columns.get(&cell.col) {
            self.commit_edit();
            return EventOutcome::OpenPicker { cell, kind };
        }
        self.begin_edit(cell.row, cell.col);
        EventOutcome::EditStarted(cell)
    }

    // ---- frames -----------------------------------------------------------

    /// Advance timers and, if a draw is due, run one composite slice.
    /// Returns `None` when nothing was drawn.
    pub fn tick<S: Surface + ?Sized>(&mut self, target: &mut S) -> Result<Option<CompositeStatus>, RenderError> {
        let now = self.now();

        if self.next_blink.is_some_and(|due| now >= due) {
            self.compositor.with_session(|s| s.toggle_cursor());
            self.next_blink = Some(now + self.config.scheduler.blink_interval_ms);
            self.request(Urgency::Debounced);
        }

        if self.compositor.ripple_count() > 0 {
            // One more frame after the last ripple ends, to erase it.
            self.compositor.step_ripples(now);
            self.request(Urgency::Immediate);
        }

        if !self.scheduler.poll(now) {
            return Ok(None);
        }
        let status = self.composite(target, now)?;
        if let CompositeStatus::Yielded { .. } = status {
            self.request(Urgency::Immediate);
        }
        Ok(Some(status))
    }

    /// Composite until every dirty layer is painted, ignoring the scheduler.
    pub fn render<S: Surface + ?Sized>(&mut self, target: &mut S) -> Result<(), RenderError> {
        let now = self.now();
        while self.composite(target, now)? != CompositeStatus::Complete {}
        Ok(())
    }

    fn composite<S: Surface + ?Sized>(&mut self, target: &mut S, now: f64) -> Result<CompositeStatus, RenderError> {
        let scene = Scene {
            model: &self.model,
            geometry: &self.geometry,
            theme: &self.theme,
            capabilities: self.config.capabilities,
            now,
        };
        self.compositor.composite(&scene, target)
    }

    /// When the host should call [`tick`](Self::tick) next, in clock
    /// milliseconds. `None` means the engine is idle until the next input.
    pub fn next_wakeup(&self) -> Option<f64> {
        match (self.scheduler.due_at(), self.next_blink) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Nothing dirty, nothing queued and no draw requested.
    pub fn is_idle(&self) -> bool {
        self.compositor.is_idle() && !self.scheduler.is_pending()
    }

    pub fn is_layer_dirty(&self, kind: LayerKind) -> bool {
        self.compositor.is_dirty(kind)
    }
}

#[inline]
fn handled_if(handled: bool) -> EventOutcome {
    if handled { EventOutcome::Handled } else { EventOutcome::Ignored }
}

fn effective_size(config: &EngineConfig, viewport: Size, rows: usize) -> SizePreset {
    if config.fit_to_viewport {
        config.size.fit_viewport(viewport.width, viewport.height, rows)
    } else {
        config.size
    }
}

fn surface_size(viewport: Size) -> (u32, u32) {
    (viewport.width.ceil() as u32, viewport.height.ceil() as u32)
}
