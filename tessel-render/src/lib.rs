//! Tessel Render - glyph-atlas text rendering and layered compositing for
//! the grid editor.
//!
//! The engine keeps three raster layers (background, data, edit), redraws
//! only the ones a mutation touched, and composites them onto a host
//! [`Surface`]. Text goes through a persistent [`GlyphAtlas`] so no glyph is
//! rasterized twice.

pub mod atlas;
pub mod clock;
pub mod compositor;
pub mod config;
pub mod edit_session;
pub mod engine;
pub mod error;
pub mod event;
pub mod frame_timing;
pub mod geometry;
pub mod hit_test;
pub mod painter;
pub mod pool;
pub mod primitives;
pub mod raster;
pub mod rasterizer;
pub mod scheduler;
pub mod text_layout;
pub mod theme;

pub use atlas::{AtlasConfig, CharClass, GlyphAtlas, GlyphMetrics, GlyphRecord};
pub use clock::{Clock, ManualClock, SystemClock};
pub use compositor::{CompositeStatus, Compositor, CompositorStats, LayerKind, Scene};
pub use config::{Capabilities, EngineConfig, PickerKind};
pub use edit_session::{EditSession, sanitize_input};
pub use engine::{EngineStats, GridEngine};
pub use error::{AtlasError, ConfigError, RenderError};
pub use event::{Direction, EngineEvent, EventOutcome, Key};
pub use geometry::GridGeometry;
pub use hit_test::HitTester;
pub use primitives::{Color, Point, Rect, Size};
pub use raster::{LineSegment, RasterBuffer, Rgba8, Surface};
pub use rasterizer::{BlockRasterizer, FontdueRasterizer, GlyphBitmap, GlyphRasterizer};
pub use scheduler::{RedrawScheduler, SchedulerConfig, SchedulerStats, Urgency};
pub use text_layout::{Caret, TextLayout, WrappedLine};
pub use theme::Theme;

pub use tessel_grid::{CellRef, Dataset, GridModel, SizePreset, ThemeSpec};
