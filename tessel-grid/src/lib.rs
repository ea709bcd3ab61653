//! Tessel Grid - the data side of the grid editor.
//!
//! This crate owns the cell matrix, its headers, and the preset tables
//! (themes, sizes, datasets) that hosts feed into the render engine.
//! Nothing here knows about pixels.

mod cell;
mod error;
mod grid;
mod presets;

pub use cell::CellRef;
pub use error::GridError;
pub use grid::{GridModel, default_headers};
pub use presets::{Dataset, SizePreset, ThemeSpec};

/// Default grid dimensions.
pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_COLS: usize = 10;
