//! Render error types.

use tessel_grid::GridError;
use thiserror::Error;

/// Why a glyph could not be placed in the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AtlasError {
    #[error("character {0:?} is not renderable")]
    InvalidCharacter(char),

    #[error("glyph atlas is full, cannot add {0:?}")]
    OutOfCapacity(char),

    #[error("dynamic glyph growth is disabled, {0:?} is not cached")]
    GrowthDisabled(char),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid color for {field}: {value:?}")]
    InvalidColor { field: &'static str, value: String },

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("font error: {0}")]
    Font(String),

    #[error("failed to read font file: {0}")]
    Io(#[from] std::io::Error),

    #[error("layout inconsistency for {text:?}: measured {measured}, drawn {drawn}")]
    LayoutInconsistency {
        text: String,
        measured: f32,
        drawn: f32,
    },
}
