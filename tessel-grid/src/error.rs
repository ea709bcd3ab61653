//! Grid error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("dataset has no columns")]
    EmptyDataset,

    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}
