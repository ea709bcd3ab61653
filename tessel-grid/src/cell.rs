//! Logical cell addressing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A (row, col) reference into the grid. Row 0 is the first data row
/// (the header band is not addressable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Spreadsheet-style label, e.g. `(1, 1)` -> `"B2"`, `(0, 27)` -> `"AB1"`.
    pub fn label(&self) -> String {
        let mut letters = Vec::new();
        let mut n = self.col + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        letters.reverse();
        let mut label: String = letters.into_iter().collect();
        label.push_str(&(self.row + 1).to_string());
        label
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<(usize, usize)> for CellRef {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}
