//! Grid model - a rows x cols matrix of string cells plus headers.

use crate::cell::CellRef;
use crate::error::GridError;
use crate::presets::Dataset;

/// Built-in captions for the first ten columns.
const BUILTIN_HEADERS: [&str; 10] = [
    "序号", "姓名", "年龄", "职位", "部门", "工资", "入职时间", "联系方式", "地址", "备注",
];

/// Header captions for a grid with `cols` columns: the built-in captions
/// first, then `Column N` for anything past them.
pub fn default_headers(cols: usize) -> Vec<String> {
    (0..cols)
        .map(|col| match BUILTIN_HEADERS.get(col) {
            Some(name) => (*name).to_string(),
            None => fallback_header(col),
        })
        .collect()
}

fn fallback_header(col: usize) -> String {
    format!("Column {}", col + 1)
}

/// The cell matrix. Every row always holds exactly `cols` entries and
/// `headers.len() == cols`; only the add/remove operations change shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridModel {
    /// Cells, one `Vec` per row.
    cells: Vec<Vec<String>>,
    /// Column captions.
    headers: Vec<String>,
    /// Number of columns (kept explicitly so a 0-row grid still has a width).
    cols: usize,
}

impl GridModel {
    /// Create an empty grid with default headers.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![vec![String::new(); cols]; rows],
            headers: default_headers(cols),
            cols,
        }
    }

    /// Build a grid from a dataset. Ragged rows are padded or truncated to
    /// the header width.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self, GridError> {
        let mut grid = Self::new(0, 0);
        grid.load_dataset(dataset)?;
        Ok(grid)
    }

    /// Get the grid dimensions as (rows, cols).
    pub fn size(&self) -> (usize, usize) {
        (self.rows(), self.cols)
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether a reference points inside the current extent.
    #[inline]
    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row < self.rows() && cell.col < self.cols
    }

    /// Get a cell's text.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(row)?.get(col).map(String::as_str)
    }

    /// Replace a cell's text.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>) -> Result<(), GridError> {
        let (rows, cols) = self.size();
        match self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(GridError::OutOfBounds { row, col, rows, cols }),
        }
    }

    pub fn header(&self, col: usize) -> Option<&str> {
        self.headers.get(col).map(String::as_str)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Append an empty row.
    pub fn add_row(&mut self) {
        self.cells.push(vec![String::new(); self.cols]);
    }

    /// Remove the last row. The grid never shrinks below one row.
    pub fn remove_row(&mut self) -> bool {
        if self.rows() <= 1 {
            return false;
        }
        self.cells.pop();
        true
    }

    /// Append a column with a `Column N` caption.
    pub fn add_column(&mut self) {
        self.cols += 1;
        self.headers.push(fallback_header(self.cols - 1));
        for row in &mut self.cells {
            row.push(String::new());
        }
    }

    /// Remove the last column. The grid never shrinks below one column.
    pub fn remove_column(&mut self) -> bool {
        if self.cols <= 1 {
            return false;
        }
        self.cols -= 1;
        self.headers.pop();
        for row in &mut self.cells {
            row.pop();
        }
        true
    }

    /// Replace headers and contents with a dataset's.
    pub fn load_dataset(&mut self, dataset: &Dataset) -> Result<(), GridError> {
        if dataset.headers.is_empty() {
            return Err(GridError::EmptyDataset);
        }
        let cols = dataset.headers.len();
        self.cols = cols;
        self.headers = dataset.headers.clone();
        self.cells = dataset
            .rows
            .iter()
            .map(|row| {
                let mut row: Vec<String> = row.iter().take(cols).cloned().collect();
                row.resize(cols, String::new());
                row
            })
            .collect();
        tracing::debug!("loaded dataset: {} rows x {} cols", self.rows(), cols);
        Ok(())
    }

    /// Iterate over rows.
    pub fn rows_iter(&self) -> impl Iterator<Item = &[String]> {
        self.cells.iter().map(Vec::as_slice)
    }

    /// Iterate over every non-empty cell with its reference.
    pub fn filled_cells(&self) -> impl Iterator<Item = (CellRef, &str)> {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, text)| !text.is_empty())
                .map(move |(col, text)| (CellRef::new(row, col), text.as_str()))
        })
    }
}

impl Default for GridModel {
    fn default() -> Self {
        Self::new(crate::DEFAULT_ROWS, crate::DEFAULT_COLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rectangular(grid: &GridModel) {
        assert_eq!(grid.headers().len(), grid.cols());
        for row in grid.rows_iter() {
            assert_eq!(row.len(), grid.cols());
        }
    }

    #[test]
    fn new_grid_is_empty_and_rectangular() {
        let grid = GridModel::new(20, 10);
        assert_eq!(grid.size(), (20, 10));
        assert_eq!(grid.get(19, 9), Some(""));
        assert_eq!(grid.get(20, 0), None);
        assert_eq!(grid.header(1), Some("姓名"));
        assert_rectangular(&grid);
    }

    #[test]
    fn headers_past_builtins_use_column_numbers() {
        let headers = default_headers(12);
        assert_eq!(headers[9], "备注");
        assert_eq!(headers[10], "Column 11");
        assert_eq!(headers[11], "Column 12");
    }

    #[test]
    fn set_out_of_bounds_is_an_error() {
        let mut grid = GridModel::new(2, 2);
        assert!(grid.set(1, 1, "x").is_ok());
        assert_eq!(
            grid.set(2, 0, "y"),
            Err(GridError::OutOfBounds { row: 2, col: 0, rows: 2, cols: 2 })
        );
        assert_eq!(grid.get(1, 1), Some("x"));
    }

    #[test]
    fn add_and_remove_keep_rows_in_lock_step() {
        let mut grid = GridModel::new(3, 3);
        grid.set(0, 2, "keep").unwrap();
        grid.add_column();
        assert_eq!(grid.header(3), Some("Column 4"));
        grid.add_row();
        assert_eq!(grid.size(), (4, 4));
        assert_rectangular(&grid);

        assert!(grid.remove_column());
        assert!(grid.remove_row());
        assert_eq!(grid.size(), (3, 3));
        assert_eq!(grid.get(0, 2), Some("keep"));
        assert_rectangular(&grid);
    }

    #[test]
    fn never_shrinks_below_one() {
        let mut grid = GridModel::new(1, 1);
        assert!(!grid.remove_row());
        assert!(!grid.remove_column());
        assert_eq!(grid.size(), (1, 1));
    }

    #[test]
    fn dataset_rows_are_normalised() {
        let dataset = Dataset {
            headers: vec!["a".into(), "b".into()],
            rows: vec![vec!["1".into()], vec!["1".into(), "2".into(), "3".into()]],
        };
        let grid = GridModel::from_dataset(&dataset).unwrap();
        assert_eq!(grid.size(), (2, 2));
        assert_eq!(grid.get(0, 1), Some(""));
        assert_eq!(grid.get(1, 1), Some("2"));
        assert_rectangular(&grid);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let mut grid = GridModel::new(2, 2);
        let err = grid.load_dataset(&Dataset::default()).unwrap_err();
        assert_eq!(err, GridError::EmptyDataset);
        assert_eq!(grid.size(), (2, 2));
    }

    #[test]
    fn filled_cells_skips_blanks() {
        let mut grid = GridModel::new(3, 3);
        grid.set(1, 1, "张三").unwrap();
        grid.set(2, 0, "x").unwrap();
        let filled: Vec<_> = grid.filled_cells().collect();
        assert_eq!(filled, vec![(CellRef::new(1, 1), "张三"), (CellRef::new(2, 0), "x")]);
    }
}
