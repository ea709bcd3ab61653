//! Grid geometry: where every cell, the header band and the grid lines sit
//! on the surface.

use tessel_grid::SizePreset;

use crate::primitives::{Point, Rect, Size};
use crate::raster::LineSegment;

/// Cell layout for one grid shape on one viewport. Cells are uniform; the
/// grid is centred horizontally and pinned to the top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub viewport: Size,
    pub rows: usize,
    pub cols: usize,
    pub cell_width: f32,
    pub cell_height: f32,
    pub header_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl GridGeometry {
    pub fn compute(viewport: Size, size: &SizePreset, rows: usize, cols: usize) -> Self {
        let grid_width = cols as f32 * size.cell_width;
        Self {
            viewport,
            rows,
            cols,
            cell_width: size.cell_width,
            cell_height: size.cell_height,
            header_height: size.header_height,
            offset_x: ((viewport.width - grid_width) / 2.0).max(0.0),
            offset_y: 0.0,
        }
    }

    /// The full viewport.
    pub fn bounds(&self) -> Rect {
        Rect::of_size(self.viewport)
    }

    pub fn grid_width(&self) -> f32 {
        self.cols as f32 * self.cell_width
    }

    /// Header band plus all rows.
    pub fn grid_height(&self) -> f32 {
        self.header_height + self.rows as f32 * self.cell_height
    }

    pub fn header_band(&self) -> Rect {
        Rect::new(self.offset_x, self.offset_y, self.grid_width(), self.header_height)
    }

    pub fn header_rect(&self, col: usize) -> Rect {
        Rect::new(
            self.offset_x + col as f32 * self.cell_width,
            self.offset_y,
            self.cell_width,
            self.header_height,
        )
    }

    /// All data rows, without the header band.
    pub fn body_rect(&self) -> Rect {
        Rect::new(
            self.offset_x,
            self.offset_y + self.header_height,
            self.grid_width(),
            self.rows as f32 * self.cell_height,
        )
    }

    /// A full-width data row.
    pub fn row_rect(&self, row: usize) -> Rect {
        Rect::new(
            self.offset_x,
            self.offset_y + self.header_height + row as f32 * self.cell_height,
            self.grid_width(),
            self.cell_height,
        )
    }

    pub fn cell_rect(&self, row: usize, col: usize) -> Rect {
        Rect::new(
            self.offset_x + col as f32 * self.cell_width,
            self.offset_y + self.header_height + row as f32 * self.cell_height,
            self.cell_width,
            self.cell_height,
        )
    }

    /// Grid lines: every column edge, the header's bottom edge and every row
    /// edge. Lines sit on pixel centres so a 1px stroke covers exactly one
    /// pixel row or column.
    pub fn border_segments(&self) -> Vec<LineSegment> {
        let snap = |v: f32| v.floor() + 0.5;
        let left = snap(self.offset_x);
        let right = snap(self.offset_x + self.grid_width());
        let top = snap(self.offset_y);
        let bottom = snap(self.offset_y + self.grid_height());

        let mut segments = Vec::with_capacity(self.cols + self.rows + 3);
        for col in 0..=self.cols {
            let x = snap(self.offset_x + col as f32 * self.cell_width);
            segments.push(LineSegment::new(Point::new(x, top), Point::new(x, bottom)));
        }
        for row in 0..=self.rows {
            let y = snap(self.offset_y + self.header_height + row as f32 * self.cell_height);
            segments.push(LineSegment::new(Point::new(left, y), Point::new(right, y)));
        }
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> GridGeometry {
        GridGeometry::compute(Size::new(1600.0, 900.0), &SizePreset::default(), 20, 10)
    }

    #[test]
    fn grid_is_centred_horizontally() {
        let g = geometry();
        assert_eq!(g.offset_x, 50.0);
        assert_eq!(g.offset_y, 0.0);
    }

    #[test]
    fn narrow_viewport_pins_to_left() {
        let g = GridGeometry::compute(Size::new(400.0, 300.0), &SizePreset::default(), 5, 10);
        assert_eq!(g.offset_x, 0.0);
    }

    #[test]
    fn cell_rects() {
        let g = geometry();
        assert_eq!(g.cell_rect(1, 1), Rect::new(200.0, 90.0, 150.0, 40.0));
        assert_eq!(g.header_rect(0), Rect::new(50.0, 0.0, 150.0, 50.0));
        assert_eq!(g.row_rect(0), Rect::new(50.0, 50.0, 1500.0, 40.0));
        assert_eq!(g.grid_height(), 850.0);
    }

    #[test]
    fn border_count() {
        let g = geometry();
        // 11 vertical + 21 horizontal (the first horizontal is the header's bottom).
        assert_eq!(g.border_segments().len(), 32);
    }
}
