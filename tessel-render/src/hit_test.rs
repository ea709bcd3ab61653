//! Surface coordinates to grid cells.

use std::collections::HashMap;

use tessel_grid::CellRef;

use crate::geometry::GridGeometry;

/// Side of the square buckets results are cached by.
const BUCKET_SIZE: f32 = 10.0;

/// Entries held before the cache is dropped wholesale.
const CACHE_LIMIT: usize = 1000;

/// Maps points to cells, caching results per 10x10 px bucket.
///
/// Cell edges need not fall on bucket edges, so a cached entry is only
/// trusted while it still holds for the queried point: a cached cell must
/// contain it, a cached miss must lie outside the data rows. Anything else
/// is recomputed and replaces the entry.
///
/// The cache must be cleared whenever geometry changes; the engine does this
/// on resize, size changes and row/column edits.
#[derive(Debug, Default)]
pub struct HitTester {
    cache: HashMap<(i64, i64), Option<CellRef>>,
    resets: u64,
}

impl HitTester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell_at(&mut self, x: f32, y: f32, geometry: &GridGeometry) -> Option<CellRef> {
        let key = ((x / BUCKET_SIZE).floor() as i64, (y / BUCKET_SIZE).floor() as i64);
        if let Some(&hit) = self.cache.get(&key) {
            if still_holds(hit, x, y, geometry) {
                return hit;
            }
        }

        let hit = compute(x, y, geometry);
        self.cache.insert(key, hit);
        if self.cache.len() > CACHE_LIMIT {
            tracing::debug!("hit-test cache exceeded {} entries, clearing", CACHE_LIMIT);
            self.cache.clear();
            self.resets += 1;
        }
        hit
    }

    pub fn clear(&mut self) {
        if !self.cache.is_empty() {
            self.cache.clear();
            self.resets += 1;
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }
}

fn still_holds(hit: Option<CellRef>, x: f32, y: f32, g: &GridGeometry) -> bool {
    match hit {
        Some(cell) => g.cell_rect(cell.row, cell.col).contains_xy(x, y),
        None => !g.body_rect().contains_xy(x, y),
    }
}

/// Uncached hit test.
fn compute(x: f32, y: f32, g: &GridGeometry) -> Option<CellRef> {
    let dx = x - g.offset_x;
    let dy = y - g.offset_y;
    if dy < g.header_height || dx < 0.0 {
        return None;
    }
    let col = (dx / g.cell_width).floor();
    let row = ((dy - g.header_height) / g.cell_height).floor();
    if !col.is_finite() || !row.is_finite() {
        return None;
    }
    let (row, col) = (row as usize, col as usize);
    (row < g.rows && col < g.cols).then_some(CellRef::new(row, col))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Size;
    use tessel_grid::SizePreset;

    fn geometry() -> GridGeometry {
        GridGeometry::compute(Size::new(1600.0, 900.0), &SizePreset::default(), 20, 10)
    }

    #[test]
    fn hits_cells() {
        let mut hit = HitTester::new();
        let g = geometry();
        let centre = g.cell_rect(1, 1).center();
        assert_eq!(hit.cell_at(centre.x, centre.y, &g), Some(CellRef::new(1, 1)));
        assert_eq!(hit.cell_at(51.0, 51.0, &g), Some(CellRef::new(0, 0)));
    }

    #[test]
    fn misses_header_margins_and_outside() {
        let mut hit = HitTester::new();
        let g = geometry();
        assert_eq!(hit.cell_at(300.0, 10.0, &g), None);
        assert_eq!(hit.cell_at(20.0, 300.0, &g), None);
        assert_eq!(hit.cell_at(1580.0, 300.0, &g), None);
        assert_eq!(hit.cell_at(300.0, 895.0, &g), None);
    }

    #[test]
    fn results_are_cached_until_cleared() {
        let mut hit = HitTester::new();
        let g = geometry();
        hit.cell_at(275.0, 110.0, &g);
        hit.cell_at(276.0, 111.0, &g);
        assert_eq!(hit.cached(), 1);
        hit.clear();
        assert_eq!(hit.cached(), 0);
        assert_eq!(hit.resets(), 1);
    }

    #[test]
    fn buckets_straddling_cell_edges_answer_per_point() {
        let mut hit = HitTester::new();
        let g = GridGeometry::compute(Size::new(1600.0, 900.0), &SizePreset::preset("small").unwrap(), 20, 10);
        assert_eq!(g.offset_y + g.header_height, 45.0);
        let x = g.cell_rect(0, 0).center().x;

        // 42 is in the header, 47 is row 0; both land in the 40..50 bucket.
        assert_eq!(hit.cell_at(x, 42.0, &g), None);
        assert_eq!(hit.cell_at(x, 47.0, &g), Some(CellRef::new(0, 0)));
        assert_eq!(hit.cell_at(x, 42.0, &g), None);

        // Row 1 ends at 115.
        assert_eq!(hit.cell_at(x, 112.0, &g), Some(CellRef::new(1, 0)));
        assert_eq!(hit.cell_at(x, 117.0, &g), Some(CellRef::new(2, 0)));
        assert_eq!(hit.cell_at(x, 113.0, &g), Some(CellRef::new(1, 0)));
    }

    #[test]
    fn cache_is_bounded() {
        let mut hit = HitTester::new();
        let g = geometry();
        for i in 0..1001 {
            let x = (i % 100) as f32 * 10.0;
            let y = (i / 100) as f32 * 10.0 + 100.0;
            hit.cell_at(x, y, &g);
        }
        assert_eq!(hit.cached(), 0);
        assert_eq!(hit.resets(), 1);
        assert!(hit.cached() <= 1000);
    }
}
