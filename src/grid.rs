// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use crate::algorithm::Star;

// Converts a cell coordinate (possibly fractional, negative, or past the far
// edge) to a valid cell index.
fn clamp_cell_index(cell: f64, grid_size: usize) -> usize {
    // Also catches NaN.
    if !(cell > 0.0) {
        return 0;
    }
    let index = cell.floor();
    if index >= (grid_size - 1) as f64 {
        grid_size - 1
    } else {
        index as usize
    }
}

/// Buckets one image's stars into a `grid_size` x `grid_size` array of
/// equally sized cells. Feature enumeration is restricted to the 3x3
/// neighborhood of each cell, bounding the number of 4-star combinations
/// considered.
#[derive(Debug)]
pub struct SpatialGrid<'a> {
    grid_size: usize,
    cell_width: f64,
    cell_height: f64,

    // Row major; cells[row * grid_size + col].
    cells: Vec<Vec<&'a Star>>,
}

impl<'a> SpatialGrid<'a> {
    /// Assigns each of `stars` to exactly one cell. Stars at or beyond the
    /// image's far edges go to the last row/column; stars with negative
    /// coordinates go to the first.
    ///
    /// # Panics
    /// If `grid_size` is 0, if `grid_size * grid_size` overflows, or if either
    /// image dimension is 0.
    pub fn build(stars: &'a [Star], image_width: u32, image_height: u32,
                 grid_size: usize) -> SpatialGrid<'a> {
        assert!(grid_size >= 1, "grid_size must be at least 1, got {}", grid_size);
        assert!(image_width > 0 && image_height > 0,
                "Image dimensions must be positive, got {}x{}",
                image_width, image_height);
        let Some(num_cells) = grid_size.checked_mul(grid_size) else {
            panic!("grid_size {} is too large for a grid_size x grid_size grid",
                   grid_size);
        };
        let mut grid = SpatialGrid{
            grid_size,
            cell_width: image_width as f64 / grid_size as f64,
            cell_height: image_height as f64 / grid_size as f64,
            cells: vec![Vec::new(); num_cells],
        };
        for star in stars {
            let (row, col) = grid.cell_of(star.centroid_x, star.centroid_y);
            grid.cells[row * grid_size + col].push(star);
        }
        grid
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Returns the (row, col) of the cell containing image position (x, y).
    pub fn cell_of(&self, x: f64, y: f64) -> (usize, usize) {
        (clamp_cell_index(y / self.cell_height, self.grid_size),
         clamp_cell_index(x / self.cell_width, self.grid_size))
    }

    /// The stars bucketed into the given cell, in input order.
    pub fn cell(&self, row: usize, col: usize) -> &[&'a Star] {
        &self.cells[row * self.grid_size + col]
    }

    /// Gathers the stars of the 3x3 block of cells centered on (row, col),
    /// truncated at the grid edges. Cells are visited in row major order.
    pub fn neighborhood(&self, row: usize, col: usize) -> Vec<&'a Star> {
        let row_end = usize::min(row + 2, self.grid_size);
        let col_end = usize::min(col + 2, self.grid_size);
        let mut stars = Vec::<&'a Star>::new();
        for r in row.saturating_sub(1)..row_end {
            for c in col.saturating_sub(1)..col_end {
                stars.extend_from_slice(self.cell(r, c));
            }
        }
        stars
    }
}

// mod tests.
