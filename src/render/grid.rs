//! Bucketed spatial index over a fixed star set.
//!
//! Stars are partitioned into square cells of side `max_dist`. Because no star
//! farther than `max_dist` can influence a point, the 3×3 block of cells around
//! the point's cell holds every candidate the rasterizer needs.

use std::collections::HashMap;

use crate::error::{Result, TimelapseError};
use crate::models::{Star, StarId};

/// Absolute cell coordinates: `floor(coordinate / max_dist)` on each axis.
/// Largest number of cells a grid may index, margin included.
pub const MAX_GRID_CELLS: usize = 1 << 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i64,
    pub y: i64,
}

impl CellCoord {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// This cell and its eight neighbors, row by row.
    pub fn neighborhood(self) -> impl Iterator<Item = CellCoord> {
        (-1..=1).flat_map(move |dy| (-1..=1).map(move |dx| CellCoord::new(self.x.saturating_add(dx), self.y.saturating_add(dy))))
    }
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    max_dist: f64,
    /// Cell coordinate of column 0 / row 0, one cell of margin below the lowest star.
    origin: CellCoord,
    columns: usize,
    rows: usize,
    /// Star indices per cell, row-major.
    buckets: Vec<Vec<usize>>,
    stars: Vec<Star>,
    by_id: HashMap<StarId, usize>,
}

impl SpatialGrid {
    /// Index `stars` into cells of side `max_dist`.
    ///
    /// The grid covers every star's cell plus one cell of margin on each side.
    pub fn build(stars: Vec<Star>, max_dist: f64) -> Result<Self> {
        if stars.is_empty() {
            return Err(TimelapseError::InvalidGeometry("star set is empty".to_string()));
        }
        if !(max_dist.is_finite() && max_dist > 0.0) {
            return Err(TimelapseError::InvalidGeometry(format!(
                "influence radius must be positive, got {max_dist}"
            )));
        }

        let mut by_id = HashMap::with_capacity(stars.len());
        for (index, star) in stars.iter().enumerate() {
            if !(star.x.is_finite() && star.y.is_finite()) {
                return Err(TimelapseError::InvalidGeometry(format!(
                    "star {} has non-finite coordinates",
                    star.id
                )));
            }
            if by_id.insert(star.id, index).is_some() {
                return Err(TimelapseError::InvalidGeometry(format!(
                    "duplicate star id {}",
                    star.id
                )));
            }
        }

        let cells: Vec<CellCoord> = stars.iter().map(|s| cell_of_point(s.x, s.y, max_dist)).collect();
        let min_x = cells.iter().map(|c| c.x).min().unwrap_or(0);
        let max_x = cells.iter().map(|c| c.x).max().unwrap_or(0);
        let min_y = cells.iter().map(|c| c.y).min().unwrap_or(0);
        let max_y = cells.iter().map(|c| c.y).max().unwrap_or(0);

        let too_large = || {
            TimelapseError::InvalidGeometry(format!(
                "star set spans more than {MAX_GRID_CELLS} cells at radius {max_dist}"
            ))
        };
        let span = |min: i64, max: i64| {
            max.checked_sub(min)
                .and_then(|d| d.checked_add(3))
                .and_then(|n| usize::try_from(n).ok())
        };
        let columns = span(min_x, max_x).ok_or_else(too_large)?;
        let rows = span(min_y, max_y).ok_or_else(too_large)?;
        if columns.checked_mul(rows).map_or(true, |n| n > MAX_GRID_CELLS) {
            return Err(too_large());
        }
        let origin = match (min_x.checked_sub(1), min_y.checked_sub(1)) {
            (Some(x), Some(y)) => CellCoord::new(x, y),
            _ => return Err(too_large()),
        };

        let mut grid = Self {
            max_dist,
            origin,
            columns,
            rows,
            buckets: vec![Vec::new(); columns * rows],
            stars,
            by_id,
        };
        for (index, cell) in cells.into_iter().enumerate() {
            // Every star cell lies inside the margin-extended range.
            if let Some(slot) = grid.slot(cell) {
                grid.buckets[slot].push(index);
            }
        }

        tracing::debug!(
            stars = grid.stars.len(),
            columns,
            rows,
            "Built spatial grid"
        );
        Ok(grid)
    }

    pub fn max_dist(&self) -> f64 {
        self.max_dist
    }

    pub fn origin(&self) -> CellCoord {
        self.origin
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn star(&self, id: StarId) -> Option<&Star> {
        self.by_id.get(&id).map(|&i| &self.stars[i])
    }

    /// Cell containing a star. Pure function of its coordinates and `max_dist`.
    pub fn cell_of(&self, star: &Star) -> CellCoord {
        cell_of_point(star.x, star.y, self.max_dist)
    }

    pub fn cell_of_point(&self, map_x: f64, map_y: f64) -> CellCoord {
        cell_of_point(map_x, map_y, self.max_dist)
    }

    /// Whether a cell lies within the indexed range.
    pub fn contains_cell(&self, cell: CellCoord) -> bool {
        self.slot(cell).is_some()
    }

    /// All cells of the grid, row by row.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.rows as i64).flat_map(move |row| {
            (0..self.columns as i64)
                .map(move |col| CellCoord::new(self.origin.x + col, self.origin.y + row))
        })
    }

    /// Stars bucketed in one cell; empty for cells outside the grid.
    pub fn stars_in(&self, cell: CellCoord) -> impl Iterator<Item = &Star> + '_ {
        self.slot(cell)
            .into_iter()
            .flat_map(move |slot| self.buckets[slot].iter().map(move |&i| &self.stars[i]))
    }

    /// Every star in the 3×3 block of cells centred on the cell containing the point.
    pub fn neighbors(&self, map_x: f64, map_y: f64) -> impl Iterator<Item = &Star> + '_ {
        self.neighbors_of_cell(self.cell_of_point(map_x, map_y))
    }

    /// Every star in the 3×3 block of cells centred on `cell`. Out-of-range cells are skipped.
    pub fn neighbors_of_cell(&self, cell: CellCoord) -> impl Iterator<Item = &Star> + '_ {
        cell.neighborhood().flat_map(move |c| self.stars_in(c))
    }

    fn slot(&self, cell: CellCoord) -> Option<usize> {
        let col = cell.x.checked_sub(self.origin.x)?;
        let row = cell.y.checked_sub(self.origin.y)?;
        if col < 0 || row < 0 || col >= self.columns as i64 || row >= self.rows as i64 {
            return None;
        }
        Some(row as usize * self.columns + col as usize)
    }
}

fn cell_of_point(x: f64, y: f64, max_dist: f64) -> CellCoord {
    CellCoord::new((x / max_dist).floor() as i64, (y / max_dist).floor() as i64)
}
