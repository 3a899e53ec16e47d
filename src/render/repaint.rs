//! Frame maintenance across ownership changes.
//!
//! A star influences at most the pixels of its own cell and the eight cells
//! around it, so a change of owner only requires repainting that 3×3 block.
//! Star markers are painted over the fill after every repaint.

use std::collections::BTreeSet;

use crate::error::{Result, TimelapseError};
use crate::models::{OwnershipEvent, Star, StarId, Tick};

use super::frame::Frame;
use super::grid::{CellCoord, SpatialGrid};
use super::ownership::OwnershipState;
use super::params::RenderParameters;
use super::raster::Rasterizer;

/// Outcome of applying one tick's events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepaintSummary {
    pub changed: BTreeSet<StarId>,
    pub dirty_cells: BTreeSet<CellCoord>,
}

/// Cells whose pixels may show the influence of any changed star.
///
/// Cells outside the grid are dropped.
pub fn dirty_cells(
    changed: impl IntoIterator<Item = StarId>,
    grid: &SpatialGrid,
) -> BTreeSet<CellCoord> {
    changed
        .into_iter()
        .filter_map(|id| grid.star(id))
        .flat_map(|star| grid.cell_of(star).neighborhood())
        .filter(|&cell| grid.contains_cell(cell))
        .collect()
}

/// Largest frame, in device pixels, a render may allocate (16384 × 16384).
pub const MAX_FRAME_PIXELS: u64 = 16_384 * 16_384;

/// Logical image size for a grid.
///
/// Fails with `InvalidGeometry` when the device frame would exceed
/// [`MAX_FRAME_PIXELS`] or when the grid was indexed with a different radius
/// than the one the parameters render with.
pub fn frame_size(grid: &SpatialGrid, params: &RenderParameters) -> Result<(u32, u32)> {
    if grid.max_dist() != params.max_dist {
        return Err(TimelapseError::InvalidGeometry(format!(
            "grid was built with radius {} but rendering uses {}",
            grid.max_dist(),
            params.max_dist
        )));
    }

    let too_large = || {
        TimelapseError::InvalidGeometry(format!(
            "a {}×{} cell grid at {} pixels per cell and rescale {} exceeds {} pixels",
            grid.columns(),
            grid.rows(),
            params.pixels_per_cell,
            params.rescale,
            MAX_FRAME_PIXELS
        ))
    };
    let logical = |cells: usize| {
        u32::try_from(cells)
            .ok()
            .and_then(|n| n.checked_mul(params.pixels_per_cell))
    };
    let width = logical(grid.columns()).ok_or_else(too_large)?;
    let height = logical(grid.rows()).ok_or_else(too_large)?;

    let device = [width, height, params.rescale, params.rescale]
        .into_iter()
        .try_fold(1u64, |acc, n| acc.checked_mul(u64::from(n)));
    if device.map_or(true, |pixels| pixels > MAX_FRAME_PIXELS) {
        return Err(too_large());
    }
    Ok((width, height))
}

/// Render a complete frame from scratch.
pub fn render_full(
    grid: &SpatialGrid,
    ownership: &OwnershipState,
    params: &RenderParameters,
) -> Result<Frame> {
    let (width, height) = frame_size(grid, params)?;
    let mut frame = Frame::new(width, height, params.rescale, params.color_table.background);
    let raster = Rasterizer::new(params);
    for cell in grid.cells() {
        paint_cell(&mut frame, cell, grid, ownership, &raster);
    }
    draw_markers(&mut frame, grid, ownership, params);
    Ok(frame)
}

/// Re-evaluate every logical pixel of the given cells, leaving all others untouched,
/// then redraw the star markers.
pub fn repaint(
    frame: &mut Frame,
    cells: &BTreeSet<CellCoord>,
    grid: &SpatialGrid,
    ownership: &OwnershipState,
    params: &RenderParameters,
) {
    let raster = Rasterizer::new(params);
    for &cell in cells {
        paint_cell(frame, cell, grid, ownership, &raster);
    }
    draw_markers(frame, grid, ownership, params);
}

fn paint_cell(
    frame: &mut Frame,
    cell: CellCoord,
    grid: &SpatialGrid,
    ownership: &OwnershipState,
    raster: &Rasterizer<'_>,
) {
    let ppc = raster.params().pixels_per_cell;
    let origin = grid.origin();
    let col = (cell.x - origin.x) as u32;
    let row = (cell.y - origin.y) as u32;
    let max_dist = grid.max_dist();

    for py in row * ppc..(row + 1) * ppc {
        for px in col * ppc..(col + 1) * ppc {
            // Sample at the pixel centre, which always falls inside `cell`.
            let map_x = (origin.x as f64 + (f64::from(px) + 0.5) / f64::from(ppc)) * max_dist;
            let map_y = (origin.y as f64 + (f64::from(py) + 0.5) / f64::from(ppc)) * max_dist;
            frame.put(px, py, raster.resolve_pixel(map_x, map_y, grid, ownership));
        }
    }
}

/// Logical pixel containing a star.
pub fn marker_pixel(star: &Star, grid: &SpatialGrid, params: &RenderParameters) -> (u32, u32) {
    let ppc = f64::from(params.pixels_per_cell);
    let origin = grid.origin();
    let to_pixel = |coord: f64, origin: i64, limit: usize| {
        let max = (limit as f64 * ppc) - 1.0;
        ((coord / grid.max_dist() - origin as f64) * ppc)
            .floor()
            .clamp(0.0, max) as u32
    };
    (
        to_pixel(star.x, origin.x, grid.columns()),
        to_pixel(star.y, origin.y, grid.rows()),
    )
}

fn draw_markers(frame: &mut Frame, grid: &SpatialGrid, ownership: &OwnershipState, params: &RenderParameters) {
    for star in grid.stars() {
        let (x, y) = marker_pixel(star, grid, params);
        let owner = ownership.owner(star.id).unwrap_or_default();
        frame.put(x, y, params.star_marker_colors.color_for(owner));
    }
}

/// Owns the evolving frame of one render job.
#[derive(Debug)]
pub struct IncrementalRepainter<'g> {
    grid: &'g SpatialGrid,
    params: RenderParameters,
    ownership: OwnershipState,
    frame: Frame,
}

impl<'g> IncrementalRepainter<'g> {
    /// Start from a full render with every star unclaimed.
    pub fn new(grid: &'g SpatialGrid, params: RenderParameters) -> Result<Self> {
        let ownership = OwnershipState::new(grid.stars().iter().map(|s| s.id));
        let frame = render_full(grid, &ownership, &params)?;
        Ok(Self {
            grid,
            params,
            ownership,
            frame,
        })
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn ownership(&self) -> &OwnershipState {
        &self.ownership
    }

    /// Apply one tick's events and repaint only the cells they can affect.
    pub fn apply(&mut self, tick: Tick, events: &[OwnershipEvent]) -> Result<RepaintSummary> {
        let changed = self.ownership.apply(tick, events)?;
        if changed.is_empty() {
            return Ok(RepaintSummary::default());
        }

        let cells = dirty_cells(changed.iter().copied(), self.grid);
        repaint(&mut self.frame, &cells, self.grid, &self.ownership, &self.params);
        Ok(RepaintSummary {
            changed,
            dirty_cells: cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Owner;

    fn grid() -> SpatialGrid {
        SpatialGrid::build(
            vec![
                Star::new(1, 0.0, 0.0),
                Star::new(2, 0.7, 0.1),
                Star::new(3, 3.0, 3.0),
            ],
            0.6,
        )
        .unwrap()
    }

    fn small_params() -> RenderParameters {
        RenderParameters {
            rescale: 1,
            pixels_per_cell: 4,
            ..RenderParameters::default()
        }
    }

    #[test]
    fn dirty_cells_cover_three_by_three_neighborhood() {
        let grid = grid();
        let cells = dirty_cells([1], &grid);
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&CellCoord::new(-1, -1)));
        assert!(cells.contains(&CellCoord::new(1, 1)));
        assert!(!cells.contains(&CellCoord::new(2, 0)));
    }

    #[test]
    fn frame_covers_the_grid() {
        let grid = grid();
        let params = small_params();
        let frame = IncrementalRepainter::new(&grid, params.clone()).unwrap().frame().clone();
        assert_eq!(frame.logical_width(), grid.columns() as u32 * 4);
        assert_eq!(frame.logical_height(), grid.rows() as u32 * 4);
    }

    #[test]
    fn no_op_events_leave_the_frame_alone() {
        let grid = grid();
        let mut repainter = IncrementalRepainter::new(&grid, small_params()).unwrap();
        let before = repainter.frame().clone();
        let summary = repainter
            .apply(0, &[OwnershipEvent::new(0, 1, Owner::Unclaimed)])
            .unwrap();
        assert!(summary.changed.is_empty());
        assert!(summary.dirty_cells.is_empty());
        assert_eq!(repainter.frame(), &before);
    }

    #[test]
    fn markers_use_marker_colors() {
        let grid = grid();
        let params = small_params();
        let mut repainter = IncrementalRepainter::new(&grid, params.clone()).unwrap();
        repainter
            .apply(0, &[OwnershipEvent::new(0, 3, Owner::Player(2))])
            .unwrap();
        let star = grid.star(3).unwrap();
        let (x, y) = marker_pixel(star, &grid, &params);
        assert_eq!(
            repainter.frame().get(x, y),
            Some(params.star_marker_colors.color_for(Owner::Player(2)))
        );
    }

    #[test]
    fn incremental_matches_full_render() {
        let grid = grid();
        let params = small_params();
        let mut repainter = IncrementalRepainter::new(&grid, params.clone()).unwrap();
        let batches = [
            (0, vec![OwnershipEvent::new(0, 1, Owner::Player(1))]),
            (1, vec![OwnershipEvent::new(1, 2, Owner::Player(3))]),
            (2, vec![OwnershipEvent::new(2, 1, Owner::Player(3)), OwnershipEvent::new(2, 3, Owner::Player(0))]),
        ];
        for (tick, events) in batches {
            repainter.apply(tick, &events).unwrap();
            let full = render_full(&grid, repainter.ownership(), &params).unwrap();
            assert_eq!(repainter.frame(), &full);
        }
    }

    #[test]
    fn oversized_frames_are_rejected() {
        // 503 cells across at 60 device pixels per cell.
        let grid = SpatialGrid::build(vec![Star::new(1, 0.0, 0.0), Star::new(2, 300.1, 300.1)], 0.6)
            .unwrap();
        let err = frame_size(&grid, &RenderParameters::default()).unwrap_err();
        assert!(matches!(err, TimelapseError::InvalidGeometry(_)));

        let err = IncrementalRepainter::new(&grid, RenderParameters::default()).unwrap_err();
        assert!(matches!(err, TimelapseError::InvalidGeometry(_)));

        // The same grid fits at one device pixel per cell.
        let tiny = RenderParameters {
            rescale: 1,
            pixels_per_cell: 1,
            ..RenderParameters::default()
        };
        assert_eq!(frame_size(&grid, &tiny).unwrap(), (503, 503));
    }

    #[test]
    fn grid_and_parameters_must_share_a_radius() {
        let grid = grid();
        let params = RenderParameters {
            max_dist: 0.5,
            ..small_params()
        };
        let err = render_full(&grid, &OwnershipState::new([1, 2, 3]), &params).unwrap_err();
        assert!(matches!(err, TimelapseError::InvalidGeometry(_)));
    }
}
