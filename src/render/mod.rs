//! Spatial ownership rasterization.
//!
//! Every logical pixel is colored by the nearest star within the influence
//! radius, producing a discretized Voronoi diagram of territory. The pieces:
//!
//! - [`SpatialGrid`]: star buckets for 3×3 neighbor queries.
//! - [`OwnershipState`]: star → owner, advanced tick by tick.
//! - [`Rasterizer`]: nearest-star resolution, falloff bands and borders.
//! - [`IncrementalRepainter`]: repaints only the cells a change can affect.

mod frame;
mod grid;
mod ownership;
mod params;
mod raster;
mod repaint;

pub use frame::Frame;
pub use grid::{CellCoord, SpatialGrid, MAX_GRID_CELLS};
pub use ownership::OwnershipState;
pub use params::{ColorTable, RenderParameters, Rgb, StarMarkerColors};
pub use raster::{PixelClass, Rasterizer};
pub use repaint::{
    dirty_cells, frame_size, marker_pixel, render_full, repaint, IncrementalRepainter,
    RepaintSummary, MAX_FRAME_PIXELS,
};
