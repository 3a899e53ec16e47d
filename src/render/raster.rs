use crate::models::Owner;

use super::grid::SpatialGrid;
use super::ownership::OwnershipState;
use super::params::{RenderParameters, Rgb};

/// What a pixel shows, before any color is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    /// No star within the influence radius.
    Background,
    /// Near-equidistant between stars of different owners.
    Border,
    /// Nearest star's owner and the darkness band of its distance.
    Owned { owner: Owner, band: usize },
}

/// Resolves single pixels against the grid and current ownership.
#[derive(Debug, Clone, Copy)]
pub struct Rasterizer<'a> {
    params: &'a RenderParameters,
}

impl<'a> Rasterizer<'a> {
    pub fn new(params: &'a RenderParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &'a RenderParameters {
        self.params
    }

    /// Classify the map point by its nearest star.
    ///
    /// The result does not depend on the order the candidates are scanned in:
    /// the minimum distance is found first, then any differently owned star
    /// within `border_width` of it turns the pixel into a border.
    pub fn classify(
        &self,
        map_x: f64,
        map_y: f64,
        grid: &SpatialGrid,
        ownership: &OwnershipState,
    ) -> PixelClass {
        let max_dist = grid.max_dist();
        let candidates: Vec<(f64, Owner)> = grid
            .neighbors(map_x, map_y)
            .filter_map(|star| {
                let d = star.distance_to(map_x, map_y);
                (d < max_dist).then(|| (d, ownership.owner(star.id).unwrap_or_default()))
            })
            .collect();

        let Some(&(nearest, owner)) = candidates
            .iter()
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        else {
            return PixelClass::Background;
        };

        let contested = candidates
            .iter()
            .any(|&(d, o)| o != owner && d - nearest <= self.params.border_width);
        if contested {
            return PixelClass::Border;
        }

        PixelClass::Owned {
            owner,
            band: self.params.band_for(nearest),
        }
    }

    /// Final fill color of the map point.
    pub fn resolve_pixel(
        &self,
        map_x: f64,
        map_y: f64,
        grid: &SpatialGrid,
        ownership: &OwnershipState,
    ) -> Rgb {
        self.params
            .color_for(self.classify(map_x, map_y, grid, ownership))
    }
}
