use serde::{Deserialize, Serialize};

use crate::models::Owner;

use super::raster::PixelClass;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Scale every channel by `factor` (0.0 to 1.0), truncating.
    pub fn darken(self, factor: f64) -> Rgb {
        let scale = |c: u8| (f64::from(c) * factor.clamp(0.0, 1.0)) as u8;
        Rgb(scale(self.0), scale(self.1), scale(self.2))
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.0, self.1, self.2]
    }
}

/// Fill colors for territory, background and borders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorTable {
    /// Base colors indexed by player id, wrapping around.
    pub players: Vec<Rgb>,
    /// Territory of unclaimed stars.
    pub unclaimed: Rgb,
    /// Pixels with no star within the influence radius.
    pub background: Rgb,
    /// Pixels near-equidistant between differently owned stars.
    pub border: Rgb,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self {
            players: default_player_colors(),
            unclaimed: Rgb(64, 64, 64),
            background: Rgb::BLACK,
            border: Rgb(32, 32, 32),
        }
    }
}

impl ColorTable {
    /// Undarkened base color of an owner.
    pub fn base(&self, owner: Owner) -> Rgb {
        match owner {
            Owner::Unclaimed => self.unclaimed,
            Owner::Player(p) => player_color(&self.players, p, self.unclaimed),
        }
    }
}

/// Colors used for star icons, independent of the territory fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarMarkerColors {
    pub players: Vec<Rgb>,
    pub unclaimed: Rgb,
}

impl Default for StarMarkerColors {
    fn default() -> Self {
        Self {
            players: default_player_colors(),
            unclaimed: Rgb(192, 192, 192),
        }
    }
}

impl StarMarkerColors {
    pub fn color_for(&self, owner: Owner) -> Rgb {
        match owner {
            Owner::Unclaimed => self.unclaimed,
            Owner::Player(p) => player_color(&self.players, p, self.unclaimed),
        }
    }
}

fn default_player_colors() -> Vec<Rgb> {
    vec![
        Rgb(0, 0, 255),
        Rgb(0, 255, 255),
        Rgb(0, 255, 0),
        Rgb(255, 255, 0),
        Rgb(255, 128, 0),
        Rgb(255, 0, 0),
        Rgb(255, 0, 255),
        Rgb(128, 0, 255),
    ]
}

fn player_color(palette: &[Rgb], player: u16, fallback: Rgb) -> Rgb {
    if palette.is_empty() {
        return fallback;
    }
    palette[usize::from(player) % palette.len()]
}

/// Options controlling how a timelapse is drawn.
///
/// Together with the game id these form the cache key of a rendered video,
/// so every field that affects output lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParameters {
    /// Maximum influence radius of a star in map units; also the grid cell side.
    pub max_dist: f64,
    /// Device pixels per logical pixel.
    pub rescale: u32,
    /// Logical pixels per grid cell.
    pub pixels_per_cell: u32,
    /// Distance tolerance in map units under which two candidates count as equidistant.
    pub border_width: f64,
    /// Brightness factors ordered from nearest to farthest band.
    pub darkness_levels: Vec<f64>,
    pub color_table: ColorTable,
    pub star_marker_colors: StarMarkerColors,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            max_dist: 0.6,
            rescale: 6,
            pixels_per_cell: 10,
            border_width: 0.03,
            darkness_levels: vec![1.0, 0.875, 0.75, 0.625, 0.5, 0.375],
            color_table: ColorTable::default(),
            star_marker_colors: StarMarkerColors::default(),
        }
    }
}

impl RenderParameters {
    /// Darkness band for a winning distance: 0 at the star, increasing outward.
    pub fn band_for(&self, distance: f64) -> usize {
        let levels = self.darkness_levels.len().max(1);
        let ratio = (distance / self.max_dist).max(0.0);
        ((ratio * levels as f64) as usize).min(levels - 1)
    }

    /// Combine the independently resolved owner, band and border values into a color.
    pub fn color_for(&self, class: PixelClass) -> Rgb {
        match class {
            PixelClass::Background => self.color_table.background,
            PixelClass::Border => self.color_table.border,
            PixelClass::Owned { owner, band } => {
                let factor = self.darkness_levels.get(band).copied().unwrap_or(1.0);
                self.color_table.base(owner).darken(factor)
            }
        }
    }

    /// Reject parameter sets that cannot produce an image.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.max_dist.is_finite() && self.max_dist > 0.0) {
            return Err(format!("max_dist must be positive, got {}", self.max_dist));
        }
        if self.rescale == 0 || self.pixels_per_cell == 0 {
            return Err("rescale and pixels_per_cell must be at least 1".to_string());
        }
        if !(self.border_width.is_finite() && self.border_width >= 0.0) {
            return Err(format!("border_width must be non-negative, got {}", self.border_width));
        }
        Ok(())
    }
}
