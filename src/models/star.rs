use serde::{Deserialize, Serialize};

use super::StarId;

/// A star at fixed continuous map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub id: StarId,
    pub x: f64,
    pub y: f64,
}

impl Star {
    pub fn new(id: StarId, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    /// Euclidean distance from this star to a map point.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}
