use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GameId, Owner, Star, StarId, Tick};

/// A registered game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    /// API key used to poll the game server. Kept for bookkeeping only.
    pub api_key: String,
    pub close_date: Option<DateTime<Utc>>,
}

/// Input for registering a new game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGameInput {
    pub id: GameId,
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub close_date: Option<DateTime<Utc>>,
}

/// A game together with the tick range covered by its ownership records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    #[serde(flatten)]
    pub game: Game,
    pub first_tick: Option<Tick>,
    pub last_tick: Option<Tick>,
}

/// Everything a render job resolves before it starts.
#[derive(Debug, Clone)]
pub struct GameMeta {
    pub id: GameId,
    pub name: String,
    pub stars: Vec<Star>,
    pub first_tick: Tick,
    pub last_tick: Tick,
}

impl GameMeta {
    /// Number of frames a timelapse of this game contains.
    pub fn frame_count(&self) -> u32 {
        self.last_tick - self.first_tick + 1
    }
}

/// Star entry of a [`GameExport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarExport {
    pub x: f64,
    pub y: f64,
    /// Ownership changes keyed by tick.
    #[serde(default)]
    pub owners: BTreeMap<Tick, Owner>,
}

/// Full JSON document describing a game, its stars and ownership history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameExport {
    pub id: GameId,
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub close_date: Option<DateTime<Utc>>,
    pub stars: BTreeMap<StarId, StarExport>,
}
