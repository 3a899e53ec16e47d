use serde::{Deserialize, Serialize};

use super::{PlayerId, StarId, Tick};

/// Who controls a star.
///
/// Serialized as the player id, or `null` for [`Owner::Unclaimed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Option<PlayerId>", into = "Option<PlayerId>")]
pub enum Owner {
    #[default]
    Unclaimed,
    Player(PlayerId),
}

impl Owner {
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::Unclaimed => None,
            Self::Player(p) => Some(*p),
        }
    }
}

impl From<Option<PlayerId>> for Owner {
    fn from(player: Option<PlayerId>) -> Self {
        player.map_or(Self::Unclaimed, Self::Player)
    }
}

impl From<Owner> for Option<PlayerId> {
    fn from(owner: Owner) -> Self {
        owner.player()
    }
}

/// A change of ownership effective at a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipEvent {
    pub tick: Tick,
    pub star_id: StarId,
    pub owner: Owner,
}

impl OwnershipEvent {
    pub fn new(tick: Tick, star_id: StarId, owner: Owner) -> Self {
        Self {
            tick,
            star_id,
            owner,
        }
    }
}
