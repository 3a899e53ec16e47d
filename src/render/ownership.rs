use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{Result, TimelapseError};
use crate::models::{Owner, OwnershipEvent, StarId, Tick};

/// Current controller of every star, advanced one tick batch at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnershipState {
    owners: HashMap<StarId, Owner>,
    last_tick: Option<Tick>,
}

impl OwnershipState {
    /// Every star starts out unclaimed.
    pub fn new(stars: impl IntoIterator<Item = StarId>) -> Self {
        Self {
            owners: stars.into_iter().map(|id| (id, Owner::Unclaimed)).collect(),
            last_tick: None,
        }
    }

    pub fn owner(&self, star_id: StarId) -> Option<Owner> {
        self.owners.get(&star_id).copied()
    }

    /// Apply the ownership events of one tick and return the stars whose owner changed.
    ///
    /// Duplicate events for a star collapse to the last one. Events that leave a
    /// star with its current owner are no-ops and are not reported.
    pub fn apply(&mut self, tick: Tick, events: &[OwnershipEvent]) -> Result<BTreeSet<StarId>> {
        if let Some(last) = self.last_tick {
            if tick < last {
                return Err(TimelapseError::Render(format!(
                    "ownership batch for tick {tick} arrived after tick {last}"
                )));
            }
        }

        let mut latest: BTreeMap<StarId, Owner> = BTreeMap::new();
        for event in events {
            if event.tick != tick {
                return Err(TimelapseError::Render(format!(
                    "event for star {} carries tick {} inside batch for tick {tick}",
                    event.star_id, event.tick
                )));
            }
            if !self.owners.contains_key(&event.star_id) {
                return Err(TimelapseError::unknown_star(event.star_id, tick));
            }
            latest.insert(event.star_id, event.owner);
        }

        let mut changed = BTreeSet::new();
        for (star_id, owner) in latest {
            if let Some(current) = self.owners.get_mut(&star_id) {
                if *current != owner {
                    *current = owner;
                    changed.insert(star_id);
                }
            }
        }

        self.last_tick = Some(tick);
        Ok(changed)
    }
}
