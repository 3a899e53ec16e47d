use std::sync::Arc;

use crate::models::{GameId, GameMeta, OwnershipEvent, Tick};

/// Source of game metadata and per-tick ownership changes.
///
/// Errors are fatal for the job that requested the data; implementations
/// should not retry internally.
pub trait DataProvider {
    /// Stars and tick range of a game, or `None` when the game is unknown or
    /// has no ownership history.
    fn resolve_game(&self, game_id: GameId) -> anyhow::Result<Option<GameMeta>>;

    /// Ownership changes effective at `tick`, possibly empty.
    fn tick_diff(&self, game_id: GameId, tick: Tick) -> anyhow::Result<Vec<OwnershipEvent>>;
}

impl<T: DataProvider + ?Sized> DataProvider for &T {
    fn resolve_game(&self, game_id: GameId) -> anyhow::Result<Option<GameMeta>> {
        (**self).resolve_game(game_id)
    }

    fn tick_diff(&self, game_id: GameId, tick: Tick) -> anyhow::Result<Vec<OwnershipEvent>> {
        (**self).tick_diff(game_id, tick)
    }
}

impl<T: DataProvider + ?Sized> DataProvider for Arc<T> {
    fn resolve_game(&self, game_id: GameId) -> anyhow::Result<Option<GameMeta>> {
        (**self).resolve_game(game_id)
    }

    fn tick_diff(&self, game_id: GameId, tick: Tick) -> anyhow::Result<Vec<OwnershipEvent>> {
        (**self).tick_diff(game_id, tick)
    }
}
