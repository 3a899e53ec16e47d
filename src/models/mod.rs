//! Domain models for np-timelapse.
//!
//! # Core Concepts
//!
//! ## Registered Data
//!
//! - [`Game`]: A registered game whose history can be rendered.
//! - [`Star`]: A fixed point of territorial control. A game's star set never
//!   changes once registered.
//! - [`OwnershipEvent`]: A change of [`Owner`] for one star at one tick.
//!
//! ## Render Inputs
//!
//! - [`GameMeta`]: Everything a render job needs up front (stars and tick range).
//! - [`GameExport`]: JSON interchange document used by `import`/`export`.

mod game;
mod ownership;
mod star;

pub use game::*;
pub use ownership::*;
pub use star::*;

/// Identifier of a registered game.
pub type GameId = i64;

/// Identifier of a star, unique within a game.
pub type StarId = u32;

/// Identifier of a player, unique within a game.
pub type PlayerId = u16;

/// A discrete simulated time step.
pub type Tick = u32;
