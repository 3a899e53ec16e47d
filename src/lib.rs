//! Territory timelapses for Neptune's Pride games.
//!
//! Each tick of a game's ownership history becomes one frame in which every
//! pixel is colored by its nearest controlled star. Frames are repainted
//! incrementally as stars change hands and assembled into a single video.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod render;
pub mod timelapse;

pub use error::{Result, TimelapseError};
