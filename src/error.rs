use std::path::PathBuf;

use thiserror::Error;

use crate::models::{GameId, StarId, Tick};

/// Errors surfaced by a timelapse generation job.
#[derive(Debug, Error)]
pub enum TimelapseError {
    /// The game is unknown to the data provider or has no ownership records.
    #[error("Game {0} is not registered")]
    DataNotFound(GameId),

    /// Another job holds the working directory for the same artifact.
    #[error("Timelapse generation already in progress at {}", .0.display())]
    ConcurrentGeneration(PathBuf),

    /// The star set cannot be indexed.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Inconsistent data encountered while rendering.
    #[error("Render failed: {0}")]
    Render(String),

    #[error(transparent)]
    Provider(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Video encoding failed: {0}")]
    Encode(String),
}

impl TimelapseError {
    pub fn unknown_star(star_id: StarId, tick: Tick) -> Self {
        Self::Render(format!("ownership event at tick {tick} references unknown star {star_id}"))
    }

    /// Whether the caller may simply try again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentGeneration(_))
    }
}

pub type Result<T, E = TimelapseError> = std::result::Result<T, E>;
