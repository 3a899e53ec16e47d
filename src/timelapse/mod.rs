//! Timelapse generation jobs.
//!
//! A job walks a game's ticks in order, repaints the territory frame for each
//! tick's ownership changes, persists every frame into its working directory
//! and finally assembles the frames into a single video that is published into
//! the cache with one atomic rename.
//!
//! Job state is observable from the filesystem alone:
//!
//! - `NotReady`: neither the working directory nor the video exists.
//! - `InProgress`: the working directory exists; its highest frame shows progress.
//! - `Ready`: the published video exists.

mod cache;
mod encoder;
mod provider;
mod workdir;

pub use cache::ArtifactKey;
pub use encoder::{EncoderKind, FfmpegEncoder, GifEncoder, VideoEncoder, FRAME_RATE};
pub use provider::DataProvider;
pub use workdir::{frame_file_name, latest_frame_tick, list_frames, parse_frame_tick, WorkingDirectory};

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{Result, TimelapseError};
use crate::models::{GameId, GameMeta};
use crate::render::{frame_size, IncrementalRepainter, RenderParameters, SpatialGrid};

/// Externally observable state of a timelapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    NotReady,
    InProgress {
        /// Highest tick whose frame has been written.
        latest_tick: Option<crate::models::Tick>,
        frames_written: usize,
    },
    Ready(PathBuf),
}

/// Runs generation jobs against a data provider and a video cache directory.
pub struct Orchestrator<P> {
    provider: P,
    encoder: Box<dyn VideoEncoder>,
    cache_dir: PathBuf,
}

impl<P: DataProvider> Orchestrator<P> {
    pub fn new(provider: P, encoder: Box<dyn VideoEncoder>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            encoder,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Where the video for this game and parameter set is published.
    pub fn artifact_path(&self, game_id: GameId, params: &RenderParameters) -> Result<PathBuf> {
        Ok(ArtifactKey::new(game_id, params)?.artifact_path(&self.cache_dir, self.encoder.extension()))
    }

    /// Current state of the timelapse, read from the filesystem.
    pub fn status(&self, game_id: GameId, params: &RenderParameters) -> Result<JobStatus> {
        let key = ArtifactKey::new(game_id, params)?;
        let artifact = key.artifact_path(&self.cache_dir, self.encoder.extension());
        if artifact.is_file() {
            return Ok(JobStatus::Ready(artifact));
        }

        let workdir = key.workdir_path(&self.cache_dir);
        if !workdir.is_dir() {
            return Ok(JobStatus::NotReady);
        }
        let frames = list_frames(&workdir)?;
        Ok(JobStatus::InProgress {
            latest_tick: frames.last().map(|(tick, _)| *tick),
            frames_written: frames.len(),
        })
    }

    /// Render the timelapse of a game, or return the cached video if it exists.
    ///
    /// Fails with [`TimelapseError::ConcurrentGeneration`] without touching the
    /// filesystem when another job is producing the same video.
    pub fn generate(&self, game_id: GameId, params: &RenderParameters) -> Result<PathBuf> {
        let job_id = Uuid::new_v4();
        let span = tracing::info_span!("timelapse", game_id, %job_id);
        let _enter = span.enter();

        let meta = self
            .provider
            .resolve_game(game_id)?
            .ok_or_else(|| {
                tracing::error!("Attempt to generate unregistered game {}", game_id);
                TimelapseError::DataNotFound(game_id)
            })?;
        if meta.last_tick < meta.first_tick {
            return Err(TimelapseError::Render(format!(
                "game {} has an empty tick range {}..={}",
                game_id, meta.first_tick, meta.last_tick
            )));
        }

        let key = ArtifactKey::new(game_id, params)?;
        let artifact = key.artifact_path(&self.cache_dir, self.encoder.extension());
        if artifact.is_file() {
            tracing::info!(path = %artifact.display(), "Timelapse already cached");
            return Ok(artifact);
        }

        params.validate().map_err(TimelapseError::InvalidGeometry)?;
        let grid = SpatialGrid::build(meta.stars.clone(), params.max_dist)?;
        frame_size(&grid, params)?;

        fs::create_dir_all(&self.cache_dir)?;
        let workdir = match WorkingDirectory::acquire(key.workdir_path(&self.cache_dir)) {
            Ok(workdir) => workdir,
            Err(e @ TimelapseError::ConcurrentGeneration(_)) => {
                tracing::warn!("Working directory exists, aborting generation");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        // A job that finished between the cache check and the lock already published.
        if artifact.is_file() {
            workdir.close()?;
            return Ok(artifact);
        }

        tracing::info!(
            first_tick = meta.first_tick,
            last_tick = meta.last_tick,
            stars = meta.stars.len(),
            "Generation start"
        );
        let outcome = self
            .render_frames(&workdir, &grid, &meta, params)
            .and_then(|()| self.assemble(&workdir, &artifact));

        tracing::info!("Cleanup");
        let cleanup = workdir.close();
        match outcome {
            Ok(()) => {
                cleanup?;
                tracing::info!(path = %artifact.display(), "Generation successful");
                Ok(artifact)
            }
            Err(e) => {
                if let Err(cleanup_err) = cleanup {
                    tracing::error!("Cleanup after failure also failed: {}", cleanup_err);
                }
                tracing::error!("Generation failed: {}", e);
                Err(e)
            }
        }
    }

    fn render_frames(
        &self,
        workdir: &WorkingDirectory,
        grid: &SpatialGrid,
        meta: &GameMeta,
        params: &RenderParameters,
    ) -> Result<()> {
        let mut repainter = IncrementalRepainter::new(grid, params.clone())?;

        for tick in meta.first_tick..=meta.last_tick {
            if (tick - meta.first_tick) % FRAME_RATE == 0 {
                tracing::info!("Generating tick {}", tick);
            }
            let events = self.provider.tick_diff(meta.id, tick)?;
            let summary = repainter.apply(tick, &events)?;
            tracing::debug!(
                tick,
                changed = summary.changed.len(),
                dirty_cells = summary.dirty_cells.len(),
                "Repainted"
            );
            workdir.write_frame(tick, repainter.frame())?;
        }
        Ok(())
    }

    fn assemble(&self, workdir: &WorkingDirectory, artifact: &Path) -> Result<()> {
        tracing::info!("Rendering video");
        let frames = workdir.frames()?;
        let partial = workdir.partial_video_path(self.encoder.extension());
        self.encoder.encode(&frames, FRAME_RATE, &partial)?;
        fs::rename(&partial, artifact)?;
        Ok(())
    }
}
