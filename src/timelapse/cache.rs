use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, TimelapseError};
use crate::models::GameId;
use crate::render::RenderParameters;

/// Cache address of a rendered timelapse: game identity plus every render parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKey {
    game_id: GameId,
    digest: String,
}

#[derive(Serialize)]
struct KeyMaterial<'a> {
    game_id: GameId,
    params: &'a RenderParameters,
}

impl ArtifactKey {
    pub fn new(game_id: GameId, params: &RenderParameters) -> Result<Self> {
        let material = serde_json::to_vec(&KeyMaterial { game_id, params })
            .map_err(|e| TimelapseError::Render(format!("cannot serialize render parameters: {e}")))?;
        let hash = blake3::hash(&material);
        Ok(Self {
            game_id,
            digest: hash.to_hex().as_str()[..16].to_string(),
        })
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// File stem shared by the artifact and its working directory.
    pub fn stem(&self) -> String {
        format!("game_{}_{}", self.game_id, self.digest)
    }

    /// Published video location.
    pub fn artifact_path(&self, cache_dir: &Path, extension: &str) -> PathBuf {
        cache_dir.join(format!("{}.{}", self.stem(), extension))
    }

    /// Lock and frame storage of an in-flight job.
    pub fn workdir_path(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(format!("{}.work", self.stem()))
    }
}
