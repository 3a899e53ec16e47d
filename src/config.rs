//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then the JSON config file, then
//! environment variables:
//! - `NPTL_DATABASE` - SQLite database path
//! - `NPTL_CACHE_DIR` - video cache directory
//! - `NPTL_ENCODER` - `mp4` or `gif`
//! - `NPTL_FFMPEG` - ffmpeg binary used by the mp4 encoder

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::render::RenderParameters;
use crate::timelapse::EncoderKind;

const APP_NAME: &str = "np-timelapse";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding games, stars and ownership history.
    pub database: Option<PathBuf>,
    /// Directory where finished videos and in-flight working directories live.
    pub cache_dir: Option<PathBuf>,
    pub encoder: EncoderKind,
    pub ffmpeg: PathBuf,
    pub render: RenderParameters,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            cache_dir: None,
            encoder: EncoderKind::default(),
            ffmpeg: PathBuf::from("ffmpeg"),
            render: RenderParameters::default(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the user's config directory when `path` is `None`,
    /// then apply environment overrides.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(&p)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(db) = lookup("NPTL_DATABASE") {
            self.database = Some(PathBuf::from(db));
        }
        if let Some(dir) = lookup("NPTL_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(encoder) = lookup("NPTL_ENCODER") {
            self.encoder = encoder.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        if let Some(ffmpeg) = lookup("NPTL_FFMPEG") {
            self.ffmpeg = PathBuf::from(ffmpeg);
        }
        Ok(())
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(p) => Ok(p.clone()),
            None => crate::db::default_path(),
        }
    }

    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(p) => Ok(p.clone()),
            None => {
                let dirs = directories::ProjectDirs::from("", "", APP_NAME)
                    .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
                Ok(dirs.data_dir().join("video_cache"))
            }
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Some(path)
}
