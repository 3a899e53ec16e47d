//! On-disk lock and frame storage of one in-flight job.
//!
//! The directory's existence is the mutual-exclusion signal: it is created with
//! a single `create_dir`, which fails atomically when another job got there
//! first. The guard removes it on every exit path, including unwinding.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, TimelapseError};
use crate::models::Tick;
use crate::render::Frame;

const FRAME_EXTENSION: &str = "png";

/// Zero-padded so that file-name order equals tick order.
pub fn frame_file_name(tick: Tick) -> String {
    format!("{tick:010}.{FRAME_EXTENSION}")
}

/// Tick encoded in a frame file name, if it is one.
pub fn parse_frame_tick(file_name: &str) -> Option<Tick> {
    let stem = file_name.strip_suffix(FRAME_EXTENSION)?.strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Frame files in a directory, ordered by tick. A missing directory has no frames.
pub fn list_frames(dir: &Path) -> io::Result<Vec<(Tick, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut frames = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(tick) = name.to_str().and_then(parse_frame_tick) {
            frames.push((tick, entry.path()));
        }
    }
    frames.sort_by_key(|(tick, _)| *tick);
    Ok(frames)
}

/// Highest tick written so far in a job's directory.
pub fn latest_frame_tick(dir: &Path) -> io::Result<Option<Tick>> {
    Ok(list_frames(dir)?.last().map(|(tick, _)| *tick))
}

#[derive(Debug)]
pub struct WorkingDirectory {
    path: PathBuf,
    released: bool,
}

impl WorkingDirectory {
    /// Create the directory, failing with `ConcurrentGeneration` if it already exists.
    pub fn acquire(path: PathBuf) -> Result<Self> {
        match fs::create_dir(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Acquired working directory");
                Ok(Self {
                    path,
                    released: false,
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(TimelapseError::ConcurrentGeneration(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frame_path(&self, tick: Tick) -> PathBuf {
        self.path.join(frame_file_name(tick))
    }

    /// Persist the frame for `tick`. A frame is written once and never replaced.
    pub fn write_frame(&self, tick: Tick, frame: &Frame) -> Result<PathBuf> {
        let path = self.frame_path(tick);
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        frame.write_png(&mut writer)?;
        writer.flush()?;
        Ok(path)
    }

    /// Persisted frames in ascending tick order.
    pub fn frames(&self) -> io::Result<Vec<PathBuf>> {
        Ok(list_frames(&self.path)?
            .into_iter()
            .map(|(_, path)| path)
            .collect())
    }

    /// Scratch location for the assembled video before it is published.
    pub fn partial_video_path(&self, extension: &str) -> PathBuf {
        self.path.join(format!("video.partial.{extension}"))
    }

    /// Delete all frames and the directory itself.
    pub fn close(mut self) -> io::Result<()> {
        self.released = true;
        remove(&self.path)
    }
}

impl Drop for WorkingDirectory {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove(&self.path) {
            tracing::error!(path = %self.path.display(), "Failed to remove working directory: {}", e);
        }
    }
}

fn remove(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
