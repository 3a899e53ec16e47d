//! Fake collaborators shared by the integration specs.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};

use image::RgbImage;
use np_timelapse::models::{GameId, GameMeta, Owner, OwnershipEvent, Star, Tick};
use np_timelapse::render::RenderParameters;
use np_timelapse::timelapse::{DataProvider, VideoEncoder};
use np_timelapse::TimelapseError;

pub const GAME_ID: GameId = 42;

/// Small frames keep the specs fast.
pub fn small_params() -> RenderParameters {
    RenderParameters {
        rescale: 1,
        pixels_per_cell: 4,
        ..RenderParameters::default()
    }
}

/// In-memory game with scripted ownership history.
#[derive(Default)]
pub struct FakeProvider {
    pub meta: Option<GameMeta>,
    pub events: BTreeMap<Tick, Vec<OwnershipEvent>>,
    /// Fail the diff fetch for this tick.
    pub fail_at: Option<Tick>,
    pub diff_calls: Mutex<Vec<Tick>>,
}

impl FakeProvider {
    pub fn new(stars: Vec<Star>, first_tick: Tick, last_tick: Tick) -> Self {
        Self {
            meta: Some(GameMeta {
                id: GAME_ID,
                name: "Test Game".to_string(),
                stars,
                first_tick,
                last_tick,
            }),
            ..Self::default()
        }
    }

    pub fn with_event(mut self, tick: Tick, star_id: u32, owner: Owner) -> Self {
        self.events
            .entry(tick)
            .or_default()
            .push(OwnershipEvent::new(tick, star_id, owner));
        self
    }

    pub fn diff_calls(&self) -> usize {
        self.diff_calls.lock().unwrap().len()
    }
}

impl DataProvider for FakeProvider {
    fn resolve_game(&self, game_id: GameId) -> anyhow::Result<Option<GameMeta>> {
        Ok(self.meta.clone().filter(|m| m.id == game_id))
    }

    fn tick_diff(&self, _game_id: GameId, tick: Tick) -> anyhow::Result<Vec<OwnershipEvent>> {
        self.diff_calls.lock().unwrap().push(tick);
        if self.fail_at == Some(tick) {
            anyhow::bail!("data store unavailable at tick {tick}");
        }
        Ok(self.events.get(&tick).cloned().unwrap_or_default())
    }
}

/// Provider that parks on its first diff fetch until released.
pub struct GatedProvider {
    pub inner: FakeProvider,
    pub started: Mutex<mpsc::Sender<()>>,
    pub release: Mutex<mpsc::Receiver<()>>,
}

impl DataProvider for GatedProvider {
    fn resolve_game(&self, game_id: GameId) -> anyhow::Result<Option<GameMeta>> {
        self.inner.resolve_game(game_id)
    }

    fn tick_diff(&self, game_id: GameId, tick: Tick) -> anyhow::Result<Vec<OwnershipEvent>> {
        if self.inner.diff_calls() == 0 {
            self.started.lock().unwrap().send(())?;
            self.release.lock().unwrap().recv()?;
        }
        self.inner.tick_diff(game_id, tick)
    }
}

/// What a [`RecordingEncoder`] saw in one call.
#[derive(Debug, Clone)]
pub struct EncodeCall {
    pub frames: Vec<RgbImage>,
    pub frame_names: Vec<String>,
    pub fps: u32,
    pub output: PathBuf,
}

/// Decodes every frame it is given and writes a placeholder video.
#[derive(Clone, Default)]
pub struct RecordingEncoder {
    pub calls: Arc<Mutex<Vec<EncodeCall>>>,
    pub fail: bool,
}

impl RecordingEncoder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<EncodeCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl VideoEncoder for RecordingEncoder {
    fn extension(&self) -> &'static str {
        "vid"
    }

    fn encode(&self, frames: &[PathBuf], fps: u32, output: &Path) -> Result<(), TimelapseError> {
        let decoded = frames
            .iter()
            .map(|p| image::open(p).map(|img| img.to_rgb8()))
            .collect::<Result<Vec<_>, _>>()?;
        self.calls.lock().unwrap().push(EncodeCall {
            frames: decoded,
            frame_names: frames
                .iter()
                .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
                .collect(),
            fps,
            output: output.to_path_buf(),
        });
        if self.fail {
            return Err(TimelapseError::Encode("encoder crashed".to_string()));
        }
        fs::write(output, b"video")?;
        Ok(())
    }
}

/// Entries directly inside a directory, sorted; empty if it does not exist.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().to_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
