//! Assembly of persisted frames into a single video file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use image::codecs::gif::{GifEncoder as GifWriter, Repeat};
use image::{Delay, Frame as AnimationFrame};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelapseError};

/// Frames per second of every assembled timelapse.
///
/// GIF stores frame delays in hundredths of a second, so the 1000/24 ms delay
/// is truncated to 40 ms and GIF output plays at 25 frames per second. MP4
/// output keeps the exact rate.
pub const FRAME_RATE: u32 = 24;

/// Turns an ordered list of frame images into a video.
pub trait VideoEncoder: Send + Sync {
    /// File extension of the produced container, without the dot.
    fn extension(&self) -> &'static str;

    /// Encode `frames` in the given order at `fps` into `output`.
    fn encode(&self, frames: &[PathBuf], fps: u32, output: &Path) -> Result<()>;
}

/// Available container formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    #[default]
    Mp4,
    Gif,
}

impl EncoderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Gif => "gif",
        }
    }

    pub fn build(&self, ffmpeg: impl Into<PathBuf>) -> Box<dyn VideoEncoder> {
        match self {
            Self::Mp4 => Box::new(FfmpegEncoder::new(ffmpeg)),
            Self::Gif => Box::new(GifEncoder::default()),
        }
    }
}

impl FromStr for EncoderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mp4" => Ok(Self::Mp4),
            "gif" => Ok(Self::Gif),
            other => Err(format!("unknown encoder '{other}', expected mp4 or gif")),
        }
    }
}

/// H.264 MP4 through the system `ffmpeg`, fed PNG frames on stdin.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn extension(&self) -> &'static str {
        "mp4"
    }

    fn encode(&self, frames: &[PathBuf], fps: u32, output: &Path) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(["-y", "-loglevel", "error", "-f", "image2pipe", "-framerate"])
            .arg(fps.to_string())
            .args(["-c:v", "png", "-i", "-"])
            // libx264 with yuv420p needs even dimensions
            .args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"])
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-f", "mp4"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    TimelapseError::Encode(format!(
                        "{} not found; install ffmpeg or use the gif encoder",
                        self.program.display()
                    ))
                } else {
                    TimelapseError::Io(e)
                }
            })?;

        let fed = match child.stdin.take() {
            Some(mut stdin) => feed_frames(&mut stdin, frames),
            None => Err(io::Error::other("ffmpeg stdin unavailable")),
        };

        let out = child.wait_with_output()?;
        if !out.status.success() {
            return Err(TimelapseError::Encode(format!(
                "ffmpeg exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        fed?;
        Ok(())
    }
}

fn feed_frames(stdin: &mut impl Write, frames: &[PathBuf]) -> io::Result<()> {
    for path in frames {
        let mut file = File::open(path)?;
        io::copy(&mut file, stdin)?;
    }
    stdin.flush()
}

/// Infinitely looping animated GIF, encoded in-process.
#[derive(Debug, Clone)]
pub struct GifEncoder {
    /// NeuQuant sampling speed, 1 (best) to 30 (fastest).
    pub speed: i32,
}

impl Default for GifEncoder {
    fn default() -> Self {
        Self { speed: 10 }
    }
}

impl VideoEncoder for GifEncoder {
    fn extension(&self) -> &'static str {
        "gif"
    }

    fn encode(&self, frames: &[PathBuf], fps: u32, output: &Path) -> Result<()> {
        let file = File::create(output)?;
        let mut writer = GifWriter::new_with_speed(BufWriter::new(file), self.speed);
        writer.set_repeat(Repeat::Infinite)?;

        // Truncated to whole centiseconds by the GIF format.
        let delay = Delay::from_numer_denom_ms(1000, fps.max(1));
        for path in frames {
            let rgba = image::open(path)?.to_rgba8();
            writer.encode_frame(AnimationFrame::from_parts(rgba, 0, 0, delay))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Frame, Rgb};
    use image::codecs::gif::GifDecoder;
    use image::AnimationDecoder;
    use std::io::BufReader;
    use std::time::Duration;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [EncoderKind::Mp4, EncoderKind::Gif] {
            assert_eq!(kind.as_str().parse::<EncoderKind>(), Ok(kind));
        }
        assert!("avi".parse::<EncoderKind>().is_err());
    }

    #[test]
    fn gif_contains_every_frame_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let colors = [Rgb(255, 0, 0), Rgb(0, 255, 0), Rgb(0, 0, 255)];
        let frames: Vec<PathBuf> = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| {
                let path = dir.path().join(format!("{i:010}.png"));
                Frame::new(4, 4, 1, color).save_png(&path).unwrap();
                path
            })
            .collect();

        let output = dir.path().join("out.gif");
        GifEncoder::default().encode(&frames, FRAME_RATE, &output).unwrap();

        let decoder = GifDecoder::new(BufReader::new(File::open(&output).unwrap())).unwrap();
        let decoded = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(decoded.len(), 3);
        let first = decoded[0].buffer().get_pixel(0, 0).0;
        assert!(first[0] > 200 && first[1] < 50 && first[2] < 50);

        // 1000/24 ms is truncated to whole centiseconds.
        assert_eq!(Duration::from(decoded[0].delay()), Duration::from_millis(40));
    }

    #[test]
    fn missing_ffmpeg_is_an_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FfmpegEncoder::new(dir.path().join("no-such-ffmpeg"));
        let err = encoder
            .encode(&[], FRAME_RATE, &dir.path().join("out.mp4"))
            .unwrap_err();
        assert!(matches!(err, TimelapseError::Encode(_)));
    }
}
