//! Clip decoding through the ffmpeg/ffprobe binaries.
//!
//! `ffprobe` reports the first video stream's geometry and frame count; `ffmpeg`
//! then streams raw RGB24 frames over a pipe, scaled to the displayed size of
//! the stream. Dropping the clip kills the child.

use super::source::{Clip, ClipSource};
use super::Frame;
use crate::log_debug;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<usize>,
    height: Option<usize>,
    nb_frames: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

impl ProbeStream {
    /// Display rotation in degrees, from the display matrix or the legacy tag.
    fn rotation(&self) -> i64 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .or_else(|| self.tags.get("rotate").and_then(|raw| raw.trim().parse().ok()))
            .unwrap_or(0.0);
        (degrees.round() as i64).rem_euclid(360)
    }
}

/// Displayed geometry and length of a clip's first video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeInfo {
    pub width: usize,
    pub height: usize,
    pub frame_count: Option<u64>,
}

/// Parse `ffprobe -of json` output for the entries in [`PROBE_ENTRIES`].
///
/// Streams rotated by a quarter turn report their coded size; the width and
/// height are swapped so they match what ffmpeg emits after autorotation.
pub fn parse_probe_output(json: &[u8]) -> Result<ProbeInfo> {
    let output: ProbeOutput =
        serde_json::from_slice(json).context("failed to parse ffprobe output")?;
    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no video stream found"))?;
    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        bail!("video stream has no dimensions");
    };
    if width == 0 || height == 0 {
        bail!("video stream reports an empty frame size {width}x{height}");
    }
    let (width, height) = match stream.rotation() {
        90 | 270 => (height, width),
        _ => (width, height),
    };
    // Containers without an index report "N/A"; near-end detection is skipped then.
    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|count| *count > 0);
    Ok(ProbeInfo {
        width,
        height,
        frame_count,
    })
}

const PROBE_ENTRIES: &str =
    "stream=width,height,nb_frames:stream_side_data=rotation:stream_tags=rotate";

/// Clip source backed by external ffmpeg/ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegSource {
    ffmpeg_cmd: String,
    ffprobe_cmd: String,
}

impl FfmpegSource {
    pub fn new(ffmpeg_cmd: impl Into<String>, ffprobe_cmd: impl Into<String>) -> Self {
        Self {
            ffmpeg_cmd: ffmpeg_cmd.into(),
            ffprobe_cmd: ffprobe_cmd.into(),
        }
    }

    pub fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        let output = Command::new(&self.ffprobe_cmd)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                PROBE_ENTRIES,
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run {}", self.ffprobe_cmd))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffprobe failed for '{}': {}", path.display(), stderr.trim());
        }
        parse_probe_output(&output.stdout)
    }
}

impl ClipSource for FfmpegSource {
    fn open(&self, path: &Path) -> Result<Box<dyn Clip>> {
        if !path.is_file() {
            bail!("video '{}' does not exist", path.display());
        }
        let info = self
            .probe(path)
            .with_context(|| format!("failed to probe '{}'", path.display()))?;
        let clip = FfmpegClip::spawn(&self.ffmpeg_cmd, path, info)?;
        Ok(Box::new(clip))
    }
}

struct FfmpegClip {
    child: Child,
    stdout: ChildStdout,
    info: ProbeInfo,
    position: u64,
}

impl FfmpegClip {
    fn spawn(ffmpeg_cmd: &str, path: &Path, info: ProbeInfo) -> Result<Self> {
        let mut child = Command::new(ffmpeg_cmd)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-vf"])
            .arg(format!("scale={}:{}", info.width, info.height))
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start {ffmpeg_cmd} for '{}'", path.display()))?;
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                bail!("{ffmpeg_cmd} did not expose a stdout pipe");
            }
        };
        Ok(Self {
            child,
            stdout,
            info,
            position: 0,
        })
    }
}

impl Clip for FfmpegClip {
    fn position(&self) -> u64 {
        self.position
    }

    fn frame_count(&self) -> Option<u64> {
        self.info.frame_count
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut data = vec![0u8; self.info.width * self.info.height * super::frame::CHANNELS];
        match self.stdout.read_exact(&mut data) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err).context("failed to read decoded frame"),
        }
        self.position += 1;
        Frame::from_rgb(self.info.width, self.info.height, data)
            .map(Some)
            .ok_or_else(|| anyhow!("decoded frame has unexpected length"))
    }
}

impl Drop for FfmpegClip {
    fn drop(&mut self) {
        if let Err(err) = self.child.kill() {
            if err.kind() != ErrorKind::InvalidInput {
                log_debug(&format!("failed to stop ffmpeg decoder: {err}"));
            }
        }
        let _ = self.child.wait();
    }
}
