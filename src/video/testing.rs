//! In-memory clips for exercising the player without ffmpeg.

use super::{Clip, ClipSource, Frame};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Encodes (clip id, frame index) into the first pixel so tests can tell
/// which clip and which frame a returned frame came from.
pub(crate) fn stamp(clip_id: u8, index: u64) -> [u8; 3] {
    [clip_id, (index / 256) as u8, (index % 256) as u8]
}

pub(crate) fn read_stamp(frame: &Frame) -> (u8, u64) {
    let [id, hi, lo] = frame.pixel(0, 0);
    (id, u64::from(hi) * 256 + u64::from(lo))
}

#[derive(Clone)]
struct ClipSpec {
    id: u8,
    frames: u64,
    report_count: bool,
    size: (usize, usize),
}

struct ScriptedClip {
    spec: ClipSpec,
    position: u64,
}

impl Clip for ScriptedClip {
    fn position(&self) -> u64 {
        self.position
    }

    fn frame_count(&self) -> Option<u64> {
        self.spec.report_count.then_some(self.spec.frames)
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if self.position >= self.spec.frames {
            return Ok(None);
        }
        let (w, h) = self.spec.size;
        let frame = Frame::filled(w, h, stamp(self.spec.id, self.position));
        self.position += 1;
        Ok(Some(frame))
    }
}

/// Clip source with a fixed catalogue; unknown paths fail to open.
#[derive(Clone, Default)]
pub(crate) struct ScriptedClipSource {
    clips: HashMap<PathBuf, ClipSpec>,
    opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScriptedClipSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_clip(mut self, path: &str, id: u8, frames: u64) -> Self {
        self.clips.insert(
            PathBuf::from(path),
            ClipSpec {
                id,
                frames,
                report_count: true,
                size: (8, 6),
            },
        );
        self
    }

    /// A clip whose container does not report a frame count.
    pub(crate) fn with_unindexed_clip(mut self, path: &str, id: u8, frames: u64) -> Self {
        self.clips.insert(
            PathBuf::from(path),
            ClipSpec {
                id,
                frames,
                report_count: false,
                size: (8, 6),
            },
        );
        self
    }

    /// Every path opened so far, in order.
    pub(crate) fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().map(|list| list.clone()).unwrap_or_default()
    }
}

impl ClipSource for ScriptedClipSource {
    fn open(&self, path: &Path) -> Result<Box<dyn Clip>> {
        let spec = self
            .clips
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such clip '{}'", path.display()))?;
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(path.to_path_buf());
        }
        Ok(Box::new(ScriptedClip { spec, position: 0 }))
    }
}
