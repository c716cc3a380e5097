use super::Frame;
use anyhow::Result;
use std::path::Path;

/// An open, sequentially decoded clip.
pub trait Clip {
    /// Index of the next frame `read_frame` will return.
    fn position(&self) -> u64;

    /// Total frames, when the container reports it.
    fn frame_count(&self) -> Option<u64>;

    /// Decode the next frame. `Ok(None)` means the stream is exhausted.
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

/// Opens clips by path. Implemented by the ffmpeg decoder and by test fakes.
pub trait ClipSource {
    fn open(&self, path: &Path) -> Result<Box<dyn Clip>>;
}

/// True when `position` lies within the last `cutoff` frames of the clip.
pub fn is_near_end(position: u64, frame_count: Option<u64>, cutoff: u64) -> bool {
    match frame_count {
        Some(total) if total > 0 => position >= total.saturating_sub(cutoff),
        _ => false,
    }
}
