//! Clip selection and seamless looping.
//!
//! The player owns the only open clip. When the clip reaches its near-end cutoff
//! (or runs dry) it reports a transition, raises the end-of-clip signal and
//! reselects according to the current state's policy before returning a frame.

use super::source::{is_near_end, Clip, ClipSource};
use super::Frame;
use crate::log_debug;
use crate::rules::ClipEndSignal;
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

/// Output geometry and looping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    pub width: usize,
    pub height: usize,
    pub end_cutoff: u64,
}

/// What to play for the current state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Pick uniformly from these candidates on every (re)selection.
    Random(Vec<PathBuf>),
    /// Always play this clip.
    Specific(PathBuf),
    /// Nothing to play until the next state switch.
    #[default]
    Nothing,
}

struct PlaybackSession {
    clip: Box<dyn Clip>,
    path: PathBuf,
}

pub struct VideoPlayer<S: ClipSource> {
    source: S,
    config: PlayerConfig,
    session: Option<PlaybackSession>,
    selection: Selection,
    clip_end: ClipEndSignal,
    transition_cue: bool,
    retry_pending: bool,
    rng: StdRng,
}

impl<S: ClipSource> VideoPlayer<S> {
    pub fn new(source: S, config: PlayerConfig, clip_end: ClipEndSignal) -> Self {
        Self::with_rng(source, config, clip_end, StdRng::from_entropy())
    }

    pub fn with_rng(source: S, config: PlayerConfig, clip_end: ClipEndSignal, rng: StdRng) -> Self {
        Self {
            source,
            config,
            session: None,
            selection: Selection::Nothing,
            clip_end,
            transition_cue: false,
            retry_pending: false,
            rng,
        }
    }

    pub fn config(&self) -> PlayerConfig {
        self.config
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|session| session.path.as_path())
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Adopt a state's selection policy and open a clip for it right away.
    ///
    /// Any end-of-clip signal left over from the previous state is discarded.
    pub fn select(&mut self, selection: Selection) {
        self.clip_end.take();
        self.selection = selection;
        self.reselect();
    }

    /// Release the current clip and open a random one from `candidates`.
    ///
    /// An empty list leaves the player without a clip; that is not an error.
    pub fn select_random(&mut self, candidates: &[PathBuf]) -> Result<Option<&Path>> {
        self.release();
        let Some(path) = candidates.choose(&mut self.rng).cloned() else {
            log_debug("No videos available to play.");
            return Ok(None);
        };
        self.open(path).map(Some)
    }

    /// Release the current clip and open `path`.
    pub fn select_specific(&mut self, path: &Path) -> Result<&Path> {
        self.release();
        self.open(path.to_path_buf())
    }

    fn open(&mut self, path: PathBuf) -> Result<&Path> {
        let clip = self
            .source
            .open(&path)
            .with_context(|| format!("cannot play '{}'", path.display()))?;
        log_debug(&format!("Selected video: {}", path.display()));
        tracing::info!(video = %path.display(), "selected video");
        let session = self.session.insert(PlaybackSession { clip, path });
        Ok(session.path.as_path())
    }

    fn release(&mut self) {
        self.session = None;
    }

    /// Apply the stored selection policy.
    ///
    /// A failed random pick is retried on the next frame request since another
    /// candidate may open. A failed specific clip raises the end-of-clip signal so
    /// inactivity transitions can fall back.
    fn reselect(&mut self) {
        let selection = std::mem::take(&mut self.selection);
        let result = match &selection {
            Selection::Random(candidates) => self.select_random(candidates).map(|_| ()),
            Selection::Specific(path) => self.select_specific(path).map(|_| ()),
            Selection::Nothing => {
                self.release();
                Ok(())
            }
        };
        if let Err(err) = result {
            log_debug(&format!("video selection failed: {err:#}"));
            tracing::warn!(error = %format!("{err:#}"), "video selection failed");
            match selection {
                Selection::Random(_) => self.retry_pending = true,
                _ => self.clip_end.raise(),
            }
        }
        self.selection = selection;
    }

    /// Next output frame, resized to the configured resolution.
    ///
    /// Returns `None` when no clip is open or the replacement clip yields nothing.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.session.is_none() {
            if !std::mem::take(&mut self.retry_pending) {
                return None;
            }
            self.reselect();
        }

        let cutoff = self.config.end_cutoff;
        let session = self.session.as_mut()?;
        let near_end = is_near_end(session.clip.position(), session.clip.frame_count(), cutoff);
        let frame = if near_end {
            None
        } else {
            read_or_log(session)
        };

        let frame = match frame {
            Some(frame) => frame,
            None => {
                self.transition_cue = true;
                self.clip_end.raise();
                self.reselect();
                let session = self.session.as_mut()?;
                read_or_log(session)?
            }
        };
        Some(frame.resized(self.config.width, self.config.height))
    }

    /// Whether a clip hand-off happened since the last call.
    pub fn take_transition_cue(&mut self) -> bool {
        std::mem::take(&mut self.transition_cue)
    }
}

fn read_or_log(session: &mut PlaybackSession) -> Option<Frame> {
    match session.clip.read_frame() {
        Ok(frame) => frame,
        Err(err) => {
            log_debug(&format!(
                "decode failed for '{}': {err:#}",
                session.path.display()
            ));
            None
        }
    }
}
