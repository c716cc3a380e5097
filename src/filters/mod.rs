//! Per-frame visual filter chain.
//!
//! Stages run in a fixed order: transition glitch (only while its countdown is
//! active), wobble, chromatic aberration, scanlines. Every stage reads its input
//! and returns a new frame of the same size.

mod aberration;
mod glitch;
mod scanlines;
mod wobble;

pub use aberration::{chromatic_aberration, AberrationConfig};
pub use glitch::{GlitchConfig, TransitionGlitch};
pub use scanlines::{scanlines, ScanlineConfig};
pub use wobble::{wobble, WobbleConfig};

use crate::video::Frame;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Static filter configuration; `None` disables a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub transition_frames: u32,
    pub glitch: Option<GlitchConfig>,
    pub wobble: Option<WobbleConfig>,
    pub aberration: Option<AberrationConfig>,
    pub scanlines: Option<ScanlineConfig>,
}

pub struct FilterPipeline {
    config: FilterConfig,
    glitch: TransitionGlitch,
    rng: StdRng,
}

impl FilterPipeline {
    pub fn new(config: FilterConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: FilterConfig, rng: StdRng) -> Self {
        let glitch = TransitionGlitch::new(config.transition_frames);
        Self {
            config,
            glitch,
            rng,
        }
    }

    /// (Re)start the transition glitch countdown. No-op while glitch is disabled.
    pub fn start_transition(&mut self) {
        if self.config.glitch.is_some() {
            self.glitch.start();
        }
    }

    pub fn transition_active(&self) -> bool {
        self.glitch.is_active()
    }

    pub fn transition_frames_remaining(&self) -> u32 {
        self.glitch.frames_remaining()
    }

    /// The frame the most recent glitch pass started from.
    pub fn last_clean_frame(&self) -> Option<&Frame> {
        self.glitch.last_clean_frame()
    }

    /// Run the chain with the wall clock driving the wobble phase.
    pub fn apply(&mut self, frame: &Frame) -> Frame {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        self.apply_at(frame, seconds)
    }

    /// Run the chain at an explicit time (seconds) for the wobble phase.
    pub fn apply_at(&mut self, frame: &Frame, seconds: f64) -> Frame {
        let mut out = match &self.config.glitch {
            Some(cfg) if self.glitch.is_active() => self.glitch.apply(frame, cfg, &mut self.rng),
            _ => frame.clone(),
        };
        if let Some(cfg) = &self.config.wobble {
            out = wobble(&out, cfg, seconds);
        }
        if let Some(cfg) = &self.config.aberration {
            out = chromatic_aberration(&out, cfg);
        }
        if let Some(cfg) = &self.config.scanlines {
            out = scanlines(&out, cfg);
        }
        out
    }
}

/// Rotate a packed RGB row right by `shift` pixels (negative rotates left).
pub(crate) fn roll_row(row: &mut [u8], shift: i64) {
    let width = row.len() / crate::video::CHANNELS;
    if width == 0 {
        return;
    }
    let by = shift.rem_euclid(width as i64) as usize;
    if by != 0 {
        row.rotate_right(by * crate::video::CHANNELS);
    }
}
