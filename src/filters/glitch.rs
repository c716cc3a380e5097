use super::roll_row;
use crate::video::{Frame, CHANNELS};
use rand::Rng;

/// Tallest band a single glitch bar may cover.
const MAX_BAR_HEIGHT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlitchConfig {
    /// Largest horizontal displacement of a band, either direction.
    pub max_shift: i32,
    pub bars_min: u32,
    pub bars_max: u32,
    /// Added to the blue channel inside each band.
    pub boost: u8,
}

/// Countdown state of the multi-frame transition glitch.
#[derive(Debug)]
pub struct TransitionGlitch {
    total_frames: u32,
    frames_remaining: u32,
    active: bool,
    last_clean: Option<Frame>,
}

impl TransitionGlitch {
    pub fn new(total_frames: u32) -> Self {
        Self {
            total_frames,
            frames_remaining: 0,
            active: false,
            last_clean: None,
        }
    }

    /// Restarting while active resets the countdown instead of stacking.
    pub fn start(&mut self) {
        self.active = self.total_frames > 0;
        self.frames_remaining = self.total_frames;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn frames_remaining(&self) -> u32 {
        self.frames_remaining
    }

    pub fn last_clean_frame(&self) -> Option<&Frame> {
        self.last_clean.as_ref()
    }

    /// Corrupt a few random horizontal bands and count one frame down.
    pub fn apply<R: Rng>(&mut self, frame: &Frame, cfg: &GlitchConfig, rng: &mut R) -> Frame {
        self.last_clean = Some(frame.clone());
        let out = corrupt_bands(frame, cfg, rng);
        self.frames_remaining = self.frames_remaining.saturating_sub(1);
        if self.frames_remaining == 0 {
            self.active = false;
        }
        out
    }
}

fn corrupt_bands<R: Rng>(frame: &Frame, cfg: &GlitchConfig, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return out;
    }

    let bars = rng.gen_range(cfg.bars_min..=cfg.bars_max.max(cfg.bars_min));
    let max_shift = cfg.max_shift.max(0);
    for _ in 0..bars {
        let top = rng.gen_range(0..=height.saturating_sub(2));
        let band = rng.gen_range(1..=MAX_BAR_HEIGHT.min(height - top));
        let shift = rng.gen_range(-max_shift..=max_shift);
        // Red saturates from the shift onwards, green from the opposite side.
        let red_from = (shift.max(0) as usize).min(width);
        let green_from = ((-shift).max(0) as usize).min(width);

        for y in top..top + band {
            let row = out.row_mut(y);
            roll_row(row, i64::from(shift));
            for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                if x >= red_from {
                    px[0] = 255;
                }
                if x >= green_from {
                    px[1] = 255;
                }
                px[2] = px[2].saturating_add(cfg.boost);
            }
        }
    }
    out
}
