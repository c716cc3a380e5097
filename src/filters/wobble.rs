use super::roll_row;
use crate::video::Frame;

/// Phase speed of the wobble wave, radians per second.
const WOBBLE_SPEED: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WobbleConfig {
    pub amplitude: f32,
    pub frequency: f32,
}

/// Horizontal displacement of `row` at time `seconds`.
pub(crate) fn row_shift(row: usize, cfg: &WobbleConfig, seconds: f64) -> i64 {
    let phase = row as f64 / f64::from(cfg.frequency) + seconds * WOBBLE_SPEED;
    (f64::from(cfg.amplitude) * phase.sin()).round() as i64
}

/// VHS-style wobble: each row is rotated by a small sinusoidal offset.
pub fn wobble(frame: &Frame, cfg: &WobbleConfig, seconds: f64) -> Frame {
    let mut out = frame.clone();
    for y in 0..out.height() {
        let shift = row_shift(y, cfg, seconds);
        if shift != 0 {
            roll_row(out.row_mut(y), shift);
        }
    }
    out
}
