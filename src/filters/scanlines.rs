use crate::video::Frame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanlineConfig {
    /// Subtracted from every channel of a scanline row, clamped at zero.
    pub opacity: u8,
    pub spacing: usize,
}

pub fn scanlines(frame: &Frame, cfg: &ScanlineConfig) -> Frame {
    let mut out = frame.clone();
    for y in (0..out.height()).step_by(cfg.spacing.max(1)) {
        for value in out.row_mut(y) {
            *value = value.saturating_sub(cfg.opacity);
        }
    }
    out
}
