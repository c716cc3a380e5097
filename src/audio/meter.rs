use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Latest sampled loudness, shared between the audio callback and the frame loop.
///
/// Stored as raw `f32` bits so the writer never blocks the audio thread.
#[derive(Clone, Debug)]
pub struct LoudnessMeter {
    level_bits: Arc<AtomicU32>,
}

impl LoudnessMeter {
    pub fn new() -> Self {
        Self {
            level_bits: Arc::new(AtomicU32::new(0.0f32.to_bits())),
        }
    }

    pub fn set(&self, level: f32) {
        self.level_bits.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }
}

impl Default for LoudnessMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Euclidean norm of a block of mono samples.
///
/// The value grows with block length; thresholds are tuned against the block
/// sizes the audio backend delivers rather than normalised per sample.
pub fn block_loudness(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s * s).sum::<f32>().sqrt()
}
