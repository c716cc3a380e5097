//! Microphone loudness sampling.
//!
//! A CPAL input stream runs on the audio subsystem's own thread and publishes the
//! instantaneous loudness (L2 norm of each callback block) into a lock-free
//! [`LoudnessMeter`] that the frame loop reads once per tick.

mod dispatch;
mod meter;
mod monitor;

pub use meter::{block_loudness, LoudnessMeter};
pub use monitor::LoudnessMonitor;
