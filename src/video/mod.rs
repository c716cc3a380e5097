//! Video clip decoding and playback.

mod ffmpeg;
mod frame;
mod player;
mod source;
#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use ffmpeg::{parse_probe_output, FfmpegSource, ProbeInfo};
pub use frame::{Frame, CHANNELS};
pub use player::{PlayerConfig, Selection, VideoPlayer};
pub use source::{is_near_end, Clip, ClipSource};
