//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::Parser;
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_ABERRATION_SHIFT, DEFAULT_END_CUTOFF_FRAMES, DEFAULT_GLITCH_BARS_MAX,
    DEFAULT_GLITCH_BARS_MIN, DEFAULT_GLITCH_BOOST, DEFAULT_GLITCH_SHIFT, DEFAULT_INITIAL_STATE,
    DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT, DEFAULT_NOISE_DURATION_SECS,
    DEFAULT_NOISE_THRESHOLD, DEFAULT_SCANLINE_OPACITY, DEFAULT_SCANLINE_SPACING,
    DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH, DEFAULT_SILENCE_DURATION_SECS,
    DEFAULT_SILENCE_THRESHOLD, DEFAULT_TICK_MS, DEFAULT_TRANSITION_FRAMES,
    DEFAULT_WOBBLE_AMPLITUDE, DEFAULT_WOBBLE_FREQUENCY,
};

/// CLI options for the LoopAvatar player. Validated values keep the frame loop and
/// the ffmpeg subprocesses safe.
#[derive(Debug, Parser, Clone)]
#[command(about = "LoopAvatar reactive video avatar", author, version)]
pub struct AppConfig {
    /// Directory holding one sub-folder of clips per state
    #[arg(long = "assets", default_value = ".")]
    pub assets_dir: PathBuf,

    /// YAML state table (defaults to the built-in Idle/Talking/Emotes table)
    #[arg(long = "states")]
    pub states_file: Option<PathBuf>,

    /// State the avatar starts in
    #[arg(long = "initial-state", default_value = DEFAULT_INITIAL_STATE)]
    pub initial_state: String,

    /// State used when a transition names an unknown target
    #[arg(long = "fallback-state", default_value = DEFAULT_INITIAL_STATE)]
    pub fallback_state: String,

    /// Output width in pixels
    #[arg(long, default_value_t = DEFAULT_SCREEN_WIDTH)]
    pub width: usize,

    /// Output height in pixels
    #[arg(long, default_value_t = DEFAULT_SCREEN_HEIGHT)]
    pub height: usize,

    /// Frame loop polling interval (milliseconds)
    #[arg(long = "tick-ms", default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Loudness that switches Idle to Talking
    #[arg(long = "noise-threshold", default_value_t = DEFAULT_NOISE_THRESHOLD)]
    pub noise_threshold: f32,

    /// Seconds the noise threshold must hold before switching
    #[arg(long = "noise-duration", default_value_t = DEFAULT_NOISE_DURATION_SECS)]
    pub noise_duration_secs: f64,

    /// Loudness at or below which Talking counts as silent
    #[arg(long = "silence-threshold", default_value_t = DEFAULT_SILENCE_THRESHOLD)]
    pub silence_threshold: f32,

    /// Seconds of silence before returning to Idle
    #[arg(long = "silence-duration", default_value_t = DEFAULT_SILENCE_DURATION_SECS)]
    pub silence_duration_secs: f64,

    /// Address the command listener binds to
    #[arg(long = "listen-host", default_value = DEFAULT_LISTEN_HOST)]
    pub listen_host: String,

    /// Port the command listener binds to
    #[arg(long = "listen-port", default_value_t = DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,

    /// Frames before the real end at which a clip counts as finished
    #[arg(long = "end-cutoff", default_value_t = DEFAULT_END_CUTOFF_FRAMES)]
    pub end_cutoff: u64,

    /// Number of frames the transition glitch runs for
    #[arg(long = "transition-frames", default_value_t = DEFAULT_TRANSITION_FRAMES)]
    pub transition_frames: u32,

    /// Disable the transition glitch
    #[arg(long = "no-glitch", default_value_t = false)]
    pub no_glitch: bool,

    /// Max horizontal shift of a glitch band (pixels)
    #[arg(long = "glitch-shift", default_value_t = DEFAULT_GLITCH_SHIFT)]
    pub glitch_shift: i32,

    /// Minimum glitch bands per frame
    #[arg(long = "glitch-bars-min", default_value_t = DEFAULT_GLITCH_BARS_MIN)]
    pub glitch_bars_min: u32,

    /// Maximum glitch bands per frame
    #[arg(long = "glitch-bars-max", default_value_t = DEFAULT_GLITCH_BARS_MAX)]
    pub glitch_bars_max: u32,

    /// Blue channel boost inside glitch bands
    #[arg(long = "glitch-boost", default_value_t = DEFAULT_GLITCH_BOOST)]
    pub glitch_boost: u8,

    /// Disable the VHS wobble
    #[arg(long = "no-wobble", default_value_t = false)]
    pub no_wobble: bool,

    /// Wobble amplitude (pixels)
    #[arg(long = "wobble-amplitude", default_value_t = DEFAULT_WOBBLE_AMPLITUDE)]
    pub wobble_amplitude: f32,

    /// Wobble row divisor; larger values stretch the wave vertically
    #[arg(long = "wobble-frequency", default_value_t = DEFAULT_WOBBLE_FREQUENCY)]
    pub wobble_frequency: f32,

    /// Disable the chromatic aberration
    #[arg(long = "no-aberration", default_value_t = false)]
    pub no_aberration: bool,

    /// Channel offset used by the chromatic aberration (pixels)
    #[arg(long = "aberration-shift", default_value_t = DEFAULT_ABERRATION_SHIFT)]
    pub aberration_shift: i32,

    /// Disable the scanlines
    #[arg(long = "no-scanlines", default_value_t = false)]
    pub no_scanlines: bool,

    /// Amount subtracted from every scanline pixel
    #[arg(long = "scanline-opacity", default_value_t = DEFAULT_SCANLINE_OPACITY)]
    pub scanline_opacity: u8,

    /// Rows between scanlines
    #[arg(long = "scanline-spacing", default_value_t = DEFAULT_SCANLINE_SPACING)]
    pub scanline_spacing: usize,

    /// FFmpeg binary location
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg_cmd: String,

    /// FFprobe binary location
    #[arg(long, default_value = "ffprobe")]
    pub ffprobe_cmd: String,

    /// Run without a window (frames are decoded and filtered but not shown)
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "LOOPAVATAR_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "LOOPAVATAR_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,
}

/// Loudness presets the built-in state table wires into its MIC transitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessPresets {
    pub noise_threshold: f32,
    pub noise_duration_secs: f64,
    pub silence_threshold: f32,
    pub silence_duration_secs: f64,
}

impl Default for LoudnessPresets {
    fn default() -> Self {
        Self {
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
            noise_duration_secs: DEFAULT_NOISE_DURATION_SECS,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            silence_duration_secs: DEFAULT_SILENCE_DURATION_SECS,
        }
    }
}
