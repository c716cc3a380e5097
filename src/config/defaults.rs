pub const DEFAULT_SCREEN_WIDTH: usize = 350;
pub const DEFAULT_SCREEN_HEIGHT: usize = 350;
pub const DEFAULT_TICK_MS: u64 = 30;

pub const DEFAULT_NOISE_THRESHOLD: f32 = 0.2;
pub const DEFAULT_NOISE_DURATION_SECS: f64 = 0.0;
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.2;
pub const DEFAULT_SILENCE_DURATION_SECS: f64 = 1.0;

pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 5000;

pub const DEFAULT_END_CUTOFF_FRAMES: u64 = 20;
pub const DEFAULT_TRANSITION_FRAMES: u32 = 5;

pub const DEFAULT_GLITCH_SHIFT: i32 = 25;
pub const DEFAULT_GLITCH_BARS_MIN: u32 = 5;
pub const DEFAULT_GLITCH_BARS_MAX: u32 = 10;
pub const DEFAULT_GLITCH_BOOST: u8 = 80;
pub const DEFAULT_WOBBLE_AMPLITUDE: f32 = 2.0;
pub const DEFAULT_WOBBLE_FREQUENCY: f32 = 10.0;
pub const DEFAULT_SCANLINE_OPACITY: u8 = 160;
pub const DEFAULT_SCANLINE_SPACING: usize = 4;
pub const DEFAULT_ABERRATION_SHIFT: i32 = 4;

pub const DEFAULT_INITIAL_STATE: &str = "Idle";

pub(super) const MAX_SCREEN_DIM: usize = 4096;
pub(super) const MAX_TICK_MS: u64 = 1000;
pub(super) const MAX_GLITCH_BARS: u32 = 64;
pub(super) const MAX_TRANSITION_FRAMES: u32 = 600;
