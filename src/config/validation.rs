use super::defaults::{MAX_GLITCH_BARS, MAX_SCREEN_DIM, MAX_TICK_MS, MAX_TRANSITION_FRAMES};
use super::{AppConfig, LoudnessPresets};
use crate::filters::{AberrationConfig, FilterConfig, GlitchConfig, ScanlineConfig, WobbleConfig};
use crate::video::PlayerConfig;
use anyhow::{anyhow, bail, Context, Result};
use std::{fs, path::Path, time::Duration};

const MAX_RULE_DURATION_SECS: f64 = 3600.0;
const MAX_WOBBLE_AMPLITUDE: f32 = 64.0;

impl AppConfig {
    /// Check CLI values and normalize binary paths.
    pub fn validate(&mut self) -> Result<()> {
        if !(1..=MAX_SCREEN_DIM).contains(&self.width) {
            bail!(
                "--width must be between 1 and {MAX_SCREEN_DIM}, got {}",
                self.width
            );
        }
        if !(1..=MAX_SCREEN_DIM).contains(&self.height) {
            bail!(
                "--height must be between 1 and {MAX_SCREEN_DIM}, got {}",
                self.height
            );
        }
        if !(1..=MAX_TICK_MS).contains(&self.tick_ms) {
            bail!(
                "--tick-ms must be between 1 and {MAX_TICK_MS}, got {}",
                self.tick_ms
            );
        }

        check_threshold(self.noise_threshold, "--noise-threshold")?;
        check_threshold(self.silence_threshold, "--silence-threshold")?;
        check_duration(self.noise_duration_secs, "--noise-duration")?;
        check_duration(self.silence_duration_secs, "--silence-duration")?;

        if self.listen_host.trim().is_empty() || self.listen_host.contains(char::is_whitespace) {
            bail!("--listen-host must be a non-empty address without whitespace");
        }

        if !(1..=MAX_TRANSITION_FRAMES).contains(&self.transition_frames) {
            bail!(
                "--transition-frames must be between 1 and {MAX_TRANSITION_FRAMES}, got {}",
                self.transition_frames
            );
        }
        if self.glitch_shift < 0 {
            bail!("--glitch-shift must not be negative, got {}", self.glitch_shift);
        }
        if self.glitch_bars_min > self.glitch_bars_max || self.glitch_bars_max > MAX_GLITCH_BARS {
            bail!(
                "--glitch-bars-min ({}) must be <= --glitch-bars-max ({}) <= {MAX_GLITCH_BARS}",
                self.glitch_bars_min,
                self.glitch_bars_max
            );
        }
        if !self.wobble_amplitude.is_finite()
            || !(0.0..=MAX_WOBBLE_AMPLITUDE).contains(&self.wobble_amplitude)
        {
            bail!(
                "--wobble-amplitude must be between 0 and {MAX_WOBBLE_AMPLITUDE}, got {}",
                self.wobble_amplitude
            );
        }
        if !self.wobble_frequency.is_finite() || self.wobble_frequency <= 0.0 {
            bail!(
                "--wobble-frequency must be a positive number, got {}",
                self.wobble_frequency
            );
        }
        if self.scanline_spacing == 0 {
            bail!("--scanline-spacing must be at least 1");
        }

        if self.initial_state.trim().is_empty() {
            bail!("--initial-state must not be empty");
        }
        if self.fallback_state.trim().is_empty() {
            bail!("--fallback-state must not be empty");
        }
        if let Some(path) = &self.states_file {
            if !path.is_file() {
                bail!("state table '{}' does not exist", path.display());
            }
        }

        self.ffmpeg_cmd = sanitize_binary(&self.ffmpeg_cmd, "--ffmpeg-cmd", &["ffmpeg"])?;
        self.ffprobe_cmd = sanitize_binary(&self.ffprobe_cmd, "--ffprobe-cmd", &["ffprobe"])?;

        Ok(())
    }

    /// Snapshot the filter toggles and constants for the filter pipeline.
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            transition_frames: self.transition_frames,
            glitch: (!self.no_glitch).then_some(GlitchConfig {
                max_shift: self.glitch_shift,
                bars_min: self.glitch_bars_min,
                bars_max: self.glitch_bars_max,
                boost: self.glitch_boost,
            }),
            wobble: (!self.no_wobble).then_some(WobbleConfig {
                amplitude: self.wobble_amplitude,
                frequency: self.wobble_frequency,
            }),
            aberration: (!self.no_aberration).then_some(AberrationConfig {
                shift: self.aberration_shift,
            }),
            scanlines: (!self.no_scanlines).then_some(ScanlineConfig {
                opacity: self.scanline_opacity,
                spacing: self.scanline_spacing,
            }),
        }
    }

    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            width: self.width,
            height: self.height,
            end_cutoff: self.end_cutoff,
        }
    }

    pub fn loudness_presets(&self) -> LoudnessPresets {
        LoudnessPresets {
            noise_threshold: self.noise_threshold,
            noise_duration_secs: self.noise_duration_secs,
            silence_threshold: self.silence_threshold,
            silence_duration_secs: self.silence_duration_secs,
        }
    }

    pub fn listener_addr(&self) -> String {
        format!("{}:{}", self.listen_host.trim(), self.listen_port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

fn check_threshold(value: f32, flag: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{flag} must be a non-negative number, got {value}");
    }
    Ok(())
}

fn check_duration(value: f64, flag: &str) -> Result<()> {
    if !value.is_finite() || !(0.0..=MAX_RULE_DURATION_SECS).contains(&value) {
        bail!("{flag} must be between 0 and {MAX_RULE_DURATION_SECS} seconds, got {value}");
    }
    Ok(())
}

/// Allow either a known binary name or an absolute path.
pub(super) fn sanitize_binary(value: &str, flag: &str, allowlist: &[&str]) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{flag} cannot be empty");
    }
    if let Some(allowed) = allowlist
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
    {
        return Ok((*allowed).to_string());
    }

    let path = Path::new(trimmed);
    if path.is_absolute() || trimmed.contains(std::path::MAIN_SEPARATOR) {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("failed to canonicalize {flag} '{trimmed}'"))?;
        let metadata = fs::metadata(&canonical)
            .with_context(|| format!("failed to inspect {flag} '{}'", canonical.display()))?;
        if !metadata.is_file() {
            bail!("{flag} '{}' is not a file", canonical.display());
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            if mode & 0o111 == 0 {
                bail!(
                    "{flag} '{}' exists but is not executable (mode {:o})",
                    canonical.display(),
                    mode
                );
            }
        }
        return canonical
            .to_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("{flag} must be valid UTF-8"));
    }

    bail!("{flag} must be one of {allowlist:?} or an existing binary path");
}
