//! System microphone sampling via CPAL.
//!
//! Handles device enumeration and sample format conversion. Every callback block
//! is downmixed to mono f32 and reduced to a single loudness value.

use super::dispatch::LoudnessPump;
use super::meter::LoudnessMeter;
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::{Arc, Mutex};

/// Running input stream. Sampling stops when this is dropped.
pub struct LoudnessMonitor {
    _stream: cpal::Stream,
    device_name: String,
}

impl LoudnessMonitor {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Open the preferred (or default) input device and start publishing loudness
    /// into `meter` from the audio thread.
    pub fn start(preferred_device: Option<&str>, meter: LoudnessMeter) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());

        let default_config = device
            .default_input_config()
            .with_context(|| format!("no usable input config for '{device_name}'"))?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let channels = usize::from(device_config.channels.max(1));

        log_debug(&format!(
            "Loudness monitor config: device={device_name} format={format:?} sample_rate={}Hz channels={channels}",
            device_config.sample_rate.0
        ));

        let pump = Arc::new(Mutex::new(LoudnessPump::new(channels, meter)));
        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));

        // Never block the audio thread: a contended pump just skips this block.
        let stream = match format {
            SampleFormat::F32 => {
                let pump = pump.clone();
                device.build_input_stream(
                    &device_config,
                    move |data: &[f32], _| {
                        if let Ok(mut pump) = pump.try_lock() {
                            pump.push(data, |sample| sample);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::I16 => {
                let pump = pump.clone();
                device.build_input_stream(
                    &device_config,
                    move |data: &[i16], _| {
                        if let Ok(mut pump) = pump.try_lock() {
                            pump.push(data, |sample| sample as f32 / 32_768.0);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::U16 => {
                let pump = pump.clone();
                device.build_input_stream(
                    &device_config,
                    move |data: &[u16], _| {
                        if let Ok(mut pump) = pump.try_lock() {
                            pump.push(data, |sample| (sample as f32 - 32_768.0) / 32_768.0);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream
            .play()
            .with_context(|| format!("failed to start input stream on '{device_name}'"))?;
        tracing::info!(device = %device_name, "loudness monitor started");

        Ok(Self {
            _stream: stream,
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}
