use super::meter::{block_loudness, LoudnessMeter};

/// Downmix multi-channel input to mono while applying the provided converter so
/// the loudness norm does not depend on the microphone layout.
pub(super) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    // Average each interleaved frame to produce a mono representation.
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Per-stream callback state: converts one callback block and publishes its norm.
pub(super) struct LoudnessPump {
    channels: usize,
    scratch: Vec<f32>,
    meter: LoudnessMeter,
}

impl LoudnessPump {
    pub(super) fn new(channels: usize, meter: LoudnessMeter) -> Self {
        Self {
            channels: channels.max(1),
            scratch: Vec::new(),
            meter,
        }
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.scratch.clear();
        append_downmixed_samples(&mut self.scratch, data, self.channels, convert);
        self.meter.set(block_loudness(&self.scratch));
    }
}
