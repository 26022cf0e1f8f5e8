use super::{SampleStream, SeekableStream};
use crate::error::DecodeError;

// Attenuation at level 0 before the hard mute kicks in
const VOLUME_RANGE_DB: f32 = 60.0;
const GAIN_BASE: f32 = 2.0;

/// Map a 0.0-1.0 level to a linear multiplier.
///
/// The level spans -60 dB to 0 dB in `dB/10` steps of base 2. A level of
/// exactly zero is a hard mute.
pub fn level_to_gain(level: f32) -> f32 {
    if level <= 0.0 || level.is_nan() {
        return 0.0;
    }
    let percentage = (level * 100.0).clamp(0.0, 100.0);
    let db = VOLUME_RANGE_DB * (percentage / 100.0 - 1.0);
    GAIN_BASE.powf(db / 10.0)
}

/// Scales every sample by the gain of the current level
pub struct VolumeStage<S> {
    inner: S,
    level: f32,
    gain: f32,
}

impl<S: SeekableStream> VolumeStage<S> {
    pub fn new(inner: S, level: f32) -> Self {
        let level = level.clamp(0.0, 1.0);
        Self {
            inner,
            level,
            gain: level_to_gain(level),
        }
    }

    pub fn set_level(&mut self, level: f32) {
        let level = level.clamp(0.0, 1.0);
        if level != self.level {
            self.level = level;
            self.gain = level_to_gain(level);
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: SeekableStream> SampleStream for VolumeStage<S> {
    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn stream(&mut self, out: &mut [f32]) -> usize {
        let frames = self.inner.stream(out);
        let used = &mut out[..frames * self.channels().max(1) as usize];
        if self.gain == 0.0 {
            used.fill(0.0);
        } else if self.gain != 1.0 {
            for sample in used.iter_mut() {
                *sample *= self.gain;
            }
        }
        frames
    }

    fn err(&self) -> Option<&DecodeError> {
        self.inner.err()
    }
}

impl<S: SeekableStream> SeekableStream for VolumeStage<S> {
    fn position(&self) -> u64 {
        self.inner.position()
    }

    fn len(&self) -> Option<u64> {
        self.inner.len()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn seek(&mut self, frame: u64) -> Result<u64, DecodeError> {
        self.inner.seek(frame)
    }
}
