use std::sync::Arc;

use super::{SampleStream, SeekableStream};
use crate::audio::buffer::PcmRing;
use crate::error::DecodeError;

/// Pass-through stage that copies every produced chunk into the ring as
/// little-endian 16-bit PCM. Silent chunks are written too.
pub struct VisualizationTap<S> {
    inner: S,
    ring: Arc<dyn PcmRing>,
    scratch: Vec<u8>,
}

impl<S: SeekableStream> VisualizationTap<S> {
    pub fn new(inner: S, ring: Arc<dyn PcmRing>) -> Self {
        Self {
            inner,
            ring,
            scratch: Vec::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

/// Convert a float sample to 16-bit PCM, clipping out-of-range values
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

impl<S: SeekableStream> SampleStream for VisualizationTap<S> {
    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn stream(&mut self, out: &mut [f32]) -> usize {
        let frames = self.inner.stream(out);
        if frames == 0 {
            return 0;
        }

        let used = &out[..frames * self.channels().max(1) as usize];
        self.scratch.clear();
        self.scratch.reserve(used.len() * 2);
        for &sample in used {
            self.scratch.extend_from_slice(&f32_to_i16(sample).to_le_bytes());
        }
        self.ring.write(&self.scratch);

        frames
    }

    fn err(&self) -> Option<&DecodeError> {
        self.inner.err()
    }
}

impl<S: SeekableStream> SeekableStream for VisualizationTap<S> {
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
