use super::{SampleStream, SeekableStream};
use crate::error::DecodeError;

/// Yields silence while paused instead of pulling upstream, so the device
/// keeps getting data and the position stays put.
pub struct PauseGate<S> {
    inner: S,
    paused: bool,
}

impl<S: SeekableStream> PauseGate<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, paused: false }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: SeekableStream> SampleStream for PauseGate<S> {
    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn stream(&mut self, out: &mut [f32]) -> usize {
        if self.paused {
            let ch = self.channels().max(1) as usize;
            let frames = out.len() / ch;
            out[..frames * ch].fill(0.0);
            return frames;
        }
        self.inner.stream(out)
    }

    fn err(&self) -> Option<&DecodeError> {
        self.inner.err()
    }
}

impl<S: SeekableStream> SeekableStream for PauseGate<S> {
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
