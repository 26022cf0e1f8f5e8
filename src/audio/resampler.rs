/*!
A simple, streaming, linear resampler for interleaved f32 audio, plus the
graph stage that drives it.

- Converts from an input (source) sample rate to an output (destination) sample rate.
- Operates on interleaved frames (LRLR...) for an arbitrary number of channels.
- Maintains streaming continuity across successive process() calls (no clicks at chunk boundaries).

Typical usage:

```ignore
use crate::audio::resampler::LinearResampler;

let mut rs = LinearResampler::new(44_100, 48_000, 2);
let output = rs.process(&input_interleaved_f32);
// 'output' is now at 48kHz with the same channel count.
```

Inside the playback graph, [`Resample`] pulls source-rate frames from its inner
stage on demand and hands out device-rate frames. Equal rates bypass it.
*/

use crate::audio::graph::{SampleStream, SeekableStream};
use crate::error::DecodeError;

// Bounds on one upstream pull, in frames
const MIN_PULL_FRAMES: usize = 16;
const MAX_PULL_FRAMES: usize = 4096;

#[derive(Debug, Clone)]
pub struct LinearResampler {
    src_rate: u32,
    dst_rate: u32,
    channels: usize,

    // Derived
    step: f64, // how many source frames per 1 output frame (src/dst)

    // Streaming state
    pos: f64,              // current source position (in frames) relative to the start of 'prev' frame
    prev_frame: Vec<f32>,  // last source frame from the previous call, length == channels
}

impl LinearResampler {
    /// Create a new resampler.
    /// - src_rate: source/decoded sample rate (Hz)
    /// - dst_rate: destination/output sample rate (Hz)
    /// - channels: number of interleaved channels (e.g., 1 mono, 2 stereo)
    pub fn new(src_rate: u32, dst_rate: u32, channels: usize) -> Self {
        let step = if dst_rate == 0 { 0.0 } else { src_rate as f64 / dst_rate as f64 };
        Self {
            src_rate,
            dst_rate,
            channels,
            step,
            pos: 0.0,
            prev_frame: Vec::new(),
        }
    }

    /// Reset the streaming state (phase and history).
    pub fn reset(&mut self) {
        self.pos = 0.0;
        self.prev_frame.clear();
    }

    /// Source frames consumed per output frame
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Resample interleaved f32 samples from src_rate to dst_rate, preserving state across calls.
    ///
    /// `input` holds interleaved frames; the result is interleaved at `dst_rate`
    /// with the same channel count.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if self.channels == 0 || self.dst_rate == 0 || self.src_rate == 0 {
            return Vec::new();
        }

        let ch = self.channels;
        let in_frames = input.len() / ch;

        // [prev_frame, input_frames...] so interpolation spans chunk boundaries
        let mut work = Vec::with_capacity((in_frames + 1) * ch);
        if self.prev_frame.len() == ch {
            work.extend_from_slice(&self.prev_frame);
        } else if in_frames > 0 {
            work.extend(std::iter::repeat(0.0).take(ch));
        } else {
            return Vec::new();
        }
        work.extend_from_slice(&input[..in_frames * ch]);

        let total_frames = work.len() / ch;

        let expected_out_frames =
            ((in_frames as f64) * (self.dst_rate as f64 / self.src_rate as f64)).ceil() as usize + 4;
        let mut out = Vec::with_capacity(expected_out_frames * ch);

        // Need frames i and i+1 for every output frame
        let last = (total_frames - 1) as f64;
        while self.pos < last {
            let i = self.pos.floor() as usize;
            let frac = (self.pos - i as f64) as f32;

            let base0 = i * ch;
            let base1 = (i + 1) * ch;

            out.extend((0..ch).map(|c| {
                let s0 = work[base0 + c];
                let s1 = work[base1 + c];
                s0 + (s1 - s0) * frac
            }));

            self.pos += self.step;
        }

        // The last frame becomes index 0 of the next call; the phase carries over
        let last_base = (total_frames - 1) * ch;
        self.prev_frame.clear();
        self.prev_frame.extend_from_slice(&work[last_base..last_base + ch]);
        self.pos -= last;

        out
    }
}

/// Graph stage converting its inner stream to the output rate
pub struct Resample<S> {
    inner: S,
    resampler: LinearResampler,
    bypass: bool,
    scratch: Vec<f32>,
    backlog: Vec<f32>,
    backlog_pos: usize,
    drained: bool,
}

impl<S: SeekableStream> Resample<S> {
    pub fn new(inner: S, src_rate: u32, dst_rate: u32) -> Self {
        let channels = inner.channels().max(1) as usize;
        let bypass = src_rate == dst_rate;
        if !bypass {
            log::debug!("Resampling {} Hz -> {} Hz", src_rate, dst_rate);
        }
        Self {
            inner,
            resampler: LinearResampler::new(src_rate, dst_rate, channels),
            bypass,
            scratch: Vec::new(),
            backlog: Vec::new(),
            backlog_pos: 0,
            drained: false,
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    fn pull_upstream(&mut self, out_frames_needed: usize) {
        let ch = self.channels().max(1) as usize;
        let in_frames = ((out_frames_needed as f64 * self.resampler.step()).ceil() as usize + 1)
            .clamp(MIN_PULL_FRAMES, MAX_PULL_FRAMES);

        self.scratch.resize(in_frames * ch, 0.0);
        let got = self.inner.stream(&mut self.scratch);
        if got < in_frames {
            self.drained = true;
        }

        self.backlog = self.resampler.process(&self.scratch[..got * ch]);
        self.backlog_pos = 0;
    }
}

impl<S: SeekableStream> SampleStream for Resample<S> {
    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn stream(&mut self, out: &mut [f32]) -> usize {
        if self.bypass {
            return self.inner.stream(out);
        }

        let ch = self.channels().max(1) as usize;
        let wanted = out.len() / ch;
        let mut written = 0;

        while written < wanted {
            if self.backlog_pos < self.backlog.len() {
                let available = (self.backlog.len() - self.backlog_pos) / ch;
                let take = available.min(wanted - written);
                out[written * ch..(written + take) * ch]
                    .copy_from_slice(&self.backlog[self.backlog_pos..self.backlog_pos + take * ch]);
                self.backlog_pos += take * ch;
                written += take;
                continue;
            }
            if self.drained {
                break;
            }
            self.pull_upstream(wanted - written);
        }

        written
    }

    fn err(&self) -> Option<&DecodeError> {
        self.inner.err()
    }
}

impl<S: SeekableStream> SeekableStream for Resample<S> {
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
        let landed = self.inner.seek(frame)?;
        self.resampler.reset();
        self.backlog.clear();
        self.backlog_pos = 0;
        self.drained = false;
        Ok(landed)
    }
}
