use serde::{Deserialize, Serialize};

use super::{SampleStream, SeekableStream};
use crate::error::DecodeError;

/// How many extra passes to play after the first.
///
/// `Times(0)` plays the stream once and then finishes; `Times(n)` plays it
/// `n + 1` times. Only `Forever` repeats without end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopCount {
    Times(u32),
    Forever,
}

impl LoopCount {
    /// Whether another pass may start after `completed` passes
    pub fn allows_pass(&self, completed: u32) -> bool {
        match self {
            LoopCount::Times(extra) => completed <= *extra,
            LoopCount::Forever => true,
        }
    }
}

impl Default for LoopCount {
    fn default() -> Self {
        LoopCount::Times(0)
    }
}

/// Rewinds its inner stream to frame 0 whenever it drains, until the loop count is used up
pub struct Looper<S> {
    inner: S,
    count: LoopCount,
    passes: u32,
}

impl<S: SeekableStream> Looper<S> {
    pub fn new(inner: S, count: LoopCount) -> Self {
        Self {
            inner,
            count,
            passes: 0,
        }
    }

    /// Completed passes so far
    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: SeekableStream> SampleStream for Looper<S> {
    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn stream(&mut self, out: &mut [f32]) -> usize {
        let ch = self.channels().max(1) as usize;
        let wanted = out.len() / ch;
        let mut written = 0;

        while written < wanted {
            let n = self.inner.stream(&mut out[written * ch..wanted * ch]);
            written += n;
            if written == wanted {
                break;
            }

            // Inner drained
            if self.inner.err().is_some() {
                break;
            }
            self.passes += 1;
            if !self.count.allows_pass(self.passes) {
                break;
            }
            // An empty pass would spin forever
            if n == 0 && self.inner.position() == 0 {
                break;
            }
            if let Err(e) = self.inner.seek(0) {
                log::warn!("Loop rewind failed after pass {}: {}", self.passes, e);
                break;
            }
            log::debug!("Starting loop pass {}", self.passes + 1);
        }

        written
    }

    fn err(&self) -> Option<&DecodeError> {
        self.inner.err()
    }
}

impl<S: SeekableStream> SeekableStream for Looper<S> {
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
