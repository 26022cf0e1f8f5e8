use crate::audio::graph::{SampleStream, SeekableStream};
use crate::audio::AudioDecoder;
use crate::error::DecodeError;
use crate::models::{AudioBuffer, AudioFormat};

/// Pull adapter over an [`AudioDecoder`].
///
/// Emits interleaved frames already mapped to the output channel count, tracks
/// the position in source frames and records the first decode error. Once an
/// error is recorded the stream reports itself drained.
pub struct DecoderStream {
    decoder: Box<dyn AudioDecoder>,
    native: AudioFormat,
    out_channels: u16,
    pending: Vec<f32>,
    cursor: usize,
    position: u64,
    exhausted: bool,
    err: Option<DecodeError>,
}

impl DecoderStream {
    pub fn new(decoder: Box<dyn AudioDecoder>, out_channels: u16) -> Self {
        let native = decoder.format();
        Self {
            decoder,
            native,
            out_channels: out_channels.max(1),
            pending: Vec::new(),
            cursor: 0,
            position: 0,
            exhausted: false,
            err: None,
        }
    }

    /// Sample rate of the decoded source
    pub fn sample_rate(&self) -> u32 {
        self.native.sample_rate
    }

    pub fn native_format(&self) -> AudioFormat {
        self.native
    }

    fn refill(&mut self) {
        match self.decoder.decode_next() {
            Ok(Some(buffer)) => {
                self.pending = map_channels(&buffer, self.out_channels);
                self.cursor = 0;
            }
            Ok(None) => self.exhausted = true,
            Err(e) => {
                log::warn!("Decoding stopped at frame {}: {}", self.position, e);
                self.err = Some(e);
                self.exhausted = true;
            }
        }
    }
}

/// Map a decoded buffer onto `out_channels`: mono is duplicated, surplus
/// channels are dropped and missing ones are filled with silence.
pub fn map_channels(buffer: &AudioBuffer, out_channels: u16) -> Vec<f32> {
    let ch_in = buffer.channels.max(1) as usize;
    let ch_out = out_channels.max(1) as usize;
    let frames = buffer.samples.len() / ch_in;

    if ch_in == ch_out {
        return buffer.samples[..frames * ch_in].to_vec();
    }

    let mut mapped = Vec::with_capacity(frames * ch_out);
    for frame in buffer.samples.chunks_exact(ch_in) {
        if ch_in == 1 {
            mapped.extend(std::iter::repeat(frame[0]).take(ch_out));
        } else if ch_out <= ch_in {
            mapped.extend_from_slice(&frame[..ch_out]);
        } else {
            mapped.extend_from_slice(frame);
            mapped.extend(std::iter::repeat(0.0).take(ch_out - ch_in));
        }
    }
    mapped
}

impl SampleStream for DecoderStream {
    fn channels(&self) -> u16 {
        self.out_channels
    }

    fn stream(&mut self, out: &mut [f32]) -> usize {
        let ch = self.out_channels as usize;
        let wanted = out.len() / ch;
        let mut written = 0;

        while written < wanted {
            if self.cursor >= self.pending.len() {
                if self.exhausted {
                    break;
                }
                self.refill();
                continue;
            }

            let available = (self.pending.len() - self.cursor) / ch;
            let take = available.min(wanted - written);
            let src = &self.pending[self.cursor..self.cursor + take * ch];
            out[written * ch..(written + take) * ch].copy_from_slice(src);

            self.cursor += take * ch;
            written += take;
            self.position += take as u64;
        }

        written
    }

    fn err(&self) -> Option<&DecodeError> {
        self.err.as_ref()
    }
}

impl SeekableStream for DecoderStream {
    fn position(&self) -> u64 {
        self.position
    }

    fn len(&self) -> Option<u64> {
        self.decoder.total_frames()
    }

    fn sample_rate(&self) -> u32 {
        self.native.sample_rate
    }

    fn seek(&mut self, frame: u64) -> Result<u64, DecodeError> {
        // A stream that failed stays failed.
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        let landed = self.decoder.seek(frame)?;
        self.pending.clear();
        self.cursor = 0;
        self.position = landed;
        self.exhausted = false;
        Ok(landed)
    }
}
