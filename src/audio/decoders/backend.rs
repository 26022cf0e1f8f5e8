use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{CodecType, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

use crate::audio::{AudioDecoder, AudioSource};
use crate::error::DecodeError;
use crate::models::{AudioBuffer, AudioCodec, AudioFormat};

// A corrupt packet is skipped; more than this many in a row ends the stream.
const MAX_DECODE_RETRIES: usize = 3;

/// Demuxer + codec pair shared by the WAV, MP3 and FLAC decoders
pub struct SymphoniaDecoder {
    codec: AudioCodec,
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: AudioFormat,
    total_frames: Option<u64>,
    time_base: Option<TimeBase>,
    sample_buf: Option<SampleBuffer<f32>>,
    /// Frames to drop after a seek that landed before the requested frame
    skip_frames: u64,
}

impl SymphoniaDecoder {
    /// Probe `source` as `codec` and open its first audio track.
    ///
    /// `accepts` validates the track's codec so that, say, a RIFF container
    /// that sniffed as WAV but carries an unexpected payload is rejected with
    /// the attempted codec attached.
    pub fn open(
        source: &AudioSource,
        codec: AudioCodec,
        accepts: fn(CodecType) -> bool,
    ) -> Result<Self, DecodeError> {
        let invalid = |reason: String| DecodeError::InvalidStream { codec, reason };

        let media_source = MediaSourceStream::new(Box::new(source.cursor()), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(codec.extension());

        let probed = symphonia::default::get_probe()
            .format(&hint, media_source, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| invalid(format!("probe failed: {}", e)))?;

        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| invalid("no audio track found".to_string()))?;

        if !accepts(track.codec_params.codec) {
            return Err(invalid(format!(
                "unsupported codec subtype {:?}",
                track.codec_params.codec
            )));
        }

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| invalid("missing sample rate".to_string()))?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| invalid("missing channel layout".to_string()))?;
        if sample_rate == 0 || channels == 0 {
            return Err(invalid("empty audio format".to_string()));
        }

        let total_frames = track.codec_params.n_frames.filter(|&n| n > 0);
        let time_base = track.codec_params.time_base;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| invalid(format!("failed to create decoder: {}", e)))?;

        log::debug!(
            "Opened {} stream: {} Hz, {} channel(s), {:?} frames",
            codec,
            sample_rate,
            channels,
            total_frames
        );

        Ok(Self {
            codec,
            format_reader,
            decoder,
            track_id,
            format: AudioFormat::new(sample_rate, channels),
            total_frames,
            time_base,
            sample_buf: None,
            skip_frames: 0,
        })
    }

    // Integer math keeps frame-exact targets exact for 1/rate time bases.
    fn frames_to_ts(&self, frame: u64) -> u64 {
        match self.time_base {
            Some(tb) if tb.numer > 0 => {
                let scale = tb.numer as u128 * self.format.sample_rate as u128;
                (frame as u128 * tb.denom as u128 / scale) as u64
            }
            _ => frame,
        }
    }

    fn ts_to_frames(&self, ts: u64) -> u64 {
        match self.time_base {
            Some(tb) if tb.denom > 0 => {
                let scale = tb.numer as u128 * self.format.sample_rate as u128;
                (ts as u128 * scale / tb.denom as u128) as u64
            }
            _ => ts,
        }
    }

    fn decode_failed(&self, reason: String) -> DecodeError {
        DecodeError::DecodeFailed {
            codec: self.codec,
            reason,
        }
    }
}

/// Copy a decoded packet into an interleaved buffer, dropping pending skip frames
fn take_decoded(
    sample_buf: &mut Option<SampleBuffer<f32>>,
    skip_frames: &mut u64,
    decoded: AudioBufferRef<'_>,
) -> AudioBuffer {
    let spec = *decoded.spec();
    let channels = spec.channels.count().max(1);
    let capacity = decoded.capacity() as u64;
    let decoded_frames = decoded.frames();

    let needs_alloc = match sample_buf {
        Some(buf) => (buf.capacity() as u64) < capacity * channels as u64,
        None => true,
    };
    if needs_alloc {
        *sample_buf = Some(SampleBuffer::<f32>::new(capacity, spec));
    }

    let mut samples = Vec::new();
    if let Some(buf) = sample_buf.as_mut() {
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    let mut frames = decoded_frames.min(samples.len() / channels);
    if *skip_frames > 0 {
        let skip = (*skip_frames).min(frames as u64) as usize;
        samples.drain(..skip * channels);
        frames -= skip;
        *skip_frames -= skip as u64;
    }
    samples.truncate(frames * channels);

    AudioBuffer {
        samples,
        channels: channels as u16,
        sample_rate: spec.rate,
        frames,
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn codec(&self) -> AudioCodec {
        self.codec
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }

    fn decode_next(&mut self) -> Result<Option<AudioBuffer>, DecodeError> {
        let mut decode_errors = 0;
        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref err))
                    if err.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(err) => return Err(self.decode_failed(format!("failed to read packet: {}", err))),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let buffer = take_decoded(&mut self.sample_buf, &mut self.skip_frames, decoded);
                    if buffer.is_empty() {
                        continue;
                    }
                    return Ok(Some(buffer));
                }
                Err(SymphoniaError::DecodeError(msg)) => {
                    decode_errors += 1;
                    log::warn!("{} packet skipped: {}", self.codec, msg);
                    if decode_errors > MAX_DECODE_RETRIES {
                        return Err(DecodeError::DecodeFailed {
                            codec: self.codec,
                            reason: format!("too many corrupt packets: {}", msg),
                        });
                    }
                }
                Err(err) => {
                    return Err(DecodeError::DecodeFailed {
                        codec: self.codec,
                        reason: format!("failed to decode packet: {}", err),
                    })
                }
            }
        }
    }

    fn seek(&mut self, frame: u64) -> Result<u64, DecodeError> {
        let target = match self.total_frames {
            Some(total) => frame.min(total.saturating_sub(1)),
            None => frame,
        };

        let seeked = self
            .format_reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: self.frames_to_ts(target),
                    track_id: self.track_id,
                },
            )
            .map_err(|e| DecodeError::SeekFailed {
                codec: self.codec,
                reason: e.to_string(),
            })?;

        self.decoder.reset();

        let actual = self.ts_to_frames(seeked.actual_ts);
        let required = self.ts_to_frames(seeked.required_ts);
        self.skip_frames = required.saturating_sub(actual);

        Ok(actual + self.skip_frames)
    }
}
