use symphonia::core::codecs::{CodecType, CODEC_TYPE_FLAC};

use super::backend::SymphoniaDecoder;
use crate::audio::{AudioDecoder, AudioSource};
use crate::error::DecodeError;
use crate::models::{AudioBuffer, AudioCodec, AudioFormat};

/// FLAC audio decoder implementation using symphonia
pub struct FlacDecoder {
    inner: SymphoniaDecoder,
}

fn accepts(codec: CodecType) -> bool {
    codec == CODEC_TYPE_FLAC
}

impl FlacDecoder {
    pub fn new(source: &AudioSource) -> Result<Self, DecodeError> {
        Ok(Self {
            inner: SymphoniaDecoder::open(source, AudioCodec::Flac, accepts)?,
        })
    }
}

impl AudioDecoder for FlacDecoder {
    fn codec(&self) -> AudioCodec {
        AudioCodec::Flac
    }

    fn format(&self) -> AudioFormat {
        self.inner.format()
    }

    fn total_frames(&self) -> Option<u64> {
        self.inner.total_frames()
    }

    fn decode_next(&mut self) -> Result<Option<AudioBuffer>, DecodeError> {
        self.inner.decode_next()
    }

    fn seek(&mut self, frame: u64) -> Result<u64, DecodeError> {
        self.inner.seek(frame)
    }
}
