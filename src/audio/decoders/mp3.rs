use symphonia::core::codecs::{CodecType, CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3};

use super::backend::SymphoniaDecoder;
use crate::audio::{AudioDecoder, AudioSource};
use crate::error::DecodeError;
use crate::models::{AudioBuffer, AudioCodec, AudioFormat};

/// MPEG audio decoder. Layers I and II share the frame sync and are accepted too.
pub struct Mp3Decoder {
    inner: SymphoniaDecoder,
}

fn accepts(codec: CodecType) -> bool {
    codec == CODEC_TYPE_MP3 || codec == CODEC_TYPE_MP2 || codec == CODEC_TYPE_MP1
}

impl Mp3Decoder {
    pub fn new(source: &AudioSource) -> Result<Self, DecodeError> {
        Ok(Self {
            inner: SymphoniaDecoder::open(source, AudioCodec::Mp3, accepts)?,
        })
    }
}

impl AudioDecoder for Mp3Decoder {
    fn codec(&self) -> AudioCodec {
        AudioCodec::Mp3
    }

    fn format(&self) -> AudioFormat {
        self.inner.format()
    }

    /// VBR files without a Xing header report no length
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
