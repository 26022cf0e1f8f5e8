use symphonia::core::codecs::{CodecType, CODEC_TYPE_NULL};

use super::backend::SymphoniaDecoder;
use crate::audio::{AudioDecoder, AudioSource};
use crate::error::DecodeError;
use crate::models::{AudioBuffer, AudioCodec, AudioFormat};

/// WAV decoder. RIFF payloads are PCM or ADPCM, anything symphonia can decode is accepted.
pub struct WavDecoder {
    inner: SymphoniaDecoder,
}

fn accepts(codec: CodecType) -> bool {
    codec != CODEC_TYPE_NULL
}

impl WavDecoder {
    pub fn new(source: &AudioSource) -> Result<Self, DecodeError> {
        Ok(Self {
            inner: SymphoniaDecoder::open(source, AudioCodec::Wav, accepts)?,
        })
    }
}

impl AudioDecoder for WavDecoder {
    fn codec(&self) -> AudioCodec {
        AudioCodec::Wav
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::fixtures::{sine_wav, WavSpec};

    fn decode_all(decoder: &mut WavDecoder) -> Vec<f32> {
        let mut samples = Vec::new();
        while let Some(buffer) = decoder.decode_next().unwrap() {
            assert_eq!(buffer.samples.len(), buffer.frames * buffer.channels as usize);
            samples.extend_from_slice(&buffer.samples);
        }
        samples
    }

    #[test]
    fn test_wav_decoder_reports_format() {
        let source = sine_wav(WavSpec::stereo(44100), 0.5);
        let decoder = WavDecoder::new(&source).unwrap();

        assert_eq!(decoder.codec(), AudioCodec::Wav);
        assert_eq!(decoder.format(), AudioFormat::new(44100, 2));
        assert_eq!(decoder.total_frames(), Some(22050));
    }

    #[test]
    fn test_wav_decoder_decodes_every_frame() {
        let source = sine_wav(WavSpec::mono(22050), 1.0);
        let mut decoder = WavDecoder::new(&source).unwrap();

        let samples = decode_all(&mut decoder);
        assert_eq!(samples.len(), 22050);
        assert!(samples.iter().any(|s| s.abs() > 0.4));
        assert!(samples.iter().all(|s| s.abs() <= 1.0));

        // Exhausted decoders keep reporting end of stream
        assert!(decoder.decode_next().unwrap().is_none());
    }

    #[test]
    fn test_wav_decoder_seek() {
        let source = sine_wav(WavSpec::mono(8000), 2.0);
        let mut decoder = WavDecoder::new(&source).unwrap();

        let landed = decoder.seek(8000).unwrap();
        assert_eq!(landed, 8000);
        let remaining = decode_all(&mut decoder);
        assert_eq!(remaining.len(), 8000);

        // Seeking back after exhaustion restarts the stream
        assert_eq!(decoder.seek(0).unwrap(), 0);
        assert_eq!(decode_all(&mut decoder).len(), 16000);
    }

    #[test]
    fn test_wav_decoder_seek_past_end_clamps() {
        let source = sine_wav(WavSpec::mono(8000), 1.0);
        let mut decoder = WavDecoder::new(&source).unwrap();

        assert_eq!(decoder.seek(1_000_000).unwrap(), 7999);
        assert_eq!(decode_all(&mut decoder).len(), 1);
    }

    #[test]
    fn test_wav_decoder_rejects_truncated_header() {
        let source = AudioSource::from_bytes(b"RIFF\x24\x00\x00\x00WAVE".to_vec());
        match WavDecoder::new(&source) {
            Err(DecodeError::InvalidStream { codec, .. }) => assert_eq!(codec, AudioCodec::Wav),
            Err(other) => panic!("Expected InvalidStream, got {:?}", other),
            Ok(_) => panic!("Expected truncated WAV to be rejected"),
        }
    }
}
