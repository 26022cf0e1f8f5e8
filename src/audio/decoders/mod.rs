pub mod backend;
pub mod flac;
pub mod mp3;
pub mod stream;
pub mod wav;

pub use flac::FlacDecoder;
pub use mp3::Mp3Decoder;
pub use stream::DecoderStream;
pub use wav::WavDecoder;

use crate::audio::{AudioDecoder, AudioSource};
use crate::error::DecodeError;
use crate::models::AudioCodec;

/// Open the decoder matching a sniffed codec.
///
/// A failure here is terminal for the source; no other codec is tried.
pub fn open_decoder(
    source: &AudioSource,
    codec: AudioCodec,
) -> Result<Box<dyn AudioDecoder>, DecodeError> {
    let decoder: Box<dyn AudioDecoder> = match codec {
        AudioCodec::Wav => Box::new(WavDecoder::new(source)?),
        AudioCodec::Mp3 => Box::new(Mp3Decoder::new(source)?),
        AudioCodec::Flac => Box::new(FlacDecoder::new(source)?),
    };
    Ok(decoder)
}
