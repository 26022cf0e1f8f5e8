pub mod buffer;
pub mod decoders;
pub mod device;
pub mod engine;
pub mod graph;
pub mod resampler;
pub mod source;
pub mod waveform;


use crate::error::DecodeError;

// Re-export device types
pub use device::{CpalOutput, OutputDevice, PulledOutput, PulledOutputHandle};

// Re-export decoder types
pub use decoders::{open_decoder, DecoderStream, FlacDecoder, Mp3Decoder, WavDecoder};

// Re-export the transform graph
pub use graph::{
    Completion, LoopCount, Looper, PauseGate, PlaybackGraph, SampleStream, SeekableStream,
    SharedControl, UnitControl, VisualizationTap, VolumeStage,
};

pub use buffer::{PcmRing, RingBuffer};
pub use engine::{AudioEngine, PlaybackUnit, Transport};
pub use resampler::{LinearResampler, Resample};
pub use source::{sniff_format, AudioSource};
pub use waveform::{WaveformPreset, WaveformSampler};

// Re-export models for convenience
pub use crate::models::{AudioBuffer, AudioCodec, AudioFormat};

/// Core trait for audio decoding functionality
pub trait AudioDecoder: Send {
    /// Codec this decoder was opened as
    fn codec(&self) -> AudioCodec;

    /// Native sample rate and channel count
    fn format(&self) -> AudioFormat;

    /// Total length in frames, `None` when the container does not say
    fn total_frames(&self) -> Option<u64>;

    /// Decode the next chunk of audio data. `Ok(None)` marks the end of the stream.
    fn decode_next(&mut self) -> Result<Option<AudioBuffer>, DecodeError>;

    /// Seek to a frame position, returning the frame the next chunk starts at
    fn seek(&mut self, frame: u64) -> Result<u64, DecodeError>;
}
