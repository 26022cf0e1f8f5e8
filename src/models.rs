use serde::{Deserialize, Serialize};
use std::fmt;

/// Codecs the format sniffer can recognise
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AudioCodec {
    Wav,
    Mp3,
    Flac,
}

impl AudioCodec {
    /// Get the human-readable name of the codec
    pub fn name(&self) -> &'static str {
        match self {
            AudioCodec::Wav => "WAV",
            AudioCodec::Mp3 => "MP3",
            AudioCodec::Flac => "FLAC",
        }
    }

    /// Check if the codec is lossless
    pub fn is_lossless(&self) -> bool {
        matches!(self, AudioCodec::Wav | AudioCodec::Flac)
    }

    /// File extension handed to the demuxer as a probe hint
    pub fn extension(&self) -> &'static str {
        match self {
            AudioCodec::Wav => "wav",
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sample rate and channel layout of a PCM stream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self { sample_rate, channels }
    }

    /// Bytes of one interleaved 16-bit frame
    pub fn frame_size_i16(&self) -> usize {
        self.channels as usize * 2
    }

    /// Convert a frame count to seconds
    pub fn frames_to_secs(&self, frames: u64) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            frames as f64 / self.sample_rate as f64
        }
    }

    pub fn format_description(&self) -> String {
        format!(
            "{} Hz - {} channel{}",
            self.sample_rate,
            self.channels,
            if self.channels == 1 { "" } else { "s" }
        )
    }
}

/// Audio buffer for decoded, interleaved PCM data
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub frames: usize,
}

impl AudioBuffer {
    pub fn new(channels: u16, sample_rate: u32, frames: usize) -> Self {
        Self {
            samples: vec![0.0; frames * channels as usize],
            channels,
            sample_rate,
            frames,
        }
    }

    /// Check if the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

/// Transport state of the engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    NotInitialized,
    Playing,
    Suspended,
    Finished,
}

impl PlaybackState {
    /// States that own a live playback unit
    pub fn has_unit(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Suspended)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::NotInitialized => "not initialized",
            PlaybackState::Playing => "playing",
            PlaybackState::Suspended => "suspended",
            PlaybackState::Finished => "finished",
        }
    }
}

/// One column of the waveform polyline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WavePoint {
    pub x: f32,
    pub y_upper: f32,
    pub y_lower: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_names() {
        assert_eq!(AudioCodec::Wav.name(), "WAV");
        assert_eq!(AudioCodec::Flac.to_string(), "FLAC");
        assert_eq!(AudioCodec::Mp3.extension(), "mp3");
        assert!(AudioCodec::Flac.is_lossless());
        assert!(!AudioCodec::Mp3.is_lossless());
    }

    #[test]
    fn test_audio_format_helpers() {
        let format = AudioFormat::new(44100, 2);
        assert_eq!(format.frame_size_i16(), 4);
        assert!((format.frames_to_secs(22050) - 0.5).abs() < 1e-9);
        assert_eq!(format.format_description(), "44100 Hz - 2 channels");
        assert_eq!(AudioFormat::new(0, 1).frames_to_secs(100), 0.0);
    }

    #[test]
    fn test_playback_state_units() {
        assert_eq!(PlaybackState::default(), PlaybackState::NotInitialized);
        assert!(PlaybackState::Playing.has_unit());
        assert!(PlaybackState::Suspended.has_unit());
        assert!(!PlaybackState::Finished.has_unit());
        assert!(!PlaybackState::NotInitialized.has_unit());
    }

    #[test]
    fn test_wave_point_json_shape() {
        let point = WavePoint { x: 1.0, y_upper: 10.0, y_lower: 30.0 };
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, r#"{"x":1.0,"y_upper":10.0,"y_lower":30.0}"#);
    }

    #[test]
    fn test_audio_buffer_new() {
        let buffer = AudioBuffer::new(2, 44100, 10);
        assert_eq!(buffer.samples.len(), 20);
        assert!(!buffer.is_empty());
        assert!(AudioBuffer::new(2, 44100, 0).is_empty());
    }
}
