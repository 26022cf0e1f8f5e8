use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use crate::error::DecodeError;
use crate::models::AudioCodec;

const HEADER_SIZE: usize = 12;

/// An audio file held entirely in memory.
///
/// Decoders that seek backwards need a seekable source even when the file came
/// from a one-shot reader, so the bytes are loaded eagerly. Cloning is cheap and
/// every playback unit reads through its own cursor.
#[derive(Debug, Clone)]
pub struct AudioSource {
    bytes: Arc<[u8]>,
    name: Option<String>,
}

impl AudioSource {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            name: None,
        }
    }

    /// Drain a reader into memory
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self::from_bytes(buf))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let source = Self::from_reader(file)?;
        Ok(source.with_name(path.display().to_string()))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display name for logs, falls back to a size description
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("<{} bytes in memory>", self.bytes.len()))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Fresh read cursor positioned at offset 0
    pub fn cursor(&self) -> Cursor<Arc<[u8]>> {
        Cursor::new(Arc::clone(&self.bytes))
    }

    /// Sniff the codec of this source
    pub fn codec(&self) -> Result<AudioCodec, DecodeError> {
        let mut cursor = self.cursor();
        let detected = sniff_format(&mut cursor).map_err(|e| DecodeError::UnsupportedFormat {
            format: format!("unreadable header: {}", e),
        })?;
        detected.ok_or_else(|| DecodeError::UnsupportedFormat {
            format: "unknown".to_string(),
        })
    }
}

/// Classify a stream by its leading bytes and rewind it to offset 0.
///
/// A stream shorter than the header is classified on what could be read.
/// `Ok(None)` means no known signature matched.
pub fn sniff_format<R: Read + Seek>(reader: &mut R) -> io::Result<Option<AudioCodec>> {
    let mut header = [0u8; HEADER_SIZE];
    let mut filled = 0;
    let read_result = loop {
        if filled == HEADER_SIZE {
            break Ok(());
        }
        match reader.read(&mut header[filled..]) {
            Ok(0) => break Ok(()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => break Err(e),
        }
    };

    // Rewind even when the read failed so downstream readers see the full stream.
    let rewind = reader.seek(SeekFrom::Start(0));
    read_result?;
    rewind?;

    let codec = classify_header(&header[..filled]);
    if codec.is_none() {
        log::debug!("Could not determine audio type from {} header bytes", filled);
    }
    Ok(codec)
}

/// Signature rules, checked in order
pub fn classify_header(header: &[u8]) -> Option<AudioCodec> {
    if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WAVE" {
        return Some(AudioCodec::Wav);
    }
    if header.len() >= 3 && &header[0..3] == b"ID3" {
        return Some(AudioCodec::Mp3);
    }
    // MPEG audio frame sync
    if header.len() >= 2 && header[0] == 0xFF && (header[1] & 0xF6) == 0xF2 {
        return Some(AudioCodec::Mp3);
    }
    if header.len() >= 4 && &header[0..4] == b"fLaC" {
        return Some(AudioCodec::Flac);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff_bytes(bytes: &[u8]) -> (Option<AudioCodec>, u64) {
        let mut cursor = Cursor::new(bytes.to_vec());
        let codec = sniff_format(&mut cursor).unwrap();
        (codec, cursor.position())
    }

    #[test]
    fn test_sniff_known_headers_and_rewind() {
        let cases: Vec<(Vec<u8>, Option<AudioCodec>)> = vec![
            (b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec(), Some(AudioCodec::Wav)),
            (b"ID3\x04\x00\x00\x00\x00\x00\x00\x00\x00\x00".to_vec(), Some(AudioCodec::Mp3)),
            (vec![0xFF, 0xFB, 0x90, 0x64, 0, 0, 0, 0, 0, 0, 0, 0], Some(AudioCodec::Mp3)),
            (vec![0xFF, 0xF3, 0x90, 0x64, 0, 0, 0, 0, 0, 0, 0, 0], Some(AudioCodec::Mp3)),
            (b"fLaC\x00\x00\x00\x22\x10\x00\x10\x00".to_vec(), Some(AudioCodec::Flac)),
            (b"OggS\x00\x02\x00\x00\x00\x00\x00\x00".to_vec(), None),
        ];

        for (bytes, expected) in cases {
            let (codec, position) = sniff_bytes(&bytes);
            assert_eq!(codec, expected, "header {:02X?}", &bytes[..4]);
            assert_eq!(position, 0, "reader must be rewound");
        }
    }

    #[test]
    fn test_sniff_short_input() {
        assert_eq!(sniff_bytes(b"fLaC"), (Some(AudioCodec::Flac), 0));
        assert_eq!(sniff_bytes(b"ID3"), (Some(AudioCodec::Mp3), 0));
        assert_eq!(sniff_bytes(&[0xFF, 0xFA]), (Some(AudioCodec::Mp3), 0));
        // RIFF needs the full 12 bytes to see WAVE
        assert_eq!(sniff_bytes(b"RIFF\x00\x00"), (None, 0));
        assert_eq!(sniff_bytes(b""), (None, 0));
    }

    #[test]
    fn test_riff_without_wave_is_unknown() {
        assert_eq!(classify_header(b"RIFF\x00\x00\x00\x00AVI "), None);
    }

    #[test]
    fn test_frame_sync_mask() {
        // Layer bits 00 (reserved) must not match
        assert_eq!(classify_header(&[0xFF, 0xF0]), None);
        assert_eq!(classify_header(&[0xFF, 0xE2]), None);
        assert_eq!(classify_header(&[0xFF, 0xF2]), Some(AudioCodec::Mp3));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    impl Seek for FailingReader {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_io_failure_propagates() {
        let err = sniff_format(&mut FailingReader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_audio_source_codec() {
        let source = AudioSource::from_bytes(b"fLaC\x00\x00\x00\x22".to_vec());
        assert_eq!(source.codec().unwrap(), AudioCodec::Flac);
        assert_eq!(source.len(), 8);

        let unknown = AudioSource::from_bytes(vec![0u8; 32]);
        assert!(matches!(unknown.codec(), Err(DecodeError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_audio_source_from_reader() {
        let data = b"RIFF\x00\x00\x00\x00WAVE".to_vec();
        let source = AudioSource::from_reader(Cursor::new(data.clone()))
            .unwrap()
            .with_name("clip.wav");
        assert_eq!(source.name(), "clip.wav");
        assert_eq!(source.cursor().get_ref().as_ref(), data.as_slice());
        assert_eq!(source.codec().unwrap(), AudioCodec::Wav);
    }

    #[test]
    fn test_audio_source_from_path() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ID3\x03\x00").unwrap();

        let source = AudioSource::from_path(file.path()).unwrap();
        assert_eq!(source.len(), 5);
        assert!(source.name().contains(file.path().file_name().unwrap().to_str().unwrap()));
        assert!(AudioSource::from_path("/nonexistent/clip.wav").is_err());
    }
}
