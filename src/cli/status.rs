use crate::audio::device::OutputDevice;
use crate::audio::engine::{AudioEngine, Transport};
use crate::error::PlayerError;
use crate::models::{AudioCodec, AudioFormat, PlaybackState, WavePoint};

/// Snapshot of the transport for display
#[derive(Debug, Clone, PartialEq)]
pub struct TransportStatus {
    pub state: PlaybackState,
    pub source: Option<String>,
    pub codec: Option<AudioCodec>,
    pub format: Option<AudioFormat>,
    pub position_secs: f64,
    pub length_secs: Option<f64>,
    pub progress: f32,
    pub volume: f32,
    pub hq: bool,
}

impl TransportStatus {
    pub fn from_engine<D: OutputDevice>(engine: &AudioEngine<D>) -> Self {
        let unit = engine.unit();
        Self {
            state: engine.current_state(),
            source: engine.source().map(|s| s.name()),
            codec: unit.map(|u| u.codec()),
            format: unit.map(|u| u.native_format()),
            position_secs: unit.map(|u| u.position_secs()).unwrap_or(0.0),
            length_secs: unit.and_then(|u| u.length_secs()),
            progress: engine.progress_float(),
            volume: engine.volume(),
            hq: engine.sampler().is_hq(),
        }
    }
}

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Display the full transport status
    pub fn display_full_status(status: &TransportStatus) {
        println!("Source: {}", status.source.as_deref().unwrap_or("none"));
        println!("Status: {}", Self::format_playback_state(status.state));
        if let (Some(codec), Some(format)) = (status.codec, status.format) {
            println!("Format: {} {} Hz, {} ch", codec.name(), format.sample_rate, format.channels);
            println!("{}", Self::position_line(status));
        }
        println!(
            "Volume: {}%  Waveform: {}",
            (status.volume * 100.0).round() as u8,
            if status.hq { "HQ" } else { "LQ" }
        );
    }

    /// Single-line status, redrawn in place
    pub fn display_position_update(status: &TransportStatus) {
        print!("\r{}", Self::position_line(status));
        use std::io::{self, Write};
        let _ = io::stdout().flush();
    }

    pub fn position_line(status: &TransportStatus) -> String {
        format!(
            "{} [{}] {}/{} ({:.1}%)",
            status.state.as_str(),
            Self::create_progress_bar(status.progress, 30),
            Self::format_secs(status.position_secs),
            status
                .length_secs
                .map(Self::format_secs)
                .unwrap_or_else(|| "--:--".to_string()),
            status.progress * 100.0
        )
    }

    /// Rasterise a waveform polyline into `rows` text lines.
    ///
    /// `height` is the pixel height the points were rendered at. A cell is
    /// filled when its vertical band overlaps the point's upper..lower span.
    pub fn waveform_rows(points: &[WavePoint], rows: usize, height: f32) -> Vec<String> {
        if rows == 0 || height <= 0.0 {
            return Vec::new();
        }
        let band = height / rows as f32;
        let center_row = rows / 2;

        (0..rows)
            .map(|row| {
                let top = row as f32 * band;
                let bottom = top + band;
                points
                    .iter()
                    .map(|p| {
                        if p.y_upper < bottom && p.y_lower > top {
                            '█'
                        } else if row == center_row {
                            '─'
                        } else {
                            ' '
                        }
                    })
                    .collect()
            })
            .collect()
    }

    pub fn display_waveform(points: &[WavePoint], rows: usize, height: f32) {
        for line in Self::waveform_rows(points, rows, height) {
            println!("{}", line);
        }
    }

    /// Display a simple error message for non-interactive contexts
    pub fn display_simple_error(error: &PlayerError) {
        eprintln!("[{}] {}", error.severity().as_str(), error.user_message());

        if let Some(suggestion) = error.recovery_suggestions().first() {
            eprintln!("Suggestion: {}", suggestion);
        }
    }

    /// Format seconds as MM:SS.t
    pub fn format_secs(secs: f64) -> String {
        let secs = secs.max(0.0);
        let minutes = (secs / 60.0).floor() as u64;
        let seconds = secs - minutes as f64 * 60.0;
        format!("{:02}:{:04.1}", minutes, seconds)
    }

    /// Create a progress bar string
    pub fn create_progress_bar(progress: f32, width: usize) -> String {
        let filled = ((progress.clamp(0.0, 1.0) * width as f32) as usize).min(width);
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }

    pub fn format_playback_state(state: PlaybackState) -> String {
        match state {
            PlaybackState::NotInitialized => "⏏ Not initialized".to_string(),
            PlaybackState::Playing => "▶ Playing".to_string(),
            PlaybackState::Suspended => "⏸ Suspended".to_string(),
            PlaybackState::Finished => "⏹ Finished".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_status() -> TransportStatus {
        TransportStatus {
            state: PlaybackState::Playing,
            source: Some("clip.flac".to_string()),
            codec: Some(AudioCodec::Flac),
            format: Some(AudioFormat::new(48000, 2)),
            position_secs: 75.3,
            length_secs: Some(150.5),
            progress: 0.5,
            volume: 0.7,
            hq: true,
        }
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(StatusDisplay::format_secs(0.0), "00:00.0");
        assert_eq!(StatusDisplay::format_secs(9.44), "00:09.4");
        assert_eq!(StatusDisplay::format_secs(75.3), "01:15.3");
        assert_eq!(StatusDisplay::format_secs(-3.0), "00:00.0");
    }

    #[test]
    fn test_create_progress_bar() {
        assert_eq!(StatusDisplay::create_progress_bar(0.0, 10), "░░░░░░░░░░");
        assert_eq!(StatusDisplay::create_progress_bar(1.0, 10), "██████████");
        assert_eq!(StatusDisplay::create_progress_bar(0.5, 10), "█████░░░░░");
        assert_eq!(StatusDisplay::create_progress_bar(1.7, 4), "████");
    }

    #[test]
    fn test_position_line() {
        let line = StatusDisplay::position_line(&test_status());
        assert!(line.starts_with("playing ["));
        assert!(line.ends_with("01:15.3/02:30.5 (50.0%)"));

        let idle = TransportStatus {
            state: PlaybackState::NotInitialized,
            length_secs: None,
            progress: 0.0,
            position_secs: 0.0,
            ..test_status()
        };
        assert!(StatusDisplay::position_line(&idle).ends_with("00:00.0/--:-- (0.0%)"));
    }

    #[test]
    fn test_waveform_rows() {
        let points = vec![
            WavePoint { x: 0.0, y_upper: 4.0, y_lower: 4.0 },
            WavePoint { x: 1.0, y_upper: 0.0, y_lower: 10.0 },
            WavePoint { x: 2.0, y_upper: 3.0, y_lower: 7.0 },
        ];
        let rows = StatusDisplay::waveform_rows(&points, 5, 10.0);

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], " █ ");
        assert_eq!(rows[1], " ██");
        assert_eq!(rows[2], "─██");
        assert_eq!(rows[3], " ██");
        assert_eq!(rows[4], " █ ");
        assert!(StatusDisplay::waveform_rows(&points, 0, 10.0).is_empty());
    }

    #[test]
    fn test_playback_state_labels() {
        assert_eq!(StatusDisplay::format_playback_state(PlaybackState::Playing), "▶ Playing");
        assert_eq!(StatusDisplay::format_playback_state(PlaybackState::Suspended), "⏸ Suspended");
    }

    #[test]
    fn test_display_functions_dont_panic() {
        let status = test_status();
        StatusDisplay::display_full_status(&status);
        StatusDisplay::display_position_update(&status);

        let error = PlayerError::Decode(crate::error::DecodeError::UnsupportedFormat {
            format: "unknown".to_string(),
        });
        StatusDisplay::display_simple_error(&error);
    }
}
