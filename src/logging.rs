use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Transport event for logging and debugging
#[derive(Debug, Clone)]
pub struct AudioEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AudioEventType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEventType {
    SourceLoaded,
    PlaybackStarted,
    PlaybackSuspended,
    PlaybackResumed,
    PlaybackFinished,
    Ejected,
    Seek,
    VolumeChanged,
    DecodeError,
    DeviceError,
}

impl AudioEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEventType::SourceLoaded => "SOURCE_LOADED",
            AudioEventType::PlaybackStarted => "PLAYBACK_STARTED",
            AudioEventType::PlaybackSuspended => "PLAYBACK_SUSPENDED",
            AudioEventType::PlaybackResumed => "PLAYBACK_RESUMED",
            AudioEventType::PlaybackFinished => "PLAYBACK_FINISHED",
            AudioEventType::Ejected => "EJECTED",
            AudioEventType::Seek => "SEEK",
            AudioEventType::VolumeChanged => "VOLUME_CHANGED",
            AudioEventType::DecodeError => "DECODE_ERROR",
            AudioEventType::DeviceError => "DEVICE_ERROR",
        }
    }
}

/// Logger for transport operations with a bounded event history
#[derive(Clone)]
pub struct AudioLogger {
    events: Arc<Mutex<VecDeque<AudioEvent>>>,
    max_events: usize,
}

impl Default for AudioLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioLogger {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            max_events: max_events.max(1),
        }
    }

    /// Initialize logging system with appropriate log level
    pub fn init() -> Result<(), Box<dyn std::error::Error>> {
        let log_level = std::env::var("QUICKCLIP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mut builder = env_logger::Builder::new();

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });

        match log_level.to_lowercase().as_str() {
            "trace" => builder.filter_level(log::LevelFilter::Trace),
            "debug" => builder.filter_level(log::LevelFilter::Debug),
            "warn" => builder.filter_level(log::LevelFilter::Warn),
            "error" => builder.filter_level(log::LevelFilter::Error),
            "off" => builder.filter_level(log::LevelFilter::Off),
            _ => builder.filter_level(log::LevelFilter::Info),
        };

        builder.try_init()?;

        info!("quickclip logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Record an event and forward it to the `log` facade
    pub fn log_event(&self, event_type: AudioEventType, details: impl Into<String>) {
        let details = details.into();

        match event_type {
            AudioEventType::Seek | AudioEventType::VolumeChanged => {
                debug!("[{}] {}", event_type.as_str(), details);
            }
            AudioEventType::DecodeError | AudioEventType::DeviceError => {
                error!("[{}] {}", event_type.as_str(), details);
            }
            AudioEventType::PlaybackFinished if details.contains("failed") => {
                warn!("[{}] {}", event_type.as_str(), details);
            }
            _ => info!("[{}] {}", event_type.as_str(), details),
        }

        let event = AudioEvent {
            timestamp: Utc::now(),
            event_type,
            details,
        };

        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    /// Get recent events, oldest first
    pub fn get_recent_events(&self, count: usize) -> Vec<AudioEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let skip = events.len().saturating_sub(count);
        events.iter().skip(skip).cloned().collect()
    }

    /// Event types in order, for quick assertions and status displays
    pub fn event_types(&self) -> Vec<AudioEventType> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.iter().map(|e| e.event_type).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
