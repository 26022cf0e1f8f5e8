use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::graph::LoopCount;
use crate::audio::waveform::WaveformPreset;
use crate::error::ConfigError;
use crate::models::AudioFormat;

/// Engine configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub output_sample_rate: u32,
    pub output_channels: u16,
    pub preferred_device: Option<String>,
    pub default_volume: f32,
    /// Seconds moved by forward/back
    pub seek_step_secs: f64,
    pub loop_count: LoopCount,
    /// Lead-in before a fresh unit starts pulling from its decoder. Some
    /// platforms need a few milliseconds before the device is ready.
    pub start_delay_ms: u64,
    pub visualization_window_secs: f64,
    pub waveform: WaveformConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_sample_rate: 44100,
            output_channels: 2,
            preferred_device: None,
            default_volume: 0.7,
            seek_step_secs: 5.0,
            loop_count: LoopCount::Times(0),
            start_delay_ms: 0,
            visualization_window_secs: 1.0,
            waveform: WaveformConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn output_format(&self) -> AudioFormat {
        AudioFormat::new(self.output_sample_rate, self.output_channels.max(1))
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Ring buffer capacity in bytes: rate x channels x 2 bytes x window
    pub fn ring_capacity_bytes(&self) -> usize {
        let format = self.output_format();
        let frames = (format.sample_rate as f64 * self.visualization_window_secs.max(0.0)).round() as usize;
        frames.max(1) * format.frame_size_i16()
    }
}

/// Waveform rendering options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WaveformConfig {
    pub preset: WaveformPreset,
    /// One sample per pixel when set, otherwise `lq_reduce_factor` pixels per sample
    pub hq: bool,
    pub lq_reduce_factor: usize,
    /// Exponential smoothing factor between renders
    pub smoothing: f32,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            preset: WaveformPreset::Detailed,
            hq: true,
            lq_reduce_factor: 4,
            smoothing: 0.2,
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: EngineConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Self::with_path(config_path)
    }

    /// Load from an explicit file, falling back to defaults when it is missing or unreadable
    pub fn with_path(config_path: PathBuf) -> Result<Self, ConfigError> {
        let config = match Self::load_config(&config_path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Using default configuration: {}", e);
                EngineConfig::default()
            }
        };

        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut EngineConfig),
    {
        updater(&mut self.config);
        self.save_config()
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), ConfigError> {
        self.config.default_volume = volume.clamp(0.0, 1.0);
        self.save_config()
    }

    pub fn set_preferred_device(&mut self, device: Option<String>) -> Result<(), ConfigError> {
        self.config.preferred_device = device;
        self.save_config()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = EngineConfig::default();
        self.save_config()
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join("quickclip");

        std::fs::create_dir_all(&config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
        if !path.exists() {
            return Ok(EngineConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&config_content)?;

        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config_manager = ConfigManager {
            config: EngineConfig::default(),
            config_path,
        };

        (config_manager, temp_dir)
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();

        assert_eq!(config.output_sample_rate, 44100);
        assert_eq!(config.output_channels, 2);
        assert_eq!(config.default_volume, 0.7);
        assert_eq!(config.loop_count, LoopCount::Times(0));
        assert_eq!(config.start_delay(), Duration::ZERO);
        assert_eq!(config.ring_capacity_bytes(), 176_400);
        assert!(config.waveform.hq);
        assert_eq!(config.waveform.lq_reduce_factor, 4);
    }

    #[test]
    fn test_ring_capacity_follows_window() {
        let config = EngineConfig {
            output_sample_rate: 48000,
            output_channels: 1,
            visualization_window_secs: 0.5,
            ..EngineConfig::default()
        };
        assert_eq!(config.ring_capacity_bytes(), 48_000);
    }

    #[test]
    fn test_save_and_load_config() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.config.default_volume = 0.6;
        config_manager.config.preferred_device = Some("Test Device".to_string());
        config_manager.config.loop_count = LoopCount::Forever;
        config_manager.config.waveform.preset = WaveformPreset::Punchy;

        config_manager.save_config().unwrap();

        let loaded_config = ConfigManager::load_config(&config_manager.config_path).unwrap();
        assert_eq!(loaded_config, config_manager.config);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let temp_dir = TempDir::new().unwrap();
        let nonexistent_path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigManager::load_config(&nonexistent_path).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");

        fs::write(&config_path, "invalid toml content [[[").unwrap();

        match ConfigManager::load_config(&config_path) {
            Err(ConfigError::DeserializationError(_)) => {}
            other => panic!("Expected DeserializationError, got {:?}", other),
        }

        // The manager itself degrades to defaults
        let manager = ConfigManager::with_path(config_path).unwrap();
        assert_eq!(manager.get_config(), &EngineConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "default_volume = 0.25\nstart_delay_ms = 5\n").unwrap();

        let config = ConfigManager::load_config(&config_path).unwrap();
        assert_eq!(config.default_volume, 0.25);
        assert_eq!(config.start_delay(), Duration::from_millis(5));
        assert_eq!(config.output_sample_rate, 44100);
    }

    #[test]
    fn test_update_config() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager
            .update_config(|config| {
                config.seek_step_secs = 10.0;
                config.waveform.hq = false;
            })
            .unwrap();

        let loaded_config = ConfigManager::load_config(&config_manager.config_path).unwrap();
        assert_eq!(loaded_config.seek_step_secs, 10.0);
        assert!(!loaded_config.waveform.hq);
    }

    #[test]
    fn test_set_volume_clamps() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.set_volume(1.5).unwrap();
        assert_eq!(config_manager.get_config().default_volume, 1.0);

        config_manager.set_volume(-0.5).unwrap();
        assert_eq!(config_manager.get_config().default_volume, 0.0);
    }

    #[test]
    fn test_reset_to_defaults() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.set_preferred_device(Some("My DAC".to_string())).unwrap();
        config_manager.reset_to_defaults().unwrap();

        assert_eq!(config_manager.get_config(), &EngineConfig::default());
    }

    #[test]
    fn test_config_path_creation() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("config").join("config.toml");

        let config_manager = ConfigManager {
            config: EngineConfig::default(),
            config_path: nested_path.clone(),
        };

        config_manager.save_config().unwrap();
        assert!(nested_path.exists());
    }

    #[test]
    fn test_toml_format() {
        let toml_string = toml::to_string_pretty(&EngineConfig::default()).unwrap();

        assert!(toml_string.contains("output_sample_rate = 44100"));
        assert!(toml_string.contains("default_volume"));
        assert!(toml_string.contains("[waveform]"));
        assert!(toml_string.contains("preset = \"detailed\""));
    }
}
