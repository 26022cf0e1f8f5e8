//! Live waveform derived from the most recent rendered PCM.
//!
//! Each render reads a window from the ring, maps every frame's amplitude to a
//! 0..1 dB scale, sharpens it with a contrast curve and blends it into the
//! previous render so overlapping windows do not jitter.

use serde::{Deserialize, Serialize};

use crate::audio::buffer::PcmRing;
use crate::config::WaveformConfig;
use crate::models::WavePoint;

const FULL_SCALE: f32 = 32767.0;
const MIN_AMPLITUDE: f32 = 1e-9;

/// dB silence floor and contrast exponent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformPreset {
    /// -40 dB floor, gentle curve
    Classic,
    /// -120 dB floor, shows quiet passages
    Detailed,
    /// -40 dB floor, steep curve that only keeps transients
    Punchy,
    Custom { db_min: f32, exponent: f32 },
}

impl WaveformPreset {
    pub fn db_min(&self) -> f32 {
        match self {
            WaveformPreset::Classic | WaveformPreset::Punchy => -40.0,
            WaveformPreset::Detailed => -120.0,
            WaveformPreset::Custom { db_min, .. } => *db_min,
        }
    }

    pub fn exponent(&self) -> f32 {
        match self {
            WaveformPreset::Classic => 2.0,
            WaveformPreset::Detailed => 2.5,
            WaveformPreset::Punchy => 10.0,
            WaveformPreset::Custom { exponent, .. } => *exponent,
        }
    }
}

impl Default for WaveformPreset {
    fn default() -> Self {
        WaveformPreset::Detailed
    }
}

/// Normalize a 16-bit sample to 0..1 on a dB scale floored at `db_min`
pub fn normalize_db(sample: i16, db_min: f32) -> f32 {
    let amplitude = (sample as f32).abs() / FULL_SCALE;
    let db = 20.0 * amplitude.max(MIN_AMPLITUDE).log10();
    if db_min >= 0.0 {
        return if db >= 0.0 { 1.0 } else { 0.0 };
    }
    let db = db.clamp(db_min, 0.0);
    (db - db_min) / -db_min
}

/// `value^exponent` for non-negative values, sign-preserving otherwise
pub fn apply_contrast(value: f32, exponent: f32) -> f32 {
    if value >= 0.0 {
        value.powf(exponent)
    } else {
        -(-value).powf(exponent)
    }
}

/// Turns ring windows into smoothed polylines
#[derive(Debug, Clone)]
pub struct WaveformSampler {
    preset: WaveformPreset,
    hq: bool,
    lq_reduce_factor: usize,
    alpha: f32,
    smoothed: Vec<f32>,
}

impl WaveformSampler {
    pub fn new(config: &WaveformConfig) -> Self {
        Self {
            preset: config.preset,
            hq: config.hq,
            lq_reduce_factor: config.lq_reduce_factor.max(1),
            alpha: config.smoothing.clamp(0.0, 1.0),
            smoothed: Vec::new(),
        }
    }

    pub fn set_hq(&mut self, hq: bool) {
        self.hq = hq;
    }

    pub fn is_hq(&self) -> bool {
        self.hq
    }

    pub fn set_preset(&mut self, preset: WaveformPreset) {
        self.preset = preset;
    }

    pub fn preset(&self) -> WaveformPreset {
        self.preset
    }

    /// Pixels per sample
    pub fn reduce_factor(&self) -> usize {
        if self.hq {
            1
        } else {
            self.lq_reduce_factor
        }
    }

    /// Zero the smoothing state, keeping its size
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }

    pub fn smoothed(&self) -> &[f32] {
        &self.smoothed
    }

    /// Render `width` pixels of waveform at `height`
    pub fn render(&mut self, ring: &dyn PcmRing, width: usize, height: f32) -> Vec<WavePoint> {
        let reduce = self.reduce_factor();
        let num_samples = width / reduce;
        if num_samples == 0 {
            return Vec::new();
        }

        if self.smoothed.len() != num_samples {
            self.smoothed = vec![0.0; num_samples];
        }

        let channels = ring.channels().max(1) as usize;
        let window = ring.read_window(num_samples);
        let db_min = self.preset.db_min();
        let exponent = self.preset.exponent();
        let center_y = height / 2.0;
        let max_height = height / 2.0;

        let mut points = Vec::with_capacity(num_samples);
        for (i, frame) in window.chunks(channels).enumerate().take(num_samples) {
            // Loudest channel wins
            let peak = frame.iter().map(|s| s.saturating_abs()).max().unwrap_or(0);
            let value = apply_contrast(normalize_db(peak, db_min), exponent);

            let smoothed = &mut self.smoothed[i];
            *smoothed = *smoothed * (1.0 - self.alpha) + value * self.alpha;

            points.push(WavePoint {
                x: (i * reduce) as f32,
                y_upper: center_y - *smoothed * max_height,
                y_lower: center_y + *smoothed * max_height,
            });
        }
        points
    }
}
