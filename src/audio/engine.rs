use std::sync::{Arc, Mutex};

use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::audio::buffer::{PcmRing, RingBuffer};
use crate::audio::decoders::open_decoder;
use crate::audio::device::{CpalOutput, OutputDevice};
use crate::audio::graph::{
    build_chain, lock_control, Completion, PlaybackGraph, SharedControl, UnitControl,
};
use crate::audio::source::AudioSource;
use crate::audio::waveform::WaveformSampler;
use crate::config::EngineConfig;
use crate::error::{DecodeError, PlayerError};
use crate::logging::{AudioEventType, AudioLogger};
use crate::models::{AudioCodec, AudioFormat, PlaybackState, WavePoint};

/// Operations the UI shell drives the engine with
pub trait Transport {
    /// Start a fresh unit, or resume a suspended one
    fn play(&mut self) -> Result<(), PlayerError>;

    /// Suspend playback, keeping the position
    fn stop(&mut self);

    /// Tear down the current unit and clear the visualization
    fn eject(&mut self);

    /// Move by `delta_secs`, clamped to the stream
    fn seek(&mut self, delta_secs: f64);

    /// Jump to `ratio` of the stream length, clamped to `0.0..=1.0`
    fn seek_float(&mut self, ratio: f64);

    fn forward(&mut self);

    fn back(&mut self);

    /// Set the output level in `0.0..=1.0`
    fn set_volume(&mut self, level: f32);

    fn progress_float(&self) -> f32;

    fn current_state(&self) -> PlaybackState;

    fn render_waveform(&mut self, width: usize, height: f32) -> Vec<WavePoint>;
}

/// Live decode session owned by the engine
pub struct PlaybackUnit {
    control: SharedControl,
    done: oneshot::Receiver<Completion>,
    codec: AudioCodec,
    native: AudioFormat,
}

impl PlaybackUnit {
    pub fn codec(&self) -> AudioCodec {
        self.codec
    }

    pub fn native_format(&self) -> AudioFormat {
        self.native
    }

    pub fn control(&self) -> &SharedControl {
        &self.control
    }

    pub fn position_secs(&self) -> f64 {
        let control = lock_control(&self.control);
        self.native.frames_to_secs(control.effective_position())
    }

    pub fn length_secs(&self) -> Option<f64> {
        let control = lock_control(&self.control);
        control.length.map(|len| self.native.frames_to_secs(len))
    }

    pub fn is_paused(&self) -> bool {
        lock_control(&self.control).paused
    }
}

type Invalidator = Box<dyn Fn() + Send + Sync>;

/// Transport controller: owns the single playback unit, the output device and
/// the visualization ring.
pub struct AudioEngine<D: OutputDevice> {
    config: EngineConfig,
    device: D,
    ring: Arc<dyn PcmRing>,
    sampler: WaveformSampler,
    state: PlaybackState,
    source: Option<AudioSource>,
    unit: Option<PlaybackUnit>,
    volume: f32,
    logger: AudioLogger,
    invalidator: Option<Invalidator>,
}

impl AudioEngine<CpalOutput> {
    /// Engine on the system's output device
    pub fn with_default_device(config: EngineConfig) -> Self {
        let device = CpalOutput::new(config.preferred_device.clone());
        Self::new(config, device)
    }
}

impl<D: OutputDevice> AudioEngine<D> {
    pub fn new(config: EngineConfig, device: D) -> Self {
        let ring = Arc::new(RingBuffer::new(
            config.ring_capacity_bytes(),
            config.output_format().channels,
        ));
        Self::with_ring(config, device, ring)
    }

    /// Use a custom ring implementation
    pub fn with_ring(config: EngineConfig, device: D, ring: Arc<dyn PcmRing>) -> Self {
        let volume = config.default_volume.clamp(0.0, 1.0);
        let sampler = WaveformSampler::new(&config.waveform);
        Self {
            config,
            device,
            ring,
            sampler,
            state: PlaybackState::NotInitialized,
            source: None,
            unit: None,
            volume,
            logger: AudioLogger::new(),
            invalidator: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn logger(&self) -> &AudioLogger {
        &self.logger
    }

    pub fn ring(&self) -> &Arc<dyn PcmRing> {
        &self.ring
    }

    pub fn sampler(&self) -> &WaveformSampler {
        &self.sampler
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn unit(&self) -> Option<&PlaybackUnit> {
        self.unit.as_ref()
    }

    pub fn source(&self) -> Option<&AudioSource> {
        self.source.as_ref()
    }

    /// Remembered output level, applied to every new unit
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_invalidator<F>(&mut self, invalidate: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.invalidator = Some(Box::new(invalidate));
    }

    pub fn set_hq(&mut self, hq: bool) {
        self.sampler.set_hq(hq);
    }

    /// Replace the pending source. A live unit is ejected first; an
    /// unrecognised source is rejected before anything changes.
    pub fn load(&mut self, source: AudioSource) -> Result<AudioCodec, PlayerError> {
        let codec = match source.codec() {
            Ok(codec) => codec,
            Err(e) => return Err(self.report_decode_error(e)),
        };

        if self.state.has_unit() {
            self.eject();
        }

        self.logger.log_event(
            AudioEventType::SourceLoaded,
            format!("{} ({}, {} bytes)", source.name(), codec, source.len()),
        );
        self.source = Some(source);
        Ok(codec)
    }

    /// Observe completion and request a redraw. Call from the UI redraw tick.
    pub fn tick(&mut self) -> PlaybackState {
        let completion = match self.unit.as_mut() {
            Some(unit) => match unit.done.try_recv() {
                Ok(completion) => Some(completion),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Closed) => Some(Completion::Cancelled),
            },
            None => None,
        };

        match completion {
            Some(completion) => self.finish(completion),
            None if self.state == PlaybackState::Playing => self.invalidate(),
            None => {}
        }

        self.state
    }

    fn start_unit(&mut self) -> Result<(), PlayerError> {
        let source = match &self.source {
            Some(source) => source.clone(),
            None => {
                log::warn!("play() ignored: no source loaded");
                return Ok(());
            }
        };

        let codec = match source.codec() {
            Ok(codec) => codec,
            Err(e) => return Err(self.report_decode_error(e)),
        };
        let decoder = match open_decoder(&source, codec) {
            Ok(decoder) => decoder,
            Err(e) => return Err(self.report_decode_error(e)),
        };

        let native = decoder.format();
        let length = decoder.total_frames();
        let output = self.config.output_format();

        // Only one graph may pull from the device
        self.release_unit();
        self.ring.clear();
        self.sampler.reset();

        let chain = build_chain(decoder, output, self.config.loop_count, Arc::clone(&self.ring));
        let control = Arc::new(Mutex::new(UnitControl::new(self.volume, length, native.sample_rate)));
        let (done_tx, done_rx) = oneshot::channel();
        let lead_in = (self.config.start_delay().as_secs_f64() * output.sample_rate as f64).round() as usize;
        let graph = PlaybackGraph::new(chain, Arc::clone(&control), done_tx, lead_in);

        if let Err(e) = self.device.open(output, graph) {
            self.logger
                .log_event(AudioEventType::DeviceError, e.to_string());
            return Err(e.into());
        }

        self.unit = Some(PlaybackUnit {
            control,
            done: done_rx,
            codec,
            native,
        });
        self.state = PlaybackState::Playing;
        self.logger.log_event(
            AudioEventType::PlaybackStarted,
            format!("{} [{} {}]", source.name(), codec, native.format_description()),
        );
        Ok(())
    }

    fn finish(&mut self, completion: Completion) {
        self.release_unit();
        self.ring.clear();
        self.sampler.reset();
        self.state = PlaybackState::Finished;

        let details = match &completion {
            Completion::Drained => "end of stream".to_string(),
            Completion::Failed(reason) => format!("failed: {}", reason),
            Completion::Cancelled => "output closed".to_string(),
        };
        self.logger.log_event(AudioEventType::PlaybackFinished, details);
        self.invalidate();
    }

    /// Close the device and drop the unit. Cleanup failures are logged only.
    fn release_unit(&mut self) {
        if self.device.is_open() {
            if let Err(e) = self.device.close() {
                log::warn!("Failed to close output device: {}", e);
            }
        }
        self.unit = None;
    }

    fn report_decode_error(&self, error: DecodeError) -> PlayerError {
        self.logger
            .log_event(AudioEventType::DecodeError, error.user_message());
        PlayerError::Decode(error)
    }

    fn invalidate(&self) {
        if let Some(invalidate) = &self.invalidator {
            invalidate();
        }
    }

    /// Control state of the unit, while one exists
    fn active_control(&self) -> Option<&SharedControl> {
        if self.state.has_unit() {
            self.unit.as_ref().map(|unit| &unit.control)
        } else {
            None
        }
    }
}

impl<D: OutputDevice> Transport for AudioEngine<D> {
    fn play(&mut self) -> Result<(), PlayerError> {
        match self.state {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Suspended => {
                if let Some(control) = self.active_control() {
                    lock_control(control).paused = false;
                }
                self.state = PlaybackState::Playing;
                self.logger.log_event(AudioEventType::PlaybackResumed, "");
                Ok(())
            }
            PlaybackState::NotInitialized | PlaybackState::Finished => self.start_unit(),
        }
    }

    fn stop(&mut self) {
        if self.state != PlaybackState::Playing {
            log::debug!("stop() ignored while {}", self.state.as_str());
            return;
        }
        if let Some(control) = self.active_control() {
            lock_control(control).paused = true;
        }
        self.state = PlaybackState::Suspended;
        let position = self.unit.as_ref().map(|u| u.position_secs()).unwrap_or(0.0);
        self.logger
            .log_event(AudioEventType::PlaybackSuspended, format!("at {:.2}s", position));
    }

    fn eject(&mut self) {
        if !self.state.has_unit() {
            log::debug!("eject() ignored while {}", self.state.as_str());
            return;
        }
        self.release_unit();
        self.ring.clear();
        self.sampler.reset();
        self.state = PlaybackState::NotInitialized;
        self.logger.log_event(AudioEventType::Ejected, "");
        self.invalidate();
    }

    fn seek(&mut self, delta_secs: f64) {
        let Some(control) = self.active_control() else {
            return;
        };
        if !delta_secs.is_finite() {
            return;
        }

        let target = {
            let mut control = lock_control(control);
            let delta = (delta_secs * control.sample_rate as f64).round() as i64;
            let base = control.effective_position() as i64;
            let target = control.clamp_frame(base.saturating_add(delta));
            control.request_seek(target).then_some(target)
        };
        match target {
            Some(target) => self
                .logger
                .log_event(AudioEventType::Seek, format!("{:+.2}s -> frame {}", delta_secs, target)),
            None => log::debug!("seek() ignored: stream already drained"),
        }
    }

    fn seek_float(&mut self, ratio: f64) {
        let Some(control) = self.active_control() else {
            return;
        };
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };

        let target = {
            let mut control = lock_control(control);
            match control.length {
                Some(len) if len > 0 => {
                    let target = control.clamp_frame((ratio * len as f64) as i64);
                    control.request_seek(target).then_some(target)
                }
                _ => None,
            }
        };

        match target {
            Some(target) => self
                .logger
                .log_event(AudioEventType::Seek, format!("{:.3} -> frame {}", ratio, target)),
            None => log::debug!("seek_float() ignored: length unknown or stream drained"),
        }
    }

    fn forward(&mut self) {
        self.seek(self.config.seek_step_secs);
    }

    fn back(&mut self) {
        self.seek(-self.config.seek_step_secs);
    }

    fn set_volume(&mut self, level: f32) {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        self.volume = level;
        if let Some(control) = self.active_control() {
            lock_control(control).level = level;
        }
        self.logger
            .log_event(AudioEventType::VolumeChanged, format!("{:.2}", level));
    }

    fn progress_float(&self) -> f32 {
        self.active_control()
            .map(|control| lock_control(control).progress())
            .unwrap_or(0.0)
    }

    fn current_state(&self) -> PlaybackState {
        self.state
    }

    fn render_waveform(&mut self, width: usize, height: f32) -> Vec<WavePoint> {
        self.sampler.render(self.ring.as_ref(), width, height)
    }
}

impl<D: OutputDevice> Drop for AudioEngine<D> {
    fn drop(&mut self) {
        self.release_unit();
    }
}
