use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleFormat, SampleRate, Stream, StreamConfig};

use crate::audio::graph::PlaybackGraph;
use crate::error::AudioError;
use crate::models::AudioFormat;

/// Sink that pulls from one playback graph at a time.
///
/// `open` takes ownership of the graph, so a second graph can only be
/// attached after the first was dropped by `close` or a later `open`.
pub trait OutputDevice {
    fn open(&mut self, format: AudioFormat, graph: PlaybackGraph) -> Result<(), AudioError>;

    /// Stop pulling and drop the graph. Closing an idle device is a no-op.
    fn close(&mut self) -> Result<(), AudioError>;

    fn is_open(&self) -> bool;
}

/// Hardware output through cpal
pub struct CpalOutput {
    host: Host,
    preferred_device: Option<String>,
    stream: Option<Stream>,
}

impl CpalOutput {
    pub fn new(preferred_device: Option<String>) -> Self {
        Self {
            host: cpal::default_host(),
            preferred_device,
            stream: None,
        }
    }

    /// Names of the available output devices
    pub fn list_devices(&self) -> Result<Vec<String>, AudioError> {
        let devices = self
            .host
            .output_devices()
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to enumerate devices: {}", e)))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    /// The preferred device when present, otherwise the host default
    fn select_device(&self) -> Result<Device, AudioError> {
        if let Some(name) = &self.preferred_device {
            let devices = self
                .host
                .output_devices()
                .map_err(|e| AudioError::InitializationFailed(format!("Failed to enumerate devices: {}", e)))?;
            for device in devices {
                if device.name().map(|n| &n == name).unwrap_or(false) {
                    return Ok(device);
                }
            }
            log::warn!("Output device '{}' not found, using the default device", name);
        }

        self.host.default_output_device().ok_or_else(|| AudioError::DeviceNotFound {
            device: "default output".to_string(),
        })
    }

    /// Pick a sample format the device accepts at `format`, preferring f32
    fn negotiate_sample_format(device: &Device, format: AudioFormat) -> Result<SampleFormat, AudioError> {
        let supported = device
            .supported_output_configs()
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to query device configs: {}", e)))?;

        let mut candidates: Vec<SampleFormat> = supported
            .filter(|range| {
                range.channels() == format.channels
                    && range.min_sample_rate().0 <= format.sample_rate
                    && range.max_sample_rate().0 >= format.sample_rate
            })
            .map(|range| range.sample_format())
            .filter(|f| matches!(f, SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16))
            .collect();
        candidates.sort_by_key(|f| match f {
            SampleFormat::F32 => 0,
            SampleFormat::I16 => 1,
            _ => 2,
        });

        candidates.first().copied().ok_or(AudioError::UnsupportedConfig {
            sample_rate: format.sample_rate,
            channels: format.channels,
        })
    }

    /// Create a typed audio stream
    fn create_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut graph: PlaybackGraph,
    ) -> Result<Stream, AudioError>
    where
        T: cpal::Sample + cpal::SizedSample + Send + 'static,
        T: cpal::FromSample<f32>,
    {
        let mut scratch: Vec<f32> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    graph.fill(&mut scratch);
                    for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                        *out = cpal::Sample::from_sample(sample);
                    }
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(format!("Failed to build output stream: {}", e)))
    }
}

impl OutputDevice for CpalOutput {
    fn open(&mut self, format: AudioFormat, graph: PlaybackGraph) -> Result<(), AudioError> {
        self.close()?;

        let device = self.select_device()?;
        let sample_format = Self::negotiate_sample_format(&device, format)?;
        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match sample_format {
            SampleFormat::F32 => Self::create_stream::<f32>(&device, &config, graph)?,
            SampleFormat::I16 => Self::create_stream::<i16>(&device, &config, graph)?,
            SampleFormat::U16 => Self::create_stream::<u16>(&device, &config, graph)?,
            other => {
                return Err(AudioError::InitializationFailed(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::StreamError(format!("Failed to start output stream: {}", e)))?;

        log::info!(
            "Opened output device '{}' ({}, {:?})",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            format.format_description(),
            sample_format
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioError> {
        if let Some(stream) = self.stream.take() {
            // Dropping the stream stops the callback and drops the graph
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause output stream before closing: {}", e);
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

type GraphSlot = Arc<Mutex<Option<PlaybackGraph>>>;

/// Output driven by its caller instead of a hardware clock.
///
/// The device half goes to the engine; the [`PulledOutputHandle`] pulls
/// rendered audio on whatever thread owns it. Used for offline rendering
/// and deterministic tests.
pub struct PulledOutput {
    slot: GraphSlot,
    fail_next_open: Arc<AtomicBool>,
}

/// Caller side of a [`PulledOutput`]
#[derive(Clone)]
pub struct PulledOutputHandle {
    slot: GraphSlot,
    fail_next_open: Arc<AtomicBool>,
    channels: u16,
}

impl PulledOutput {
    pub fn new(format: AudioFormat) -> (Self, PulledOutputHandle) {
        let slot: GraphSlot = Arc::new(Mutex::new(None));
        let fail_next_open = Arc::new(AtomicBool::new(false));
        let handle = PulledOutputHandle {
            slot: Arc::clone(&slot),
            fail_next_open: Arc::clone(&fail_next_open),
            channels: format.channels.max(1),
        };
        (Self { slot, fail_next_open }, handle)
    }
}

impl OutputDevice for PulledOutput {
    fn open(&mut self, format: AudioFormat, graph: PlaybackGraph) -> Result<(), AudioError> {
        if self.fail_next_open.swap(false, Ordering::AcqRel) {
            return Err(AudioError::InitializationFailed("output device unavailable".to_string()));
        }
        if graph.channels() != format.channels {
            return Err(AudioError::UnsupportedConfig {
                sample_rate: format.sample_rate,
                channels: format.channels,
            });
        }
        let previous = self
            .slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(graph);
        drop(previous);
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioError> {
        let previous = self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(previous);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl PulledOutputHandle {
    /// Render `frames` interleaved frames; silence while no graph is attached
    pub fn pull(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * self.channels as usize];
        if let Some(graph) = self.slot.lock().unwrap_or_else(|e| e.into_inner()).as_mut() {
            graph.fill(&mut out);
        }
        out
    }

    /// Pull `duration` of audio at `sample_rate` in `chunk_frames` sized callbacks,
    /// the way a hardware device would
    pub fn pull_for(&self, duration: Duration, sample_rate: u32, chunk_frames: usize) -> Vec<f32> {
        let total = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
        let chunk_frames = chunk_frames.max(1);
        let mut rendered = Vec::with_capacity(total * self.channels as usize);
        let mut done = 0;
        while done < total {
            let n = chunk_frames.min(total - done);
            rendered.extend(self.pull(n));
            done += n;
        }
        rendered
    }

    pub fn is_open(&self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Make the next `open` fail like an unavailable device
    pub fn fail_next_open(&self) {
        self.fail_next_open.store(true, Ordering::Release);
    }
}
