//! Pull-based transform graph between a decoder and the output device.
//!
//! Stages wrap each other by value:
//! `VisualizationTap<VolumeStage<Resample<PauseGate<Looper<DecoderStream>>>>>`.
//! Each one pulls from its inner stage synchronously on the audio thread; none
//! of them blocks or spawns threads. [`PlaybackGraph`] sits on top, applies the
//! shared control state between pulls and resolves the unit's completion.

pub mod looper;
pub mod pause;
pub mod tap;
pub mod volume;

pub use looper::{LoopCount, Looper};
pub use pause::PauseGate;
pub use tap::VisualizationTap;
pub use volume::{level_to_gain, VolumeStage};

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::audio::buffer::PcmRing;
use crate::audio::decoders::DecoderStream;
use crate::audio::resampler::Resample;
use crate::audio::AudioDecoder;
use crate::error::DecodeError;
use crate::models::AudioFormat;

/// A stream of interleaved f32 frames
pub trait SampleStream: Send {
    fn channels(&self) -> u16;

    /// Fill `out` with whole frames and return how many were written.
    /// Returning fewer than `out.len() / channels` means the stream is drained.
    fn stream(&mut self, out: &mut [f32]) -> usize;

    /// Terminal error that drained the stream, if any
    fn err(&self) -> Option<&DecodeError> {
        None
    }
}

/// A stream with a frame cursor in the source's native rate
pub trait SeekableStream: SampleStream {
    fn position(&self) -> u64;

    /// Total frames, `None` when unknown
    fn len(&self) -> Option<u64>;

    fn sample_rate(&self) -> u32;

    fn seek(&mut self, frame: u64) -> Result<u64, DecodeError>;
}

/// Concrete stage chain driven by the output device
pub type GraphChain = VisualizationTap<VolumeStage<Resample<PauseGate<Looper<DecoderStream>>>>>;

/// Wire a decoder into a full stage chain producing `output`
pub fn build_chain(
    decoder: Box<dyn AudioDecoder>,
    output: AudioFormat,
    loop_count: LoopCount,
    ring: Arc<dyn PcmRing>,
) -> GraphChain {
    let source_rate = decoder.format().sample_rate;
    let stream = DecoderStream::new(decoder, output.channels);
    let looped = Looper::new(stream, loop_count);
    let gated = PauseGate::new(looped);
    let resampled = Resample::new(gated, source_rate, output.sample_rate);
    let volume = VolumeStage::new(resampled, 1.0);
    VisualizationTap::new(volume, ring)
}

/// How a playback unit's stream ended
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Every pass was played
    Drained,
    /// A decode error ended playback early
    Failed(String),
    /// The graph was torn down before it drained
    Cancelled,
}

/// Control state shared between the transport and the audio thread.
///
/// The transport writes `paused`, `level` and `seek_request`; the graph writes
/// `position` after each pull. Neither side holds the lock across stage work.
#[derive(Debug, Clone)]
pub struct UnitControl {
    pub paused: bool,
    pub level: f32,
    /// Absolute source frame to jump to on the next pull
    pub seek_request: Option<u64>,
    pub position: u64,
    /// Set by the graph once the stream ran out
    pub drained: bool,
    pub length: Option<u64>,
    pub sample_rate: u32,
}

impl UnitControl {
    pub fn new(level: f32, length: Option<u64>, sample_rate: u32) -> Self {
        Self {
            paused: false,
            level: level.clamp(0.0, 1.0),
            seek_request: None,
            position: 0,
            drained: false,
            length,
            sample_rate,
        }
    }

    /// Position the transport should reason about: a pending seek wins over the last published one
    pub fn effective_position(&self) -> u64 {
        self.seek_request.unwrap_or(self.position)
    }

    /// Queue a jump to `frame`. A drained unit has nothing left to play and refuses it.
    pub fn request_seek(&mut self, frame: u64) -> bool {
        if self.drained {
            return false;
        }
        self.seek_request = Some(frame);
        true
    }

    /// Clamp an absolute frame into `0..=length-1`; unknown lengths only clamp at zero
    pub fn clamp_frame(&self, frame: i64) -> u64 {
        let frame = frame.max(0) as u64;
        match self.length {
            Some(len) if len > 0 => frame.min(len - 1),
            _ => frame,
        }
    }

    /// Playback progress in `0.0..=1.0`, zero when the length is unknown
    pub fn progress(&self) -> f32 {
        match self.length {
            Some(len) if len > 0 => (self.effective_position() as f64 / len as f64).clamp(0.0, 1.0) as f32,
            _ => 0.0,
        }
    }
}

pub type SharedControl = Arc<Mutex<UnitControl>>;

/// Lock the control state, recovering from a poisoned lock
pub fn lock_control(control: &SharedControl) -> MutexGuard<'_, UnitControl> {
    control.lock().unwrap_or_else(|e| e.into_inner())
}

/// The graph one output device pulls from
pub struct PlaybackGraph {
    chain: GraphChain,
    control: SharedControl,
    done: Option<oneshot::Sender<Completion>>,
    lead_in_frames: usize,
    finished: bool,
}

impl PlaybackGraph {
    pub fn new(
        chain: GraphChain,
        control: SharedControl,
        done: oneshot::Sender<Completion>,
        lead_in_frames: usize,
    ) -> Self {
        Self {
            chain,
            control,
            done: Some(done),
            lead_in_frames,
            finished: false,
        }
    }

    pub fn channels(&self) -> u16 {
        self.chain.channels()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fill the whole of `out`. Once the chain drains the remainder is silence.
    pub fn fill(&mut self, out: &mut [f32]) {
        let ch = self.channels().max(1) as usize;
        let frames = out.len() / ch;

        let (paused, level, seek) = {
            let mut control = lock_control(&self.control);
            (control.paused, control.level, control.seek_request.take())
        };

        if let Some(frame) = seek {
            if !self.finished {
                match self.chain.seek(frame) {
                    Ok(landed) => log::debug!("Seeked to frame {}", landed),
                    Err(e) => log::warn!("Seek to frame {} failed: {}", frame, e),
                }
            }
        }

        self.chain.inner_mut().set_level(level);
        self.chain.inner_mut().inner_mut().inner_mut().set_paused(paused);

        let mut written = 0;
        if self.lead_in_frames > 0 {
            let n = self.lead_in_frames.min(frames);
            out[..n * ch].fill(0.0);
            self.lead_in_frames -= n;
            written = n;
        }

        if !self.finished && written < frames {
            written += self.chain.stream(&mut out[written * ch..frames * ch]);
            if written < frames {
                self.finish();
            }
        }
        out[written * ch..].fill(0.0);

        let mut control = lock_control(&self.control);
        if control.seek_request.is_none() {
            control.position = self.chain.position();
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        {
            let mut control = lock_control(&self.control);
            control.drained = true;
            control.seek_request = None;
        }
        let completion = match self.chain.err() {
            Some(e) => Completion::Failed(e.user_message()),
            None => Completion::Drained,
        };
        log::debug!("Playback graph finished: {:?}", completion);
        if let Some(done) = self.done.take() {
            let _ = done.send(completion);
        }
    }
}

impl Drop for PlaybackGraph {
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(Completion::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::RingBuffer;
    use crate::audio::tests::fixtures::ScriptedDecoder;
    use tokio::sync::oneshot::error::TryRecvError;

    fn graph_for(
        decoder: ScriptedDecoder,
        lead_in: usize,
    ) -> (PlaybackGraph, SharedControl, oneshot::Receiver<Completion>, Arc<RingBuffer>) {
        let ring = Arc::new(RingBuffer::new(4096, 2));
        let length = decoder.frames();
        let rate = decoder.format_rate();
        let chain = build_chain(
            Box::new(decoder),
            AudioFormat::new(8000, 2),
            LoopCount::Times(0),
            ring.clone(),
        );
        let control = Arc::new(Mutex::new(UnitControl::new(1.0, length, rate)));
        let (tx, rx) = oneshot::channel();
        (PlaybackGraph::new(chain, control.clone(), tx, lead_in), control, rx, ring)
    }

    #[test]
    fn test_unit_control_clamps() {
        let control = UnitControl::new(1.5, Some(100), 8000);
        assert_eq!(control.level, 1.0);
        assert_eq!(control.clamp_frame(-20), 0);
        assert_eq!(control.clamp_frame(500), 99);

        let unknown = UnitControl::new(0.5, None, 8000);
        assert_eq!(unknown.clamp_frame(500), 500);
        assert_eq!(unknown.progress(), 0.0);
    }

    #[test]
    fn test_fill_publishes_position() {
        let decoder = ScriptedDecoder::new(AudioFormat::new(8000, 2), vec![400; 5]);
        let (mut graph, control, mut rx, _ring) = graph_for(decoder, 0);

        let mut out = vec![0.0; 500 * 2];
        graph.fill(&mut out);

        assert_eq!(lock_control(&control).position, 500);
        assert!((lock_control(&control).progress() - 0.25).abs() < 1e-6);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_completion_resolves_once() {
        let decoder = ScriptedDecoder::new(AudioFormat::new(8000, 2), vec![300]);
        let (mut graph, _control, rx, _ring) = graph_for(decoder, 0);

        let mut out = vec![1.0; 400 * 2];
        graph.fill(&mut out);
        assert!(graph.is_finished());
        assert!(out[300 * 2..].iter().all(|&s| s == 0.0));

        // Pulling after the end keeps producing silence
        let mut more = vec![1.0; 64];
        graph.fill(&mut more);
        assert!(more.iter().all(|&s| s == 0.0));
        drop(graph);

        let completion = tokio_test::block_on(rx).unwrap();
        assert_eq!(completion, Completion::Drained);
    }

    #[test]
    fn test_decode_error_completes_as_failed() {
        let decoder = ScriptedDecoder::new(AudioFormat::new(8000, 2), vec![100, 100]).fail_after(1);
        let (mut graph, _control, rx, _ring) = graph_for(decoder, 0);

        let mut out = vec![0.0; 1000];
        graph.fill(&mut out);

        match tokio_test::block_on(rx).unwrap() {
            Completion::Failed(message) => assert!(message.contains("WAV")),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_dropping_graph_cancels() {
        let decoder = ScriptedDecoder::new(AudioFormat::new(8000, 2), vec![100]);
        let (graph, _control, rx, _ring) = graph_for(decoder, 0);
        drop(graph);
        assert_eq!(tokio_test::block_on(rx).unwrap(), Completion::Cancelled);
    }

    #[test]
    fn test_lead_in_is_silent_and_does_not_advance() {
        let decoder = ScriptedDecoder::new(AudioFormat::new(8000, 2), vec![1000]).with_value(0.5);
        let (mut graph, control, _rx, _ring) = graph_for(decoder, 40);

        let mut out = vec![0.0; 100 * 2];
        graph.fill(&mut out);

        assert!(out[..40 * 2].iter().all(|&s| s == 0.0));
        assert!(out[40 * 2..].iter().all(|&s| s > 0.0));
        assert_eq!(lock_control(&control).position, 60);
    }

    #[test]
    fn test_seek_request_is_applied_on_next_pull() {
        let decoder = ScriptedDecoder::new(AudioFormat::new(8000, 2), vec![1000; 4]);
        let (mut graph, control, _rx, _ring) = graph_for(decoder, 0);

        lock_control(&control).seek_request = Some(2500);
        let mut out = vec![0.0; 100 * 2];
        graph.fill(&mut out);

        let control = lock_control(&control);
        assert_eq!(control.seek_request, None);
        assert_eq!(control.position, 2600);
    }

    #[test]
    fn test_drained_graph_refuses_seeks() {
        let decoder = ScriptedDecoder::new(AudioFormat::new(8000, 2), vec![100]);
        let (mut graph, control, _rx, _ring) = graph_for(decoder, 0);

        let mut out = vec![0.0; 200 * 2];
        graph.fill(&mut out);
        assert!(graph.is_finished());

        let mut control = lock_control(&control);
        assert!(control.drained);
        assert!(!control.request_seek(50));
        assert_eq!(control.seek_request, None);
        assert_eq!(control.effective_position(), control.position);
    }

    #[test]
    fn test_pause_freezes_position_and_writes_silence() {
        let decoder = ScriptedDecoder::new(AudioFormat::new(8000, 2), vec![1000; 4]).with_value(0.5);
        let (mut graph, control, _rx, ring) = graph_for(decoder, 0);

        let mut out = vec![0.0; 200 * 2];
        graph.fill(&mut out);
        lock_control(&control).paused = true;
        graph.fill(&mut out);
        graph.fill(&mut out);

        assert_eq!(lock_control(&control).position, 200);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(ring.read_window(100).iter().all(|&s| s == 0));
    }
}
