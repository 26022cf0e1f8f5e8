use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Recent-PCM store fed by the visualization tap and read by the waveform sampler.
///
/// There is one writer (the audio thread) and any number of readers. Readers
/// are not synchronized with the writer: a window read during a write may mix
/// old and new bytes. That is acceptable for a visual-only feature; a stricter
/// implementation can be swapped in behind this trait.
pub trait PcmRing: Send + Sync {
    /// Append little-endian 16-bit interleaved PCM, overwriting the oldest data
    fn write(&self, bytes: &[u8]);

    /// The most recent `frames` frames as interleaved samples, oldest first.
    /// Regions never written read as zero.
    fn read_window(&self, frames: usize) -> Vec<i16>;

    /// Zero the contents and rewind the write cursor
    fn clear(&self);

    /// Capacity in bytes
    fn capacity(&self) -> usize;

    /// Bytes per interleaved 16-bit frame
    fn frame_size(&self) -> usize;

    fn channels(&self) -> u16 {
        (self.frame_size() / 2).max(1) as u16
    }

    /// Capacity in whole frames
    fn capacity_frames(&self) -> usize {
        self.capacity() / self.frame_size().max(1)
    }
}

/// Fixed-capacity circular byte buffer.
///
/// Bytes are stored as relaxed atomics so the unsynchronized reader never
/// races in the memory-model sense; it can only observe a torn window.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Box<[AtomicU8]>,
    write_pos: AtomicUsize,
    channels: u16,
}

impl RingBuffer {
    /// Create a ring of `capacity_bytes`, rounded down to whole frames
    pub fn new(capacity_bytes: usize, channels: u16) -> Self {
        let channels = channels.max(1);
        let frame_size = channels as usize * 2;
        let capacity = (capacity_bytes / frame_size).max(1) * frame_size;
        Self {
            buffer: (0..capacity).map(|_| AtomicU8::new(0)).collect(),
            write_pos: AtomicUsize::new(0),
            channels,
        }
    }

    /// Current write cursor in bytes
    pub fn write_position(&self) -> usize {
        self.write_pos.load(Ordering::Acquire)
    }

    /// Whether every stored byte is zero
    pub fn is_silent(&self) -> bool {
        self.buffer.iter().all(|b| b.load(Ordering::Relaxed) == 0)
    }

    fn copy_in(&self, start: usize, bytes: &[u8]) {
        for (slot, &byte) in self.buffer[start..start + bytes.len()].iter().zip(bytes) {
            slot.store(byte, Ordering::Relaxed);
        }
    }
}

impl PcmRing for RingBuffer {
    fn write(&self, bytes: &[u8]) {
        let capacity = self.buffer.len();
        if bytes.is_empty() {
            return;
        }

        // Only the tail survives a write larger than the ring
        let bytes = if bytes.len() > capacity {
            &bytes[bytes.len() - capacity..]
        } else {
            bytes
        };

        let write_pos = self.write_pos.load(Ordering::Acquire);
        let end_space = capacity - write_pos;
        if bytes.len() <= end_space {
            self.copy_in(write_pos, bytes);
        } else {
            let (head, tail) = bytes.split_at(end_space);
            self.copy_in(write_pos, head);
            self.copy_in(0, tail);
        }

        self.write_pos
            .store((write_pos + bytes.len()) % capacity, Ordering::Release);
    }

    fn read_window(&self, frames: usize) -> Vec<i16> {
        let capacity = self.buffer.len();
        let frame_size = self.frame_size();
        let frames = frames.min(capacity / frame_size);
        let len = frames * frame_size;

        let write_pos = self.write_pos.load(Ordering::Acquire);
        let start = (write_pos + capacity - len) % capacity;

        let mut samples = Vec::with_capacity(len / 2);
        for i in (0..len).step_by(2) {
            let lo = self.buffer[(start + i) % capacity].load(Ordering::Relaxed);
            let hi = self.buffer[(start + i + 1) % capacity].load(Ordering::Relaxed);
            samples.push(i16::from_le_bytes([lo, hi]));
        }
        samples
    }

    fn clear(&self) {
        for byte in self.buffer.iter() {
            byte.store(0, Ordering::Relaxed);
        }
        self.write_pos.store(0, Ordering::Release);
    }

    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    fn frame_size(&self) -> usize {
        self.channels as usize * 2
    }
}
