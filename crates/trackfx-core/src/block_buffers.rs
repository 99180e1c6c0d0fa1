//! Pre-allocated block buffers for real-time safe processing.
//!
//! This module provides the two buffer shapes the realtime path needs:
//!
//! - [`DelayLine`]: per-channel delay used by pass-through, so a bypassed
//!   effect still delays audio by its declared latency
//! - [`PingPongBuffers`]: two banks of per-channel scratch buffers used by an
//!   effect chain to feed one effect's output into the next
//!
//! # Pattern
//!
//! 1. Allocate once during setup (non-real-time)
//! 2. Reuse every block without allocation
//! 3. Borrow channel slices into fixed-size stack arrays
//!
//! # Real-Time Safety
//!
//! - `DelayLine::process()` is O(frames) with no allocation
//! - `PingPongBuffers::swap()` exchanges two `Vec`s (pointer swap)
//! - Slice arrays live on the stack, sized by [`MAX_CHANNELS`]

use crate::types::MAX_CHANNELS;

/// Fixed-length sample delay.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    position: usize,
}

impl DelayLine {
    /// Create a delay of `delay` frames, initially silent.
    pub fn new(delay: usize) -> Self {
        Self {
            buffer: vec![0.0; delay],
            position: 0,
        }
    }

    /// Delay length in frames.
    #[inline]
    pub fn delay(&self) -> usize {
        self.buffer.len()
    }

    /// Write `input` and read the delayed signal into `output`.
    ///
    /// Processes `min(input.len(), output.len())` frames.
    #[inline]
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let frames = input.len().min(output.len());
        if self.buffer.is_empty() {
            output[..frames].copy_from_slice(&input[..frames]);
            return;
        }
        let len = self.buffer.len();
        for (i, o) in input[..frames].iter().zip(output[..frames].iter_mut()) {
            *o = self.buffer[self.position];
            self.buffer[self.position] = *i;
            self.position += 1;
            if self.position == len {
                self.position = 0;
            }
        }
    }

    /// Record `input` without reading, keeping the history warm.
    #[inline]
    pub fn write(&mut self, input: &[f32]) {
        let len = self.buffer.len();
        if len == 0 {
            return;
        }
        for &sample in input {
            self.buffer[self.position] = sample;
            self.position += 1;
            if self.position == len {
                self.position = 0;
            }
        }
    }

    /// Silence the delay contents.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.position = 0;
    }
}

/// Two banks of per-channel scratch buffers.
pub struct PingPongBuffers {
    front: Vec<Vec<f32>>,
    back: Vec<Vec<f32>>,
    max_frames: usize,
}

impl PingPongBuffers {
    /// Allocate `channels` buffers of `max_frames` samples in each bank.
    ///
    /// Channel count is capped at [`MAX_CHANNELS`].
    pub fn allocate(channels: usize, max_frames: usize) -> Self {
        let channels = channels.min(MAX_CHANNELS);
        let bank = || -> Vec<Vec<f32>> { (0..channels).map(|_| vec![0.0; max_frames]).collect() };
        Self {
            front: bank(),
            back: bank(),
            max_frames,
        }
    }

    /// Channels per bank.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.front.len()
    }

    /// Frames per channel buffer.
    #[inline]
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Copy `input` into the front bank. Returns the frames copied.
    pub fn load(&mut self, input: &[&[f32]], frames: usize) -> usize {
        let frames = frames.min(self.max_frames);
        for (dst, src) in self.front.iter_mut().zip(input.iter()) {
            let n = frames.min(src.len());
            dst[..n].copy_from_slice(&src[..n]);
            dst[n..frames].fill(0.0);
        }
        frames
    }

    /// Copy the front bank into `output`.
    pub fn store(&self, output: &mut [&mut [f32]], frames: usize) {
        let frames = frames.min(self.max_frames);
        for (dst, src) in output.iter_mut().zip(self.front.iter()) {
            let n = frames.min(dst.len());
            dst[..n].copy_from_slice(&src[..n]);
        }
    }

    /// Borrow the front bank as input and the back bank as output.
    ///
    /// Returns how many channels are populated in each array.
    pub fn split<'a>(
        &'a mut self,
        frames: usize,
        inputs: &mut [&'a [f32]; MAX_CHANNELS],
        outputs: &mut [&'a mut [f32]; MAX_CHANNELS],
    ) -> usize {
        let frames = frames.min(self.max_frames);
        for (slot, buf) in inputs.iter_mut().zip(self.front.iter()) {
            *slot = &buf[..frames];
        }
        for (slot, buf) in outputs.iter_mut().zip(self.back.iter_mut()) {
            *slot = &mut buf[..frames];
        }
        self.front.len()
    }

    /// Make the back bank the new front bank.
    #[inline]
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Read-only view of a front-bank channel.
    pub fn front(&self, channel: usize) -> Option<&[f32]> {
        self.front.get(channel).map(|v| v.as_slice())
    }
}

/// Empty input slice array for [`PingPongBuffers::split`].
pub fn empty_inputs<'a>() -> [&'a [f32]; MAX_CHANNELS] {
    const EMPTY: &[f32] = &[];
    [EMPTY; MAX_CHANNELS]
}

/// Empty output slice array for [`PingPongBuffers::split`].
pub fn empty_outputs<'a>() -> [&'a mut [f32]; MAX_CHANNELS] {
    std::array::from_fn(|_| -> &'a mut [f32] { &mut [] })
}
