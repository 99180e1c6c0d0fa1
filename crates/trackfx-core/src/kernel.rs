//! The DSP kernel: the external algorithm behind a per-track instance.
//!
//! A [`Kernel`] owns the algorithm state for one set of channels processed
//! together. The instance creates one kernel for offline processing and one
//! per realtime group, and drives them through the block contract below.
//!
//! # Contract
//!
//! - `create()` runs in a non-realtime context and may allocate
//! - `process()` and `pass_through()` run on the audio thread: no locks, no
//!   allocation, no I/O
//! - `latency()` is a pure function of its arguments
//!
//! # Example
//!
//! ```ignore
//! struct Invert;
//!
//! impl Kernel for Invert {
//!     fn parameters() -> &'static [ParameterSpec] { &[] }
//!     fn create(_: &KernelSetup, _: &EffectSettings) -> ProcessorResult<Self> { Ok(Invert) }
//!     fn process(&mut self, _: &EffectSettings, input: &[&[f32]], output: &mut [&mut [f32]], frames: usize)
//!         -> Result<usize, KernelFault>
//!     {
//!         for (i, o) in input.iter().zip(output.iter_mut()) {
//!             for n in 0..frames { o[n] = -i[n]; }
//!         }
//!         Ok(frames)
//!     }
//! }
//! ```

use crate::error::ProcessorResult;
use crate::settings::{EffectSettings, ParameterSpec};
use crate::types::{ProcessMode, SampleCount};

/// Everything a kernel needs to size its state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelSetup {
    /// Channels processed together by this kernel.
    pub channels: usize,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Largest block the host intends to pass (a sizing hint).
    pub max_block_size: usize,
    /// Offline or realtime use.
    pub mode: ProcessMode,
}

/// Per-block metrics reported by a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// Gain reduction requested by the static curve, in dB.
    pub target_compression_db: f32,
    /// Gain reduction applied after smoothing, in dB.
    pub actual_compression_db: f32,
    /// Peak input level, in dBFS.
    pub input_db: f32,
    /// Peak output level, in dBFS.
    pub output_db: f32,
}

/// Fault raised by a kernel during realtime processing.
///
/// The instance reacts by passing audio through unprocessed; it never
/// propagates the fault to the audio callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelFault {
    /// Buffers do not match the channel count the kernel was created for.
    ChannelMismatch { expected: usize, actual: usize },
    /// Internal state became invalid (non-finite values, etc.).
    InvalidState,
}

/// DSP algorithm driven by a per-track instance.
pub trait Kernel: Send + Sized + 'static {
    /// Parameters this kernel reads from [`EffectSettings`].
    fn parameters() -> &'static [ParameterSpec];

    /// Settings holding every parameter's default.
    fn default_settings() -> EffectSettings {
        EffectSettings::from_specs(Self::parameters())
    }

    /// Create kernel state for `setup`.
    fn create(setup: &KernelSetup, settings: &EffectSettings) -> ProcessorResult<Self>;

    /// Algorithmic delay in frames for these settings and rate.
    fn latency(_settings: &EffectSettings, _sample_rate: f64) -> SampleCount {
        0
    }

    /// Process `frames` frames from `input` into `output`.
    ///
    /// Both slices hold one buffer per channel, each at least `frames` long.
    /// Returns the number of valid output frames.
    fn process(
        &mut self,
        settings: &EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        frames: usize,
    ) -> Result<usize, KernelFault>;

    /// Observe input while bypassed, so state is warm when re-enabled.
    fn pass_through(&mut self, _settings: &EffectSettings, _input: &[&[f32]], _frames: usize) {}

    /// Clear internal history (transport jumps).
    fn reset(&mut self) {}

    /// Metrics of the last processed block, if the kernel meters.
    fn measurement(&self) -> Option<Measurement> {
        None
    }
}
