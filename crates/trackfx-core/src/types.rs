//! Core type aliases and limits shared across the crate.

/// Maximum number of channels a single channel map or group may carry.
pub const MAX_CHANNELS: usize = 32;

/// Highest sample rate accepted by initialization paths.
pub const MAX_SAMPLE_RATE: f64 = 768_000.0;

/// Default upper bound on frames per processing call.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 4096;

/// Parameter identifier inside [`EffectSettings`](crate::EffectSettings).
pub type ParameterId = u32;

/// Plain parameter value in natural units (dB, ms, ratio, ...).
pub type ParameterValue = f64;

/// Sample position or duration, in frames.
pub type SampleCount = u64;

/// Processing mode the instance was initialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessMode {
    /// Batch application of an effect over a whole track.
    #[default]
    Offline,
    /// Processing interleaved with live playback under a per-buffer deadline.
    Realtime,
}

/// Check that a sample rate is usable for initialization.
pub(crate) fn is_valid_sample_rate(sample_rate: f64) -> bool {
    sample_rate.is_finite() && sample_rate > 0.0 && sample_rate <= MAX_SAMPLE_RATE
}
