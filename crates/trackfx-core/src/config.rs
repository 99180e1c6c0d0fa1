//! Instance and chain configuration.
//!
//! Both configurations are plain values built with `const fn` setters, so
//! they can live in statics, and both deserialize from JSON for hosts that
//! keep them in a settings file.
//!
//! # Example
//!
//! ```ignore
//! use trackfx_core::{ChainConfig, InstanceConfig};
//!
//! pub static INSTANCE: InstanceConfig = InstanceConfig::new()
//!     .with_audio_channels(2)
//!     .with_max_groups(8);
//!
//! let chain = ChainConfig::from_json(r#"{ "sample_rate": 48000.0, "group_channels": 1 }"#)?;
//! ```

use serde::Deserialize;

use crate::error::{ProcessorError, ProcessorResult};
use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::types::{is_valid_sample_rate, DEFAULT_MAX_BLOCK_SIZE, MAX_CHANNELS};

// =========================================================================
// InstanceConfig
// =========================================================================

/// Configuration of one per-track effect instance.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// Input and output channel arity reported to the host.
    pub audio_channels: usize,
    /// Realtime groups reserved at `realtime_initialize`.
    pub max_groups: usize,
    /// Events buffered per subscriber.
    pub event_capacity: usize,
    /// Block size hint handed to kernels.
    pub max_block_size: usize,
}

impl InstanceConfig {
    /// Stereo instance with room for 16 groups.
    pub const fn new() -> Self {
        Self {
            audio_channels: 2,
            max_groups: 16,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
        }
    }

    /// Set the channel arity.
    pub const fn with_audio_channels(mut self, channels: usize) -> Self {
        self.audio_channels = channels;
        self
    }

    /// Set how many realtime groups are reserved.
    pub const fn with_max_groups(mut self, groups: usize) -> Self {
        self.max_groups = groups;
        self
    }

    /// Set the per-subscriber event capacity.
    pub const fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Set the block size hint.
    pub const fn with_max_block_size(mut self, frames: usize) -> Self {
        self.max_block_size = frames;
        self
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> ProcessorResult<()> {
        if self.audio_channels == 0 || self.audio_channels > MAX_CHANNELS {
            return Err(ProcessorError::InvalidChannelCount {
                requested: self.audio_channels,
                max: MAX_CHANNELS,
            });
        }
        if self.max_groups == 0 {
            return Err(ProcessorError::InvalidConfig(
                "max_groups must be at least 1".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ProcessorError::InvalidConfig(
                "event_capacity must be at least 1".into(),
            ));
        }
        if self.max_block_size == 0 {
            return Err(ProcessorError::InvalidConfig(
                "max_block_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields keep defaults.
    pub fn from_json(json: &str) -> ProcessorResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// ChainConfig
// =========================================================================

/// Configuration of a per-track realtime effect chain.
///
/// A track is split into `group_count` channel groups of `group_channels`
/// channels each (one stereo group, two mono groups, ...). Every effect in
/// the chain gets one realtime group per channel group.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Sample rate of the track in Hz.
    pub sample_rate: f64,
    /// Channel groups per track.
    pub group_count: usize,
    /// Channels per group.
    pub group_channels: usize,
    /// Effects the chain can hold without reallocating.
    pub max_effects: usize,
    /// Largest block processed in one call; longer blocks are truncated.
    pub max_block_size: usize,
    /// Pending structure changes the command ring can hold.
    pub command_capacity: usize,
}

impl ChainConfig {
    /// One stereo group at 44.1 kHz.
    pub const fn new() -> Self {
        Self {
            sample_rate: 44_100.0,
            group_count: 1,
            group_channels: 2,
            max_effects: 16,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            command_capacity: 64,
        }
    }

    /// Set the sample rate.
    pub const fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the channel group layout.
    pub const fn with_groups(mut self, group_count: usize, group_channels: usize) -> Self {
        self.group_count = group_count;
        self.group_channels = group_channels;
        self
    }

    /// Set the effect capacity.
    pub const fn with_max_effects(mut self, max_effects: usize) -> Self {
        self.max_effects = max_effects;
        self
    }

    /// Set the largest block size.
    pub const fn with_max_block_size(mut self, frames: usize) -> Self {
        self.max_block_size = frames;
        self
    }

    /// Set the command ring capacity.
    pub const fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> ProcessorResult<()> {
        if !is_valid_sample_rate(self.sample_rate) {
            return Err(ProcessorError::InvalidSampleRate(self.sample_rate));
        }
        if self.group_channels == 0 || self.group_channels > MAX_CHANNELS {
            return Err(ProcessorError::InvalidChannelCount {
                requested: self.group_channels,
                max: MAX_CHANNELS,
            });
        }
        if self.group_count == 0 {
            return Err(ProcessorError::InvalidConfig(
                "group_count must be at least 1".into(),
            ));
        }
        if self.max_effects == 0 || self.max_block_size == 0 || self.command_capacity == 0 {
            return Err(ProcessorError::InvalidConfig(
                "capacities must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields keep defaults.
    pub fn from_json(json: &str) -> ProcessorResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new()
    }
}
