//! Channel maps supplied by the track model at initialization.
//!
//! A [`ChannelMap`] names the channels a track feeds into an effect, in
//! buffer order. The processor only uses it to size kernel state and to
//! validate against the instance's fixed channel arity.

use serde::{Deserialize, Serialize};

use crate::error::{ProcessorError, ProcessorResult};
use crate::types::MAX_CHANNELS;

/// Name of a single channel position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelName {
    /// Single channel of a mono track.
    #[default]
    Mono,
    FrontLeft,
    FrontRight,
    FrontCenter,
    LowFrequency,
    BackLeft,
    BackRight,
    SideLeft,
    SideRight,
    /// Channel without positional meaning.
    Discrete(u16),
}

/// Ordered channel layout of a track.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    channels: Vec<ChannelName>,
}

impl ChannelMap {
    /// Create a channel map from explicit channel names.
    pub fn new(channels: Vec<ChannelName>) -> Self {
        Self { channels }
    }

    /// Single mono channel.
    pub fn mono() -> Self {
        Self::new(vec![ChannelName::Mono])
    }

    /// Left/right pair.
    pub fn stereo() -> Self {
        Self::new(vec![ChannelName::FrontLeft, ChannelName::FrontRight])
    }

    /// `count` channels without positional meaning.
    pub fn discrete(count: u16) -> Self {
        Self::new((0..count).map(ChannelName::Discrete).collect())
    }

    /// Number of channels in the map.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Whether the map has no channels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channel names in buffer order.
    pub fn channels(&self) -> &[ChannelName] {
        &self.channels
    }

    /// Validate the map against an instance arity.
    ///
    /// Checks that:
    /// - The map has at least one channel
    /// - The channel count fits both `max_channels` and [`MAX_CHANNELS`]
    pub fn validate(&self, max_channels: usize) -> ProcessorResult<()> {
        if self.channels.is_empty() {
            return Err(ProcessorError::EmptyChannelMap);
        }
        let max = max_channels.min(MAX_CHANNELS);
        if self.channels.len() > max {
            return Err(ProcessorError::InvalidChannelCount {
                requested: self.channels.len(),
                max,
            });
        }
        Ok(())
    }
}
