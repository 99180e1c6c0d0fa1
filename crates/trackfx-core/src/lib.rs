//! Core abstractions for per-track offline and realtime effect processing.
//!
//! This crate provides the block-streaming contract of a per-track effect
//! instance, independent of any host or plugin format:
//!
//! - [`Processor`] / [`RealtimeProcessor`]: offline and realtime lifecycles
//! - [`Kernel`]: the DSP algorithm behind an instance
//! - [`PerTrackInstance`]: adapts a kernel to both contracts, with one
//!   independent kernel per realtime channel group
//! - [`SharedSettings`]: lock-free settings exchange with the audio thread
//! - [`OutputPacketQueue`] / [`OutputQueueHandle`]: weakly referenced
//!   per-block metric sink
//! - [`effect_chain`]: ordered realtime effect list split into a control
//!   half and an audio half

pub mod block_buffers;
pub mod chain;
pub mod channel_map;
#[cfg(feature = "compressor")]
pub mod compressor;
pub mod config;
pub mod error;
pub mod events;
pub mod groups;
pub mod instance;
pub mod kernel;
pub mod lifecycle;
pub mod output_queue;
pub mod processor;
pub mod settings;
pub mod shared_settings;
pub mod types;

#[cfg(test)]
mod testing;

pub use block_buffers::{DelayLine, PingPongBuffers};
pub use chain::{effect_chain, ChainController, ChainRenderer, EffectId};
pub use channel_map::{ChannelMap, ChannelName};
#[cfg(feature = "compressor")]
pub use compressor::Compressor;
pub use config::{ChainConfig, InstanceConfig};
pub use error::{ProcessorError, ProcessorResult};
pub use events::{
    EventPublisher, InitializeProcessingSettings, InstanceEvent, Subscription,
    DEFAULT_EVENT_CAPACITY,
};
pub use groups::{GroupId, GroupTable};
pub use instance::{PerTrackInstance, PreparedGroup};
pub use kernel::{Kernel, KernelFault, KernelSetup, Measurement};
pub use lifecycle::{GroupState, LifecycleState};
pub use output_queue::{
    EffectOutputs, OutputPacket, OutputPacketQueue, OutputQueueHandle, PushOutcome,
    DEFAULT_PACKET_CAPACITY,
};
pub use processor::{Processor, RealtimeEffect, RealtimeProcessor};
pub use settings::{EffectSettings, ParameterSlot, ParameterSpec};
pub use shared_settings::{SharedSettings, MAX_SHARED_PARAMETERS};
pub use types::{
    ParameterId, ParameterValue, ProcessMode, SampleCount, DEFAULT_MAX_BLOCK_SIZE, MAX_CHANNELS,
    MAX_SAMPLE_RATE,
};
