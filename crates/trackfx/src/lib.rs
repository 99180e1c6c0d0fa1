//! # trackfx
//!
//! Per-track audio effect processing for Rust.
//!
//! trackfx drives a DSP kernel through a uniform block-streaming contract,
//! both for offline application over a whole track and for realtime
//! processing interleaved with playback.
//!
//! ## Architecture
//!
//! ```text
//! Your DSP (implements Kernel)
//!        ↓
//! PerTrackInstance<K> (Processor + RealtimeProcessor)
//!        ↓
//! ChainController (control thread)  ──rtrb──▶  ChainRenderer (audio thread)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trackfx::prelude::*;
//!
//! let (mut controller, mut renderer) = effect_chain(ChainConfig::new().with_sample_rate(48_000.0))?;
//!
//! let effect = Box::new(PerTrackInstance::<Compressor>::default());
//! let settings = effect.default_settings();
//! let id = controller.append(effect, settings)?;
//!
//! // Audio callback
//! renderer.begin_block();
//! renderer.process(0, &[left_in, right_in], &mut [left_out, right_out], frames);
//! ```

// Re-export sub-crates
pub use trackfx_core as core;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use trackfx::prelude::*;
/// ```
pub mod prelude {
    pub use trackfx_core::{
        // Contracts
        Kernel, KernelFault, KernelSetup, Measurement, Processor, RealtimeEffect,
        RealtimeProcessor,
        // Instance
        GroupId, GroupState, LifecycleState, PerTrackInstance, PreparedGroup,
        // Settings
        EffectSettings, ParameterSpec, SharedSettings,
        // Channels
        ChannelMap, ChannelName,
        // Outputs and events
        EffectOutputs, InitializeProcessingSettings, InstanceEvent, OutputPacket,
        OutputPacketQueue, OutputQueueHandle, Subscription,
        // Chain
        effect_chain, ChainController, ChainRenderer, EffectId,
        // Configuration
        ChainConfig, InstanceConfig,
        // Errors
        ProcessorError, ProcessorResult,
        // Types
        ParameterId, ParameterValue, ProcessMode, SampleCount,
    };

    #[cfg(feature = "compressor")]
    pub use trackfx_core::compressor::{self, Compressor};
}
