//! Capability traits of a per-track effect instance.
//!
//! A host drives effects through two small interfaces:
//!
//! - [`Processor`]: offline (batch) application over a whole track
//! - [`RealtimeProcessor`]: processing interleaved with live playback,
//!   one channel group at a time
//!
//! [`RealtimeEffect`] combines both into an object-safe trait so effect
//! chains can hold heterogeneous effects behind `Box<dyn RealtimeEffect>`.
//!
//! # Call Contexts
//!
//! | Method | Context |
//! |--------|---------|
//! | `process_initialize`, `realtime_initialize`, `realtime_add_processor` | control |
//! | `process_finalize`, `realtime_finalize`, `realtime_suspend`, `realtime_resume` | control |
//! | `process_block` | worker (offline) |
//! | `realtime_process`, `realtime_pass_through` | audio (deadline) |
//! | `latency`, `audio_in_count`, `audio_out_count` | any |

use std::sync::Arc;

use crate::channel_map::ChannelMap;
use crate::error::ProcessorResult;
use crate::groups::GroupId;
use crate::output_queue::EffectOutputs;
use crate::settings::EffectSettings;
use crate::types::SampleCount;

/// Offline block-streaming contract.
pub trait Processor {
    /// Bind the sample rate and create algorithm state for `channel_map`.
    ///
    /// On error the instance stays uninitialized, so retrying with corrected
    /// arguments is safe.
    fn process_initialize(
        &mut self,
        settings: &mut EffectSettings,
        sample_rate: f64,
        channel_map: &ChannelMap,
    ) -> ProcessorResult<()>;

    /// Process up to `block_len` frames from `input` into `output`.
    ///
    /// Never reads or writes past `block_len` or past any buffer's end.
    /// Returns the number of valid output frames, 0 when uninitialized.
    fn process_block(
        &mut self,
        settings: &mut EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        block_len: usize,
    ) -> usize;

    /// Release offline state. Returns `false` if nothing was initialized.
    fn process_finalize(&mut self) -> bool;

    /// Algorithmic delay in frames for `settings` at `sample_rate`.
    fn latency(&self, settings: &EffectSettings, sample_rate: f64) -> SampleCount;

    /// Input channel arity, fixed per instance.
    fn audio_in_count(&self) -> u32;

    /// Output channel arity, fixed per instance.
    fn audio_out_count(&self) -> u32;
}

/// Realtime processing contract.
///
/// Realtime methods never return errors: any fault on the audio path
/// degrades to pass-through.
pub trait RealtimeProcessor {
    /// Bind the sample rate and reserve group storage.
    fn realtime_initialize(
        &mut self,
        settings: &mut EffectSettings,
        sample_rate: f64,
    ) -> ProcessorResult<()>;

    /// Create a new channel-group sub-instance and return its identifier.
    ///
    /// Existing groups are not touched.
    fn realtime_add_processor(
        &mut self,
        settings: &mut EffectSettings,
        outputs: Option<Arc<EffectOutputs>>,
        num_channels: u32,
        sample_rate: f32,
    ) -> ProcessorResult<GroupId>;

    /// Detach one group. Returns `false` for an unknown or stale id.
    fn realtime_remove_processor(&mut self, group: GroupId) -> bool;

    /// Tear down every group. Valid from any state; terminal.
    fn realtime_finalize(&mut self, settings: &mut EffectSettings) -> bool;

    /// Stop processing (transport stop) while keeping every buffer.
    fn realtime_suspend(&mut self) -> bool;

    /// Re-arm a suspended instance without reallocating.
    fn realtime_resume(&mut self) -> bool;

    /// Process one group's block. Returns the frames produced.
    fn realtime_process(
        &mut self,
        group: GroupId,
        settings: &mut EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        num_samples: usize,
    ) -> usize;

    /// Forward one group's block, delayed by the group's latency.
    fn realtime_pass_through(
        &mut self,
        group: GroupId,
        settings: &mut EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        num_samples: usize,
    );

    /// Number of live groups.
    fn group_count(&self) -> usize;

    /// Identifiers of live groups, in slot order.
    fn group_ids(&self) -> Vec<GroupId>;
}

/// An effect usable in a realtime chain.
pub trait RealtimeEffect: Processor + RealtimeProcessor + Send {
    /// Fresh settings holding every parameter's default.
    fn default_settings(&self) -> EffectSettings;
}
