//! Per-track effect instance: lifecycle and block streaming over a [`Kernel`].
//!
//! [`PerTrackInstance`] adapts a stateful DSP kernel to the [`Processor`] and
//! [`RealtimeProcessor`] contracts. It owns:
//!
//! - an optional offline kernel, created by `process_initialize`
//! - a [`GroupTable`] of realtime groups, one independent kernel per channel
//!   group, created by `realtime_add_processor`
//! - a weak [`OutputQueueHandle`] for per-block output packets
//! - an [`EventPublisher`] for processing-settings and resume notifications
//!
//! # Realtime Path
//!
//! `realtime_process()` and `realtime_pass_through()` never allocate, never
//! lock and never log. Every abnormal condition (unknown group, suspended
//! instance, inactive settings, kernel fault) is answered by forwarding the
//! input delayed by the group's latency, so timing stays aligned with the
//! processed path. Each group keeps its delay lines fed while processing,
//! which makes switching between the two paths seamless.
//!
//! # Adding Groups While Audio Runs
//!
//! Group creation is split in two: [`PerTrackInstance::prepare_group`]
//! allocates kernel state on the control context, and
//! [`PerTrackInstance::attach_group`] inserts it into storage reserved at
//! `realtime_initialize`. Both take the instance by reference, so a group can
//! never appear in the middle of a `realtime_process` call.

use std::sync::Arc;

use crate::block_buffers::DelayLine;
use crate::channel_map::ChannelMap;
use crate::config::InstanceConfig;
use crate::error::{ProcessorError, ProcessorResult};
use crate::events::{EventPublisher, InitializeProcessingSettings, InstanceEvent, Subscription};
use crate::groups::{GroupId, GroupTable};
use crate::kernel::{Kernel, KernelSetup};
use crate::lifecycle::{GroupState, LifecycleState};
use crate::output_queue::{EffectOutputs, OutputPacket, OutputQueueHandle};
use crate::processor::{Processor, RealtimeEffect, RealtimeProcessor};
use crate::settings::EffectSettings;
use crate::types::{is_valid_sample_rate, ProcessMode, SampleCount};

/// Offline kernel bound by `process_initialize`.
struct OfflineState<K> {
    kernel: K,
    channels: usize,
    sample_rate: f64,
    delays: Vec<DelayLine>,
    sample_counter: SampleCount,
}

impl<K> OfflineState<K> {
    /// Forward input delayed by the kernel latency.
    fn pass_through(&mut self, input: &[&[f32]], output: &mut [&mut [f32]], frames: usize) {
        for ((line, i), o) in self.delays.iter_mut().zip(input).zip(output.iter_mut()) {
            line.process(&i[..frames], &mut o[..frames]);
        }
        copy_remaining(input, output, self.delays.len(), frames);
    }
}

/// One realtime channel group.
struct RealtimeGroup<K> {
    kernel: K,
    state: GroupState,
    channels: usize,
    latency: SampleCount,
    delays: Vec<DelayLine>,
    outputs: Option<Arc<EffectOutputs>>,
    sample_counter: SampleCount,
}

impl<K: Kernel> RealtimeGroup<K> {
    /// Forward input delayed by the group latency and let the kernel observe it.
    fn pass_through(
        &mut self,
        settings: &EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        frames: usize,
    ) {
        let observed = self.channels.min(input.len());
        self.kernel.pass_through(settings, &input[..observed], frames);
        for ((line, i), o) in self.delays.iter_mut().zip(input).zip(output.iter_mut()) {
            line.process(&i[..frames], &mut o[..frames]);
        }
        copy_remaining(input, output, self.delays.len(), frames);
        self.sample_counter += frames as SampleCount;
    }

    /// Push the kernel's latest measurement to the meters and the queue.
    fn report(&self, queue: &OutputQueueHandle) {
        if let Some(measurement) = self.kernel.measurement() {
            if let Some(outputs) = &self.outputs {
                outputs.update(&measurement);
            }
            queue.push(OutputPacket::from_measurement(
                self.sample_counter,
                &measurement,
            ));
        }
    }
}

/// A realtime group created on the control context, not yet attached.
pub struct PreparedGroup<K: Kernel> {
    group: RealtimeGroup<K>,
}

impl<K: Kernel> PreparedGroup<K> {
    /// Channels the group processes.
    pub fn channels(&self) -> usize {
        self.group.channels
    }

    /// Latency of the group in frames.
    pub fn latency(&self) -> SampleCount {
        self.group.latency
    }
}

/// Effect instance bound to the channels of one track.
pub struct PerTrackInstance<K: Kernel> {
    config: InstanceConfig,
    offline: Option<OfflineState<K>>,
    offline_state: LifecycleState,
    realtime_state: LifecycleState,
    realtime_rate: Option<f64>,
    suspended: bool,
    groups: GroupTable<RealtimeGroup<K>>,
    output_queue: OutputQueueHandle,
    events: EventPublisher,
}

impl<K: Kernel> PerTrackInstance<K> {
    /// Create an instance after validating `config`.
    pub fn new(config: InstanceConfig) -> ProcessorResult<Self> {
        config.validate()?;
        Ok(Self {
            offline: None,
            offline_state: LifecycleState::Uninitialized,
            realtime_state: LifecycleState::Uninitialized,
            realtime_rate: None,
            suspended: false,
            groups: GroupTable::new(),
            output_queue: OutputQueueHandle::detached(),
            events: EventPublisher::new(config.event_capacity),
            config,
        })
    }

    /// Configuration this instance was created with.
    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    /// Bound sample rate: the realtime rate if set, else the offline rate.
    pub fn sample_rate(&self) -> Option<f64> {
        self.realtime_rate
            .or_else(|| self.offline.as_ref().map(|o| o.sample_rate))
    }

    /// Offline lifecycle state.
    pub fn offline_state(&self) -> LifecycleState {
        self.offline_state
    }

    /// Realtime lifecycle state.
    pub fn realtime_state(&self) -> LifecycleState {
        self.realtime_state
    }

    /// Frames processed offline since `process_initialize`.
    pub fn sample_counter(&self) -> SampleCount {
        self.offline.as_ref().map_or(0, |o| o.sample_counter)
    }

    /// State of one realtime group.
    pub fn group_state(&self, group: GroupId) -> Option<GroupState> {
        self.groups.get(group).map(|g| g.state)
    }

    /// Latency of one realtime group, fixed when the group was created.
    pub fn group_latency(&self, group: GroupId) -> Option<SampleCount> {
        self.groups.get(group).map(|g| g.latency)
    }

    /// Route output packets to a consumer-owned queue.
    pub fn set_output_queue(&mut self, queue: OutputQueueHandle) {
        self.output_queue = queue;
    }

    /// Subscribe to lifecycle notifications.
    pub fn subscribe(&mut self) -> Subscription {
        self.events.subscribe()
    }

    fn check_realtime_ready(&self) -> ProcessorResult<()> {
        match self.realtime_state {
            LifecycleState::Finalized => Err(ProcessorError::Finalized),
            state if state.is_initialized() => Ok(()),
            _ => Err(ProcessorError::NotInitialized),
        }
    }

    /// Create kernel state for a new group (control context, may allocate).
    pub fn prepare_group(
        &self,
        settings: &EffectSettings,
        outputs: Option<Arc<EffectOutputs>>,
        num_channels: u32,
        sample_rate: f32,
    ) -> ProcessorResult<PreparedGroup<K>> {
        self.check_realtime_ready()?;

        let sample_rate = f64::from(sample_rate);
        if !is_valid_sample_rate(sample_rate) {
            return Err(ProcessorError::InvalidSampleRate(sample_rate));
        }
        let channels = num_channels as usize;
        if channels == 0 || channels > self.config.audio_channels {
            return Err(ProcessorError::InvalidChannelCount {
                requested: channels,
                max: self.config.audio_channels,
            });
        }

        let setup = KernelSetup {
            channels,
            sample_rate,
            max_block_size: self.config.max_block_size,
            mode: ProcessMode::Realtime,
        };
        let kernel = K::create(&setup, settings)?;
        let latency = K::latency(settings, sample_rate);

        Ok(PreparedGroup {
            group: RealtimeGroup {
                kernel,
                state: GroupState::Initialized,
                channels,
                latency,
                delays: (0..channels)
                    .map(|_| DelayLine::new(latency as usize))
                    .collect(),
                outputs,
                sample_counter: 0,
            },
        })
    }

    /// Insert a prepared group into the reserved group storage.
    pub fn attach_group(&mut self, prepared: PreparedGroup<K>) -> ProcessorResult<GroupId> {
        self.check_realtime_ready()?;
        if self.groups.len() >= self.config.max_groups {
            return Err(ProcessorError::GroupCapacity(self.config.max_groups));
        }

        let mut group = prepared.group;
        if self.suspended {
            group.state = GroupState::Suspended;
        }
        Ok(self.groups.insert(group))
    }
}

impl<K: Kernel> Default for PerTrackInstance<K> {
    fn default() -> Self {
        Self {
            config: InstanceConfig::default(),
            offline: None,
            offline_state: LifecycleState::Uninitialized,
            realtime_state: LifecycleState::Uninitialized,
            realtime_rate: None,
            suspended: false,
            groups: GroupTable::new(),
            output_queue: OutputQueueHandle::detached(),
            events: EventPublisher::default(),
        }
    }
}

/// Frames that fit in `requested` and in every buffer.
fn block_frames(input: &[&[f32]], output: &[&mut [f32]], requested: usize) -> usize {
    let shortest_in = input.iter().map(|b| b.len()).min().unwrap_or(0);
    let shortest_out = output.iter().map(|b| b.len()).min().unwrap_or(0);
    requested.min(shortest_in).min(shortest_out)
}

fn copy_through(input: &[&[f32]], output: &mut [&mut [f32]], frames: usize) {
    copy_remaining(input, output, 0, frames);
}

/// Copy channels from index `from` onward, which no kernel or delay line covers.
fn copy_remaining(input: &[&[f32]], output: &mut [&mut [f32]], from: usize, frames: usize) {
    for (i, o) in input.iter().zip(output.iter_mut()).skip(from) {
        o[..frames].copy_from_slice(&i[..frames]);
    }
}

impl<K: Kernel> Processor for PerTrackInstance<K> {
    fn process_initialize(
        &mut self,
        settings: &mut EffectSettings,
        sample_rate: f64,
        channel_map: &ChannelMap,
    ) -> ProcessorResult<()> {
        if !self.offline_state.can_initialize() {
            return Err(ProcessorError::AlreadyInitialized);
        }
        if !is_valid_sample_rate(sample_rate) {
            log::warn!("Rejecting offline initialization at {} Hz", sample_rate);
            return Err(ProcessorError::InvalidSampleRate(sample_rate));
        }
        channel_map.validate(self.config.audio_channels)?;

        let setup = KernelSetup {
            channels: channel_map.channel_count(),
            sample_rate,
            max_block_size: self.config.max_block_size,
            mode: ProcessMode::Offline,
        };
        let kernel = K::create(&setup, settings).map_err(|err| {
            log::warn!("Offline kernel creation failed: {}", err);
            err
        })?;

        let latency = K::latency(settings, sample_rate) as usize;
        self.offline = Some(OfflineState {
            kernel,
            channels: setup.channels,
            sample_rate,
            delays: (0..setup.channels)
                .map(|_| DelayLine::new(latency))
                .collect(),
            sample_counter: 0,
        });
        self.offline_state = LifecycleState::Initialized;
        self.events
            .publish(InstanceEvent::ProcessingSettings(Some(
                InitializeProcessingSettings { sample_rate },
            )));
        log::debug!(
            "Offline processing initialized: {} channels at {} Hz",
            setup.channels,
            sample_rate
        );
        Ok(())
    }

    fn process_block(
        &mut self,
        settings: &mut EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        block_len: usize,
    ) -> usize {
        let Some(offline) = self.offline.as_mut() else {
            return 0;
        };
        let frames = block_frames(input, output, block_len);
        let active = settings.is_active();
        self.offline_state = self.offline_state.after_block(active);

        let channels = offline.channels;
        let produced = if !active || input.len() < channels || output.len() < channels {
            offline.pass_through(input, output, frames);
            frames
        } else {
            match offline
                .kernel
                .process(settings, &input[..channels], &mut output[..channels], frames)
            {
                Ok(produced) => {
                    for (line, i) in offline.delays.iter_mut().zip(input) {
                        line.write(&i[..frames]);
                    }
                    copy_remaining(input, output, channels, frames);
                    if let Some(measurement) = offline.kernel.measurement() {
                        self.output_queue.push(OutputPacket::from_measurement(
                            offline.sample_counter,
                            &measurement,
                        ));
                    }
                    produced.min(frames)
                }
                Err(fault) => {
                    log::warn!("Kernel fault during offline processing: {:?}", fault);
                    offline.kernel.reset();
                    offline.pass_through(input, output, frames);
                    frames
                }
            }
        };
        offline.sample_counter += produced as SampleCount;
        produced
    }

    fn process_finalize(&mut self) -> bool {
        let Some(offline) = self.offline.take() else {
            return false;
        };
        self.offline_state = LifecycleState::Uninitialized;
        self.events.publish(InstanceEvent::ProcessingSettings(None));
        log::debug!(
            "Offline processing finalized after {} frames",
            offline.sample_counter
        );
        true
    }

    fn latency(&self, settings: &EffectSettings, sample_rate: f64) -> SampleCount {
        K::latency(settings, sample_rate)
    }

    fn audio_in_count(&self) -> u32 {
        self.config.audio_channels as u32
    }

    fn audio_out_count(&self) -> u32 {
        self.config.audio_channels as u32
    }
}

impl<K: Kernel> RealtimeProcessor for PerTrackInstance<K> {
    fn realtime_initialize(
        &mut self,
        _settings: &mut EffectSettings,
        sample_rate: f64,
    ) -> ProcessorResult<()> {
        match self.realtime_state {
            LifecycleState::Finalized => {
                log::warn!("Realtime initialization after finalize rejected");
                return Err(ProcessorError::Finalized);
            }
            state if !state.can_initialize() => return Err(ProcessorError::AlreadyInitialized),
            _ => {}
        }
        if !is_valid_sample_rate(sample_rate) {
            log::warn!("Rejecting realtime initialization at {} Hz", sample_rate);
            return Err(ProcessorError::InvalidSampleRate(sample_rate));
        }

        self.groups.reserve(self.config.max_groups);
        self.realtime_rate = Some(sample_rate);
        self.realtime_state = LifecycleState::Initialized;
        self.suspended = false;
        self.events
            .publish(InstanceEvent::ProcessingSettings(Some(
                InitializeProcessingSettings { sample_rate },
            )));
        log::debug!("Realtime processing initialized at {} Hz", sample_rate);
        Ok(())
    }

    fn realtime_add_processor(
        &mut self,
        settings: &mut EffectSettings,
        outputs: Option<Arc<EffectOutputs>>,
        num_channels: u32,
        sample_rate: f32,
    ) -> ProcessorResult<GroupId> {
        let result = self
            .prepare_group(settings, outputs, num_channels, sample_rate)
            .and_then(|prepared| self.attach_group(prepared));
        match &result {
            Ok(id) => log::debug!("Added realtime group {} ({} channels)", id, num_channels),
            Err(err) => log::warn!("Failed to add realtime group: {}", err),
        }
        result
    }

    fn realtime_remove_processor(&mut self, group: GroupId) -> bool {
        let removed = self.groups.remove(group).is_some();
        if removed {
            log::debug!("Removed realtime group {}", group);
        }
        removed
    }

    fn realtime_finalize(&mut self, _settings: &mut EffectSettings) -> bool {
        let was_initialized = self.realtime_state.is_initialized();
        let dropped = self.groups.len();
        self.groups.clear();
        self.realtime_rate = None;
        self.suspended = false;
        self.realtime_state = LifecycleState::Finalized;
        if was_initialized {
            self.events.publish(InstanceEvent::ProcessingSettings(None));
            log::debug!("Realtime processing finalized ({} groups dropped)", dropped);
        }
        true
    }

    fn realtime_suspend(&mut self) -> bool {
        if !self.realtime_state.is_initialized() {
            return false;
        }
        self.suspended = true;
        for (_, group) in self.groups.iter_mut() {
            group.state = GroupState::Suspended;
        }
        self.events.publish(InstanceEvent::Suspended);
        true
    }

    fn realtime_resume(&mut self) -> bool {
        if !self.realtime_state.is_initialized() {
            return false;
        }
        self.suspended = false;
        for (_, group) in self.groups.iter_mut() {
            if group.state == GroupState::Faulted {
                group.kernel.reset();
            }
            group.state = group.state.resumed();
        }
        self.events.publish(InstanceEvent::Resumed);
        true
    }

    fn realtime_process(
        &mut self,
        group: GroupId,
        settings: &mut EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        num_samples: usize,
    ) -> usize {
        let frames = block_frames(input, output, num_samples);
        let Some(g) = self.groups.get_mut(group) else {
            copy_through(input, output, frames);
            return frames;
        };

        let active = settings.is_active();
        self.realtime_state = self.realtime_state.after_block(active);
        g.state = g.state.after_block(active);

        let channels = g.channels;
        if !active
            || !g.state.runs_kernel()
            || input.len() < channels
            || output.len() < channels
        {
            g.pass_through(settings, input, output, frames);
            return frames;
        }

        match g
            .kernel
            .process(settings, &input[..channels], &mut output[..channels], frames)
        {
            Ok(produced) => {
                for (line, i) in g.delays.iter_mut().zip(input) {
                    line.write(&i[..frames]);
                }
                copy_remaining(input, output, channels, frames);
                g.report(&self.output_queue);
                g.sample_counter += frames as SampleCount;
                produced.min(frames)
            }
            Err(_) => {
                g.state = GroupState::Faulted;
                g.pass_through(settings, input, output, frames);
                frames
            }
        }
    }

    fn realtime_pass_through(
        &mut self,
        group: GroupId,
        settings: &mut EffectSettings,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        num_samples: usize,
    ) {
        let frames = block_frames(input, output, num_samples);
        match self.groups.get_mut(group) {
            Some(g) => {
                self.realtime_state = self.realtime_state.after_block(false);
                g.state = g.state.after_block(false);
                g.pass_through(settings, input, output, frames);
            }
            None => copy_through(input, output, frames),
        }
    }

    fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn group_ids(&self) -> Vec<GroupId> {
        self.groups.ids()
    }
}

impl<K: Kernel> RealtimeEffect for PerTrackInstance<K> {
    fn default_settings(&self) -> EffectSettings {
        K::default_settings()
    }
}
