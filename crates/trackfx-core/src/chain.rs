//! Per-track realtime effect chain.
//!
//! A chain is split into two halves that live on different threads:
//!
//! - [`ChainController`] (control context): inserts, removes, reorders and
//!   edits effects. Effects are realtime-initialized and given one group per
//!   channel group here, before they ever reach the audio thread.
//! - [`ChainRenderer`] (audio context): runs the effects in order over
//!   pre-allocated ping-pong buffers.
//!
//! Structure changes travel through an `rtrb` command ring and are applied
//! only in [`ChainRenderer::begin_block`], i.e. between buffers. Removed
//! effects travel back through a second ring so they are finalized and
//! dropped on the control context. Parameter edits bypass the ring entirely:
//! they are published into each effect's [`SharedSettings`] and picked up
//! by the renderer at the next block boundary.
//!
//! # Usage
//!
//! ```ignore
//! let (mut controller, mut renderer) = effect_chain(ChainConfig::new())?;
//!
//! // Control thread
//! let effect = Box::new(PerTrackInstance::<Compressor>::default());
//! let settings = effect.default_settings();
//! let id = controller.append(effect, settings)?;
//! controller.edit_settings(id, |s| { s.set(compressor::THRESHOLD, -18.0); })?;
//!
//! // Audio thread, once per buffer
//! renderer.begin_block();
//! renderer.process(0, &inputs, &mut outputs, frames);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::block_buffers::{empty_inputs, empty_outputs, PingPongBuffers};
use crate::config::ChainConfig;
use crate::error::{ProcessorError, ProcessorResult};
use crate::groups::GroupId;
use crate::processor::RealtimeEffect;
use crate::settings::EffectSettings;
use crate::shared_settings::{SharedSettings, MAX_SHARED_PARAMETERS};

/// Stable identifier of an effect within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Raw identifier value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fx{}", self.0)
    }
}

/// An effect as held by the renderer.
struct ChainSlot {
    id: EffectId,
    effect: Box<dyn RealtimeEffect>,
    shared: Arc<SharedSettings>,
    working: EffectSettings,
    groups: Vec<GroupId>,
}

/// Structure changes sent to the renderer.
///
/// Slots are boxed so moving them in and out of the renderer never
/// allocates or frees on the audio thread.
enum ChainCommand {
    Insert {
        position: usize,
        slot: Box<ChainSlot>,
    },
    Remove(EffectId),
    Move {
        from: usize,
        to: usize,
    },
    SetChainActive(bool),
}

/// Controller-side view of one effect.
struct ControlEntry {
    id: EffectId,
    shared: Arc<SharedSettings>,
    settings: EffectSettings,
}

/// Create a connected controller/renderer pair.
pub fn effect_chain(config: ChainConfig) -> ProcessorResult<(ChainController, ChainRenderer)> {
    config.validate()?;

    let (commands_tx, commands_rx) = rtrb::RingBuffer::new(config.command_capacity);
    let (retired_tx, retired_rx) =
        rtrb::RingBuffer::new(config.max_effects + config.command_capacity);

    let controller = ChainController {
        config,
        commands: commands_tx,
        retired: retired_rx,
        entries: Vec::with_capacity(config.max_effects),
        chain_active: true,
        next_id: 0,
    };
    let renderer = ChainRenderer {
        commands: commands_rx,
        retired: retired_tx,
        slots: Vec::with_capacity(config.max_effects),
        buffers: PingPongBuffers::allocate(config.group_channels, config.max_block_size),
        group_count: config.group_count,
        active: true,
    };
    log::debug!(
        "Effect chain created: {} x {} channels at {} Hz",
        config.group_count,
        config.group_channels,
        config.sample_rate
    );
    Ok((controller, renderer))
}

// =========================================================================
// ChainController
// =========================================================================

/// Control-context half of an effect chain.
pub struct ChainController {
    config: ChainConfig,
    commands: rtrb::Producer<ChainCommand>,
    retired: rtrb::Consumer<Box<ChainSlot>>,
    entries: Vec<ControlEntry>,
    chain_active: bool,
    next_id: u64,
}

impl ChainController {
    /// Configuration of this chain.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    fn send(&mut self, command: ChainCommand) -> Result<(), ChainCommand> {
        self.commands.push(command).map_err(|err| match err {
            rtrb::PushError::Full(value) => value,
        })
    }

    fn ensure_queue_space(&self) -> ProcessorResult<()> {
        if self.commands.is_full() {
            log::warn!("Effect chain command queue is full");
            return Err(ProcessorError::QueueFull);
        }
        Ok(())
    }

    fn index_of(&self, id: EffectId) -> ProcessorResult<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(ProcessorError::UnknownEffect(id.0))
    }

    /// Insert an effect at `position` (clamped to the chain length).
    ///
    /// The effect is realtime-initialized and receives one group per channel
    /// group of the chain before it is handed to the renderer.
    pub fn insert(
        &mut self,
        position: usize,
        mut effect: Box<dyn RealtimeEffect>,
        mut settings: EffectSettings,
    ) -> ProcessorResult<EffectId> {
        if self.entries.len() >= self.config.max_effects {
            return Err(ProcessorError::ChainFull(self.config.max_effects));
        }
        if settings.len() > MAX_SHARED_PARAMETERS {
            return Err(ProcessorError::SettingsLayout(format!(
                "{} parameters exceed the shared limit of {}",
                settings.len(),
                MAX_SHARED_PARAMETERS
            )));
        }
        self.ensure_queue_space()?;

        effect.realtime_initialize(&mut settings, self.config.sample_rate)?;
        let mut groups = Vec::with_capacity(self.config.group_count);
        for _ in 0..self.config.group_count {
            match effect.realtime_add_processor(
                &mut settings,
                None,
                self.config.group_channels as u32,
                self.config.sample_rate as f32,
            ) {
                Ok(group) => groups.push(group),
                Err(err) => {
                    effect.realtime_finalize(&mut settings);
                    return Err(err);
                }
            }
        }

        let id = EffectId(self.next_id);
        self.next_id += 1;
        let position = position.min(self.entries.len());
        let shared = Arc::new(SharedSettings::new(&settings));
        let slot = Box::new(ChainSlot {
            id,
            effect,
            shared: Arc::clone(&shared),
            working: settings.clone(),
            groups,
        });

        if let Err(rejected) = self.send(ChainCommand::Insert { position, slot }) {
            if let ChainCommand::Insert { mut slot, .. } = rejected {
                slot.effect.realtime_finalize(&mut slot.working);
            }
            return Err(ProcessorError::QueueFull);
        }

        self.entries.insert(
            position,
            ControlEntry {
                id,
                shared,
                settings,
            },
        );
        log::debug!("Inserted effect {} at position {}", id, position);
        Ok(id)
    }

    /// Insert an effect at the end of the chain.
    pub fn append(
        &mut self,
        effect: Box<dyn RealtimeEffect>,
        settings: EffectSettings,
    ) -> ProcessorResult<EffectId> {
        self.insert(self.entries.len(), effect, settings)
    }

    /// Remove an effect. It comes back through [`collect_retired`](Self::collect_retired).
    pub fn remove(&mut self, id: EffectId) -> ProcessorResult<()> {
        let index = self.index_of(id)?;
        self.ensure_queue_space()?;
        if self.send(ChainCommand::Remove(id)).is_err() {
            return Err(ProcessorError::QueueFull);
        }
        self.entries.remove(index);
        log::debug!("Removed effect {}", id);
        Ok(())
    }

    /// Move the effect at `from` to position `to`.
    pub fn move_effect(&mut self, from: usize, to: usize) -> ProcessorResult<()> {
        let len = self.entries.len();
        if from >= len {
            return Err(ProcessorError::InvalidPosition(from));
        }
        if to >= len {
            return Err(ProcessorError::InvalidPosition(to));
        }
        if from == to {
            return Ok(());
        }
        if self.send(ChainCommand::Move { from, to }).is_err() {
            log::warn!("Effect chain command queue is full");
            return Err(ProcessorError::QueueFull);
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Ok(())
    }

    /// Enable or bypass one effect.
    pub fn set_active(&mut self, id: EffectId, active: bool) -> ProcessorResult<()> {
        self.edit_settings(id, |settings| settings.set_active(active))
    }

    /// Edit one effect's settings and publish them to the renderer.
    ///
    /// The edit is applied to a copy; if it changes the parameter layout it
    /// is rejected and the previous settings stay in place.
    pub fn edit_settings<F>(&mut self, id: EffectId, edit: F) -> ProcessorResult<()>
    where
        F: FnOnce(&mut EffectSettings),
    {
        let index = self.index_of(id)?;
        let entry = &mut self.entries[index];
        let mut edited = entry.settings.clone();
        edit(&mut edited);
        if !entry.shared.publish(&edited) {
            return Err(ProcessorError::SettingsLayout(format!(
                "edit of effect {} changed its parameter layout",
                id
            )));
        }
        entry.settings = edited;
        Ok(())
    }

    /// Copy of one effect's current settings (for undo snapshots).
    pub fn settings_snapshot(&self, id: EffectId) -> Option<EffectSettings> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.settings.clone())
    }

    /// Enable or bypass the whole chain.
    pub fn set_chain_active(&mut self, active: bool) -> ProcessorResult<()> {
        if self.send(ChainCommand::SetChainActive(active)).is_err() {
            log::warn!("Effect chain command queue is full");
            return Err(ProcessorError::QueueFull);
        }
        self.chain_active = active;
        Ok(())
    }

    /// Whether the chain is enabled (as last requested).
    pub fn is_chain_active(&self) -> bool {
        self.chain_active
    }

    /// Number of effects (as last requested).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain holds no effects.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Effect identifiers in processing order.
    pub fn ids(&self) -> Vec<EffectId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Finalize and drop effects the renderer has released.
    ///
    /// Returns the identifiers of the collected effects.
    pub fn collect_retired(&mut self) -> Vec<EffectId> {
        let mut collected = Vec::new();
        while let Ok(mut slot) = self.retired.pop() {
            slot.effect.realtime_finalize(&mut slot.working);
            log::debug!("Finalized retired effect {}", slot.id);
            collected.push(slot.id);
        }
        collected
    }
}

// =========================================================================
// ChainRenderer
// =========================================================================

/// Audio-context half of an effect chain.
///
/// # Real-Time Safety
///
/// - `begin_block()` applies at most the queued commands, moving boxed
///   slots within pre-reserved storage
/// - `process()` uses only pre-allocated scratch buffers
/// - neither method locks, allocates or logs
pub struct ChainRenderer {
    commands: rtrb::Consumer<ChainCommand>,
    retired: rtrb::Producer<Box<ChainSlot>>,
    slots: Vec<Box<ChainSlot>>,
    buffers: PingPongBuffers,
    group_count: usize,
    active: bool,
}

impl ChainRenderer {
    /// Apply pending structure changes and take settings snapshots.
    ///
    /// Call once per buffer, before any `process()` call. Returns the number
    /// of commands applied.
    pub fn begin_block(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let blocked = match self.commands.peek() {
                Ok(ChainCommand::Remove(_)) => self.retired.is_full(),
                Ok(_) => false,
                Err(_) => break,
            };
            if blocked {
                break;
            }
            let Ok(command) = self.commands.pop() else {
                break;
            };
            self.apply(command);
            applied += 1;
        }

        for slot in self.slots.iter_mut() {
            let slot = &mut **slot;
            slot.shared.read_into(&mut slot.working);
        }
        applied
    }

    fn apply(&mut self, command: ChainCommand) {
        match command {
            ChainCommand::Insert { position, slot } => {
                let position = position.min(self.slots.len());
                self.slots.insert(position, slot);
            }
            ChainCommand::Remove(id) => {
                if let Some(index) = self.slots.iter().position(|s| s.id == id) {
                    let slot = self.slots.remove(index);
                    if let Err(rtrb::PushError::Full(slot)) = self.retired.push(slot) {
                        self.slots.insert(index, slot);
                    }
                }
            }
            ChainCommand::Move { from, to } => {
                if from < self.slots.len() && to < self.slots.len() {
                    let slot = self.slots.remove(from);
                    self.slots.insert(to, slot);
                }
            }
            ChainCommand::SetChainActive(active) => self.active = active,
        }
    }

    /// Run every effect of the chain over one channel group.
    ///
    /// Inactive effects pass audio through with latency alignment; an
    /// inactive or empty chain copies input to output. Returns the frames
    /// produced, at most the configured maximum block size.
    pub fn process(
        &mut self,
        group: usize,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        num_samples: usize,
    ) -> usize {
        let shortest_in = input.iter().map(|b| b.len()).min().unwrap_or(0);
        let shortest_out = output.iter().map(|b| b.len()).min().unwrap_or(0);
        let frames = num_samples
            .min(self.buffers.max_frames())
            .min(shortest_in)
            .min(shortest_out);

        if !self.active || self.slots.is_empty() || group >= self.group_count {
            for (i, o) in input.iter().zip(output.iter_mut()) {
                o[..frames].copy_from_slice(&i[..frames]);
            }
            return frames;
        }

        let channels = self
            .buffers
            .channel_count()
            .min(input.len())
            .min(output.len());
        self.buffers.load(&input[..channels], frames);

        for slot in self.slots.iter_mut() {
            let ChainSlot {
                effect,
                working,
                groups,
                ..
            } = &mut **slot;
            let Some(&id) = groups.get(group) else {
                continue;
            };
            {
                let mut ins = empty_inputs();
                let mut outs = empty_outputs();
                self.buffers.split(frames, &mut ins, &mut outs);
                if working.is_active() {
                    effect.realtime_process(
                        id,
                        working,
                        &ins[..channels],
                        &mut outs[..channels],
                        frames,
                    );
                } else {
                    effect.realtime_pass_through(
                        id,
                        working,
                        &ins[..channels],
                        &mut outs[..channels],
                        frames,
                    );
                }
            }
            self.buffers.swap();
        }

        self.buffers.store(&mut output[..channels], frames);
        // Channels wider than the group bypass the effects.
        for (i, o) in input.iter().zip(output.iter_mut()).skip(channels) {
            o[..frames].copy_from_slice(&i[..frames]);
        }
        frames
    }

    /// Whether the chain is enabled.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of effects currently rendered.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no effects are rendered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Effect identifiers in processing order (allocates; not for the audio thread).
    pub fn effect_ids(&self) -> Vec<EffectId> {
        self.slots.iter().map(|s| s.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::PerTrackInstance;
    use crate::kernel::Kernel;
    use crate::testing::{Delay, Gain, DELAY, GAIN};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn gain(value: f64) -> (Box<dyn RealtimeEffect>, EffectSettings) {
        let mut settings = Gain::default_settings();
        settings.set(GAIN, value);
        (Box::new(PerTrackInstance::<Gain>::default()), settings)
    }

    fn run(renderer: &mut ChainRenderer, value: f32) -> [f32; 2] {
        let left = [value; 16];
        let right = [value; 16];
        let mut out_l = [0.0f32; 16];
        let mut out_r = [0.0f32; 16];
        let produced = renderer.process(
            0,
            &[&left[..], &right[..]],
            &mut [&mut out_l[..], &mut out_r[..]],
            16,
        );
        assert_eq!(produced, 16);
        [out_l[15], out_r[15]]
    }

    #[test]
    fn test_commands_apply_only_at_block_boundary() {
        let (mut controller, mut renderer) = effect_chain(ChainConfig::new()).unwrap();
        let (effect, settings) = gain(2.0);
        controller.append(effect, settings).unwrap();
        assert_eq!(controller.len(), 1);

        assert_eq!(renderer.len(), 0);
        assert_eq!(run(&mut renderer, 0.5), [0.5, 0.5]);

        assert_eq!(renderer.begin_block(), 1);
        assert_eq!(renderer.len(), 1);
        assert_eq!(run(&mut renderer, 0.5), [1.0, 1.0]);
    }

    #[test]
    fn test_effects_run_in_series() {
        let (mut controller, mut renderer) = effect_chain(ChainConfig::new()).unwrap();
        for value in [2.0, 3.0] {
            let (effect, settings) = gain(value);
            controller.append(effect, settings).unwrap();
        }
        renderer.begin_block();
        assert_eq!(run(&mut renderer, 0.25), [1.5, 1.5]);
    }

    #[test]
    fn test_insert_and_move_order() {
        let (mut controller, mut renderer) = effect_chain(ChainConfig::new()).unwrap();
        let (effect, settings) = gain(1.0);
        let a = controller.append(effect, settings).unwrap();
        let (effect, settings) = gain(1.0);
        let b = controller.append(effect, settings).unwrap();
        let (effect, settings) = gain(1.0);
        let c = controller.insert(0, effect, settings).unwrap();
        assert_eq!(controller.ids(), vec![c, a, b]);

        controller.move_effect(0, 2).unwrap();
        assert_eq!(controller.ids(), vec![a, b, c]);
        assert!(matches!(
            controller.move_effect(3, 0),
            Err(ProcessorError::InvalidPosition(3))
        ));

        renderer.begin_block();
        assert_eq!(renderer.effect_ids(), controller.ids());
    }

    #[test]
    fn test_edit_settings_reach_renderer_at_next_block() {
        let (mut controller, mut renderer) = effect_chain(ChainConfig::new()).unwrap();
        let (effect, settings) = gain(2.0);
        let id = controller.append(effect, settings).unwrap();
        renderer.begin_block();

        controller.edit_settings(id, |s| {
            s.set(GAIN, 4.0);
        })
        .unwrap();
        assert_eq!(run(&mut renderer, 0.5), [1.0, 1.0]);

        renderer.begin_block();
        assert_eq!(run(&mut renderer, 0.5), [2.0, 2.0]);
        assert_eq!(controller.settings_snapshot(id).unwrap().get(GAIN), Some(4.0));
    }

    #[test]
    fn test_layout_changing_edit_is_rejected() {
        let (mut controller, _renderer) = effect_chain(ChainConfig::new()).unwrap();
        let (effect, settings) = gain(2.0);
        let id = controller.append(effect, settings).unwrap();

        let result = controller.edit_settings(id, |s| *s = EffectSettings::empty());
        assert!(matches!(result, Err(ProcessorError::SettingsLayout(_))));
        assert_eq!(controller.settings_snapshot(id).unwrap().get(GAIN), Some(2.0));
    }

    #[test]
    fn test_inactive_effect_passes_through_with_latency() {
        let config = ChainConfig::new().with_groups(1, 1);
        let (mut controller, mut renderer) = effect_chain(config).unwrap();
        let mut settings = Delay::default_settings();
        settings.set(DELAY, 2.0);
        let id = controller
            .append(Box::new(PerTrackInstance::<Delay>::default()), settings)
            .unwrap();
        controller.set_active(id, false).unwrap();
        renderer.begin_block();

        let input = [1.0f32, 2.0, 3.0, 4.0];
        let mut output = [0.0f32; 4];
        renderer.process(0, &[&input[..]], &mut [&mut output[..]], 4);
        assert_eq!(output, [0.0, 0.0, 1.0, 2.0]);
        assert!(!controller.settings_snapshot(id).unwrap().is_active());
    }

    #[test]
    fn test_inactive_chain_copies_input() {
        let (mut controller, mut renderer) = effect_chain(ChainConfig::new()).unwrap();
        let (effect, settings) = gain(3.0);
        controller.append(effect, settings).unwrap();
        controller.set_chain_active(false).unwrap();
        assert!(!controller.is_chain_active());

        renderer.begin_block();
        assert!(!renderer.is_active());
        assert_eq!(run(&mut renderer, 0.5), [0.5, 0.5]);
    }

    #[test]
    fn test_removed_effect_is_finalized_on_control_side() {
        let (mut controller, mut renderer) = effect_chain(ChainConfig::new()).unwrap();
        let (effect, settings) = gain(2.0);
        let id = controller.append(effect, settings).unwrap();
        renderer.begin_block();

        controller.remove(id).unwrap();
        assert!(controller.is_empty());
        assert!(controller.collect_retired().is_empty());
        assert!(matches!(
            controller.remove(id),
            Err(ProcessorError::UnknownEffect(_))
        ));

        renderer.begin_block();
        assert!(renderer.is_empty());
        assert_eq!(controller.collect_retired(), vec![id]);
    }

    #[test]
    fn test_capacity_limits() {
        let config = ChainConfig::new().with_max_effects(1);
        let (mut controller, _renderer) = effect_chain(config).unwrap();
        let (effect, settings) = gain(1.0);
        controller.append(effect, settings).unwrap();
        let (effect, settings) = gain(1.0);
        assert!(matches!(
            controller.append(effect, settings),
            Err(ProcessorError::ChainFull(1))
        ));
    }

    #[test]
    fn test_full_command_queue_is_reported() {
        let config = ChainConfig::new().with_command_capacity(1);
        let (mut controller, mut renderer) = effect_chain(config).unwrap();
        let (effect, settings) = gain(1.0);
        controller.append(effect, settings).unwrap();
        let (effect, settings) = gain(1.0);
        assert!(matches!(
            controller.append(effect, settings),
            Err(ProcessorError::QueueFull)
        ));
        assert_eq!(controller.len(), 1);

        renderer.begin_block();
        let (effect, settings) = gain(1.0);
        assert!(controller.append(effect, settings).is_ok());
    }

    #[test]
    fn test_each_channel_group_has_its_own_state() {
        let config = ChainConfig::new().with_groups(2, 1);
        let (mut controller, mut renderer) = effect_chain(config).unwrap();
        let mut settings = Delay::default_settings();
        settings.set(DELAY, 1.0);
        controller
            .append(Box::new(PerTrackInstance::<Delay>::default()), settings)
            .unwrap();
        renderer.begin_block();

        let mut out = [0.0f32; 2];
        renderer.process(0, &[&[1.0, 1.0][..]], &mut [&mut out[..]], 2);
        assert_eq!(out, [0.0, 1.0]);
        renderer.process(1, &[&[0.0, 0.0][..]], &mut [&mut out[..]], 2);
        assert_eq!(out, [0.0, 0.0]);

        // Unknown group index copies through.
        renderer.process(5, &[&[0.7, 0.7][..]], &mut [&mut out[..]], 2);
        assert_eq!(out, [0.7, 0.7]);
    }

    #[test]
    fn test_channels_wider_than_group_are_copied() {
        let config = ChainConfig::new().with_groups(1, 1);
        let (mut controller, mut renderer) = effect_chain(config).unwrap();
        let (effect, settings) = gain(2.0);
        controller.append(effect, settings).unwrap();
        renderer.begin_block();

        let left = [0.5f32; 4];
        let right = [0.25f32; 4];
        let mut out_l = [9.0f32; 4];
        let mut out_r = [9.0f32; 4];
        renderer.process(
            0,
            &[&left[..], &right[..]],
            &mut [&mut out_l[..], &mut out_r[..]],
            4,
        );
        assert_eq!(out_l, [1.0; 4]);
        assert_eq!(out_r, [0.25; 4]);

        controller.set_chain_active(false).unwrap();
        renderer.begin_block();
        let mut out_r = [9.0f32; 4];
        renderer.process(
            0,
            &[&left[..], &right[..]],
            &mut [&mut out_l[..], &mut out_r[..]],
            4,
        );
        assert_eq!(out_l, [0.5; 4]);
        assert_eq!(out_r, [0.25; 4]);
    }

    #[test]
    fn test_block_longer_than_scratch_is_truncated() {
        let config = ChainConfig::new().with_groups(1, 1).with_max_block_size(8);
        let (mut controller, mut renderer) = effect_chain(config).unwrap();
        let (effect, settings) = gain(2.0);
        controller.append(effect, settings).unwrap();
        renderer.begin_block();

        let input = [1.0f32; 32];
        let mut output = [0.0f32; 32];
        let produced = renderer.process(0, &[&input[..]], &mut [&mut output[..]], 32);
        assert_eq!(produced, 8);
        assert_eq!(&output[..8], &[2.0; 8]);
        assert_eq!(&output[8..], &[0.0; 24]);
    }

    #[test]
    fn test_control_and_audio_threads() {
        let (mut controller, renderer) = effect_chain(ChainConfig::new()).unwrap();
        let stop = Arc::new(AtomicBool::new(false));

        let audio = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let mut renderer = renderer;
                while !stop.load(Ordering::Acquire) {
                    renderer.begin_block();
                    run(&mut renderer, 1.0);
                    std::thread::yield_now();
                }
                renderer
            })
        };

        let ids: Vec<EffectId> = (0..4)
            .map(|_| {
                let (effect, settings) = gain(1.0);
                controller.append(effect, settings).unwrap()
            })
            .collect();
        for id in &ids {
            controller.edit_settings(*id, |s| {
                s.set(GAIN, 2.0);
            })
            .unwrap();
        }
        controller.remove(ids[0]).unwrap();

        stop.store(true, Ordering::Release);
        let mut renderer = audio.join().unwrap();
        renderer.begin_block();

        assert_eq!(renderer.effect_ids(), controller.ids());
        assert_eq!(run(&mut renderer, 1.0), [8.0, 8.0]);
        assert_eq!(controller.collect_retired(), vec![ids[0]]);
    }
}
