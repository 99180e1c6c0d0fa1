//! Output packets and meter values produced by realtime processing.
//!
//! The processor never owns its consumers. Packets go to an
//! [`OutputPacketQueue`] owned by the UI layer and reached only through an
//! [`OutputQueueHandle`] (a weak reference): once the consumer drops the
//! queue, pushes are skipped silently and the producer never keeps it alive.
//!
//! [`EffectOutputs`] holds the latest meter readings as atomics, for hosts
//! that poll a value instead of draining packets.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::kernel::Measurement;
use crate::types::SampleCount;

/// Default number of packets a queue holds before dropping new ones.
pub const DEFAULT_PACKET_CAPACITY: usize = 1024;

/// Per-block metrics pushed by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutputPacket {
    /// Sample counter value at the first frame of the block.
    pub index_of_first_sample: SampleCount,
    /// Gain reduction requested by the static curve, in dB.
    pub target_compression_db: f32,
    /// Gain reduction actually applied after smoothing, in dB.
    pub actual_compression_db: f32,
    /// Peak input level of the block, in dBFS.
    pub input_db: f32,
    /// Peak output level of the block, in dBFS.
    pub output_db: f32,
}

impl OutputPacket {
    /// Build a packet from a kernel measurement.
    pub fn from_measurement(index_of_first_sample: SampleCount, m: &Measurement) -> Self {
        Self {
            index_of_first_sample,
            target_compression_db: m.target_compression_db,
            actual_compression_db: m.actual_compression_db,
            input_db: m.input_db,
            output_db: m.output_db,
        }
    }
}

/// Bounded, non-blocking packet queue owned by the consumer.
pub struct OutputPacketQueue {
    tx: Sender<OutputPacket>,
    rx: Receiver<OutputPacket>,
}

impl OutputPacketQueue {
    /// Create a queue holding up to `capacity` packets.
    pub fn new(capacity: usize) -> Arc<Self> {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Arc::new(Self { tx, rx })
    }

    /// Create a queue with [`DEFAULT_PACKET_CAPACITY`].
    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(DEFAULT_PACKET_CAPACITY)
    }

    /// Push a packet without blocking. Returns `false` if the queue is full.
    #[inline]
    pub fn push(&self, packet: OutputPacket) -> bool {
        match self.tx.try_send(packet) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Pop the oldest packet, if any.
    #[inline]
    pub fn pop(&self) -> Option<OutputPacket> {
        self.rx.try_recv().ok()
    }

    /// Drain every queued packet.
    pub fn drain(&self) -> Vec<OutputPacket> {
        self.rx.try_iter().collect()
    }

    /// Number of queued packets.
    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no packets are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Create a weak handle for a producer.
    pub fn handle(self: &Arc<Self>) -> OutputQueueHandle {
        OutputQueueHandle {
            queue: Arc::downgrade(self),
        }
    }
}

/// Result of pushing through an [`OutputQueueHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Packet was queued.
    Pushed,
    /// Queue exists but is full; packet dropped.
    Full,
    /// Queue was dropped by its owner, or no queue was ever attached.
    Expired,
}

/// Optional weak handle to a consumer-owned queue, with liveness check.
#[derive(Clone, Default)]
pub struct OutputQueueHandle {
    queue: Weak<OutputPacketQueue>,
}

impl OutputQueueHandle {
    /// Handle that never delivers.
    pub fn detached() -> Self {
        Self { queue: Weak::new() }
    }

    /// Whether the consumer still holds the queue.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.queue.strong_count() > 0
    }

    /// Push a packet if the queue is still alive.
    #[inline]
    pub fn push(&self, packet: OutputPacket) -> PushOutcome {
        match self.queue.upgrade() {
            Some(queue) => {
                if queue.push(packet) {
                    PushOutcome::Pushed
                } else {
                    PushOutcome::Full
                }
            }
            None => PushOutcome::Expired,
        }
    }
}

impl std::fmt::Debug for OutputQueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputQueueHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Latest meter values of one processing group.
///
/// Written by the realtime path, read by anyone. Floats are stored as bits.
pub struct EffectOutputs {
    actual_compression_db: AtomicU32,
    input_db: AtomicU32,
    output_db: AtomicU32,
    blocks: AtomicU64,
}

impl EffectOutputs {
    /// Create outputs with neutral readings.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store a block's measurement.
    #[inline]
    pub fn update(&self, m: &Measurement) {
        self.actual_compression_db
            .store(m.actual_compression_db.to_bits(), Ordering::Relaxed);
        self.input_db.store(m.input_db.to_bits(), Ordering::Relaxed);
        self.output_db.store(m.output_db.to_bits(), Ordering::Relaxed);
        self.blocks.fetch_add(1, Ordering::Release);
    }

    /// Gain reduction currently applied, in dB.
    pub fn actual_compression_db(&self) -> f32 {
        f32::from_bits(self.actual_compression_db.load(Ordering::Relaxed))
    }

    /// Latest peak input level, in dBFS.
    pub fn input_db(&self) -> f32 {
        f32::from_bits(self.input_db.load(Ordering::Relaxed))
    }

    /// Latest peak output level, in dBFS.
    pub fn output_db(&self) -> f32 {
        f32::from_bits(self.output_db.load(Ordering::Relaxed))
    }

    /// Number of measured blocks.
    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Acquire)
    }
}

impl Default for EffectOutputs {
    fn default() -> Self {
        Self {
            actual_compression_db: AtomicU32::new(0.0f32.to_bits()),
            input_db: AtomicU32::new(f32::NEG_INFINITY.to_bits()),
            output_db: AtomicU32::new(f32::NEG_INFINITY.to_bits()),
            blocks: AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(index: SampleCount) -> OutputPacket {
        OutputPacket {
            index_of_first_sample: index,
            ..Default::default()
        }
    }

    #[test]
    fn test_push_and_pop() {
        let queue = OutputPacketQueue::new(4);
        let handle = queue.handle();

        assert_eq!(handle.push(packet(0)), PushOutcome::Pushed);
        assert_eq!(handle.push(packet(512)), PushOutcome::Pushed);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().index_of_first_sample, 0);
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_drops_packet() {
        let queue = OutputPacketQueue::new(1);
        let handle = queue.handle();

        assert_eq!(handle.push(packet(0)), PushOutcome::Pushed);
        assert_eq!(handle.push(packet(1)), PushOutcome::Full);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_expired_handle_skips_push() {
        let queue = OutputPacketQueue::new(4);
        let handle = queue.handle();
        assert!(handle.is_alive());

        drop(queue);
        assert!(!handle.is_alive());
        assert_eq!(handle.push(packet(0)), PushOutcome::Expired);
    }

    #[test]
    fn test_handle_does_not_keep_queue_alive() {
        let queue = OutputPacketQueue::new(4);
        let handle = queue.handle();
        assert_eq!(Arc::strong_count(&queue), 1);
        let _clone = handle.clone();
        assert_eq!(Arc::strong_count(&queue), 1);
    }

    #[test]
    fn test_detached_handle() {
        let handle = OutputQueueHandle::detached();
        assert!(!handle.is_alive());
        assert_eq!(handle.push(packet(0)), PushOutcome::Expired);
    }

    #[test]
    fn test_effect_outputs_update() {
        let outputs = EffectOutputs::new();
        assert_eq!(outputs.blocks(), 0);
        assert_eq!(outputs.input_db(), f32::NEG_INFINITY);

        outputs.update(&Measurement {
            target_compression_db: -6.0,
            actual_compression_db: -4.5,
            input_db: -3.0,
            output_db: -7.5,
        });
        assert_eq!(outputs.actual_compression_db(), -4.5);
        assert_eq!(outputs.input_db(), -3.0);
        assert_eq!(outputs.output_db(), -7.5);
        assert_eq!(outputs.blocks(), 1);
    }
}
