//! Notification channel for instance lifecycle events.
//!
//! Subscribers (meters, editors, the host) receive [`InstanceEvent`]s through
//! bounded channels. Publishing never blocks: a full subscriber misses the
//! event, and a dropped subscriber is pruned on the next publish.

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Default per-subscriber event capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Settings the processor was initialized with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitializeProcessingSettings {
    /// Bound sample rate in Hz.
    pub sample_rate: f64,
}

/// Events published by an instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstanceEvent {
    /// Processing was initialized (`Some`) or finalized (`None`).
    ProcessingSettings(Option<InitializeProcessingSettings>),
    /// A suspended realtime instance was re-armed.
    Resumed,
    /// Realtime processing was suspended (transport stop).
    Suspended,
}

/// Receiving end of an event subscription.
pub struct Subscription {
    rx: Receiver<InstanceEvent>,
}

impl Subscription {
    /// Take the next pending event, if any.
    #[inline]
    pub fn try_next(&self) -> Option<InstanceEvent> {
        self.rx.try_recv().ok()
    }

    /// Take every pending event.
    pub fn drain(&self) -> Vec<InstanceEvent> {
        self.rx.try_iter().collect()
    }
}

/// Fan-out publisher of [`InstanceEvent`]s.
pub struct EventPublisher {
    subscribers: Vec<Sender<InstanceEvent>>,
    capacity: usize,
}

impl EventPublisher {
    /// Create a publisher whose subscriptions hold `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        self.subscribers.push(tx);
        Subscription { rx }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver an event to every subscriber without blocking.
    pub fn publish(&mut self, event: InstanceEvent) {
        self.subscribers.retain(|tx| match tx.try_send(event) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out() {
        let mut publisher = EventPublisher::default();
        let a = publisher.subscribe();
        let b = publisher.subscribe();

        publisher.publish(InstanceEvent::Resumed);
        assert_eq!(a.try_next(), Some(InstanceEvent::Resumed));
        assert_eq!(b.try_next(), Some(InstanceEvent::Resumed));
        assert_eq!(a.try_next(), None);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut publisher = EventPublisher::default();
        let kept = publisher.subscribe();
        drop(publisher.subscribe());
        assert_eq!(publisher.subscriber_count(), 2);

        publisher.publish(InstanceEvent::Suspended);
        assert_eq!(publisher.subscriber_count(), 1);
        assert_eq!(kept.drain(), vec![InstanceEvent::Suspended]);
    }

    #[test]
    fn test_full_subscriber_misses_events_without_blocking() {
        let mut publisher = EventPublisher::new(1);
        let sub = publisher.subscribe();

        publisher.publish(InstanceEvent::Resumed);
        publisher.publish(InstanceEvent::Suspended);
        assert_eq!(sub.drain(), vec![InstanceEvent::Resumed]);
        assert_eq!(publisher.subscriber_count(), 1);
    }

    #[test]
    fn test_processing_settings_payload() {
        let mut publisher = EventPublisher::default();
        let sub = publisher.subscribe();

        publisher.publish(InstanceEvent::ProcessingSettings(Some(
            InitializeProcessingSettings {
                sample_rate: 48_000.0,
            },
        )));
        publisher.publish(InstanceEvent::ProcessingSettings(None));

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            InstanceEvent::ProcessingSettings(Some(s)) if s.sample_rate == 48_000.0
        ));
        assert_eq!(events[1], InstanceEvent::ProcessingSettings(None));
    }
}
