//! Lock-free settings exchange between the control and realtime contexts.
//!
//! The control context edits [`EffectSettings`] at leisure (dialogs, automation,
//! undo) and then publishes them; the realtime context copies a coherent
//! snapshot at the start of each buffer. Values live in atomic slots guarded by
//! a sequence counter:
//!
//! - the writer makes the counter odd, stores every slot, then makes it even
//! - the reader retries while the counter is odd or changed during its copy
//!
//! # Real-Time Safety
//!
//! - `read_into()` never blocks and never allocates; after a bounded number
//!   of retries it gives up and keeps the previous snapshot
//! - the writer mutex only serializes concurrent publishers and is never
//!   touched by the realtime path

use std::sync::atomic::{fence, AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::settings::EffectSettings;
use crate::types::ParameterId;

/// How many times `read_into` retries before keeping the previous snapshot.
const MAX_READ_ATTEMPTS: usize = 4;

/// Largest parameter count a shared cell supports (staged on the stack).
pub const MAX_SHARED_PARAMETERS: usize = 64;

/// Shared, lock-free view of an effect's settings.
pub struct SharedSettings {
    ids: Vec<ParameterId>,
    values: Vec<AtomicU64>,
    active: AtomicBool,
    sequence: AtomicU64,
    writer: Mutex<()>,
}

impl SharedSettings {
    /// Create a cell holding a copy of `initial`.
    ///
    /// # Panics
    ///
    /// Panics if `initial` has more than [`MAX_SHARED_PARAMETERS`] slots.
    pub fn new(initial: &EffectSettings) -> Self {
        assert!(
            initial.len() <= MAX_SHARED_PARAMETERS,
            "Settings with {} parameters exceed MAX_SHARED_PARAMETERS ({})",
            initial.len(),
            MAX_SHARED_PARAMETERS
        );
        Self {
            ids: initial.slots().iter().map(|s| s.id).collect(),
            values: initial
                .slots()
                .iter()
                .map(|s| AtomicU64::new(s.value.to_bits()))
                .collect(),
            active: AtomicBool::new(initial.is_active()),
            sequence: AtomicU64::new(0),
            writer: Mutex::new(()),
        }
    }

    /// Number of completed publishes.
    #[inline]
    pub fn version(&self) -> u64 {
        self.sequence.load(Ordering::Acquire) / 2
    }

    /// Read only the active flag.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Whether `settings` can be published into or read from this cell.
    pub fn matches_layout(&self, settings: &EffectSettings) -> bool {
        settings.len() == self.ids.len()
            && settings
                .slots()
                .iter()
                .zip(self.ids.iter())
                .all(|(slot, id)| slot.id == *id)
    }

    /// Publish new settings (control context).
    ///
    /// Returns `false` if the layout does not match this cell.
    pub fn publish(&self, settings: &EffectSettings) -> bool {
        if !self.matches_layout(settings) {
            log::warn!("Refusing to publish settings with a foreign layout");
            return false;
        }

        let _guard = self.writer.lock();
        self.sequence.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);
        for (atomic, slot) in self.values.iter().zip(settings.slots()) {
            atomic.store(slot.value.to_bits(), Ordering::Relaxed);
        }
        self.active.store(settings.is_active(), Ordering::Relaxed);
        self.sequence.fetch_add(1, Ordering::Release);
        true
    }

    /// Copy a coherent snapshot into `dst` (realtime context).
    ///
    /// Returns `false` if the layout differs or a concurrent publish kept the
    /// snapshot from settling; `dst` then holds its previous values.
    pub fn read_into(&self, dst: &mut EffectSettings) -> bool {
        if !self.matches_layout(dst) {
            return false;
        }

        for _ in 0..MAX_READ_ATTEMPTS {
            let before = self.sequence.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let mut staged = [0u64; MAX_SHARED_PARAMETERS];
            for (slot, atomic) in staged.iter_mut().zip(&self.values) {
                *slot = atomic.load(Ordering::Relaxed);
            }
            let active = self.active.load(Ordering::Relaxed);

            fence(Ordering::Acquire);
            let after = self.sequence.load(Ordering::Relaxed);
            if before != after {
                continue;
            }

            for (index, bits) in staged[..self.values.len()].iter().enumerate() {
                dst.store_raw(index, f64::from_bits(*bits));
            }
            dst.set_active(active);
            return true;
        }
        false
    }

    /// Allocate a fresh snapshot (control context).
    pub fn snapshot(&self, template: &EffectSettings) -> Option<EffectSettings> {
        let mut copy = template.clone();
        let _guard = self.writer.lock();
        self.read_into(&mut copy).then_some(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ParameterSpec;
    use std::sync::Arc;
    use std::thread;

    static SPECS: &[ParameterSpec] = &[
        ParameterSpec::new(0, "A", 0.0, -1000.0, 1000.0),
        ParameterSpec::new(1, "B", 0.0, -1000.0, 1000.0),
        ParameterSpec::new(2, "C", 0.0, -1000.0, 1000.0),
    ];

    #[test]
    fn test_publish_then_read() {
        let template = EffectSettings::from_specs(SPECS);
        let shared = SharedSettings::new(&template);

        let mut edited = template.clone();
        edited.set(1, 5.0);
        edited.set_active(false);
        assert!(shared.publish(&edited));
        assert_eq!(shared.version(), 1);

        let mut snapshot = template.clone();
        assert!(shared.read_into(&mut snapshot));
        assert_eq!(snapshot.get(1), Some(5.0));
        assert!(!snapshot.is_active());
        assert!(!shared.is_active());
    }

    #[test]
    fn test_foreign_layout_rejected() {
        let shared = SharedSettings::new(&EffectSettings::from_specs(SPECS));
        let mut other = EffectSettings::from_specs(&SPECS[..2]);

        assert!(!shared.publish(&other));
        assert!(!shared.read_into(&mut other));
        assert_eq!(shared.version(), 0);
    }

    #[test]
    fn test_snapshot_allocates_copy() {
        let template = EffectSettings::from_specs(SPECS);
        let shared = SharedSettings::new(&template);
        let mut edited = template.clone();
        edited.set(2, -7.0);
        shared.publish(&edited);

        let snapshot = shared.snapshot(&template).unwrap();
        assert_eq!(snapshot, edited);
    }

    #[test]
    fn test_reader_never_observes_torn_write() {
        let template = EffectSettings::from_specs(SPECS);
        let shared = Arc::new(SharedSettings::new(&template));

        let writer = {
            let shared = Arc::clone(&shared);
            let template = template.clone();
            thread::spawn(move || {
                let mut settings = template;
                for i in 0..5_000 {
                    let v = (i % 1000) as f64;
                    settings.set(0, v);
                    settings.set(1, v);
                    settings.set(2, v);
                    shared.publish(&settings);
                }
            })
        };

        let mut snapshot = template.clone();
        for _ in 0..20_000 {
            if shared.read_into(&mut snapshot) {
                let a = snapshot.get(0).unwrap();
                assert_eq!(snapshot.get(1), Some(a));
                assert_eq!(snapshot.get(2), Some(a));
            }
        }
        writer.join().unwrap();
    }
}
