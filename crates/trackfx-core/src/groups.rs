//! Indexed collection of channel-group sub-instances with stable identifiers.
//!
//! Realtime processing keeps one independent copy of kernel state per channel
//! group (for example one per stereo pair). Groups are addressed by
//! [`GroupId`], a slot index paired with a generation counter, so removing a
//! group never shifts or re-targets the identifiers of the others, and a
//! stale identifier can never reach a group inserted later into the same slot.
//!
//! # Real-Time Safety
//!
//! - `get_mut()` is O(1) and never allocates
//! - `insert()` reuses free slots first and only grows past the reserved
//!   capacity when the caller did not reserve enough (control context)
//! - `remove()` hands the value back so it can be dropped elsewhere

use std::fmt;

/// Stable identifier of a processing group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId {
    index: u32,
    generation: u32,
}

impl GroupId {
    /// Slot index of this group.
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this id was handed out.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot collection keyed by [`GroupId`].
pub struct GroupTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> GroupTable<T> {
    /// Create an empty table (no capacity reserved).
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Create a table with room for `capacity` groups.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            len: 0,
        }
    }

    /// Reserve room for at least `additional` more groups.
    pub fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
        self.free.reserve(additional);
    }

    /// Number of live groups.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table holds no groups.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of groups that fit without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity().max(self.len)
    }

    /// Insert a group and return its identifier.
    pub fn insert(&mut self, value: T) -> GroupId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return GroupId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        GroupId {
            index,
            generation: 0,
        }
    }

    /// Remove a group, returning it if the id was live.
    pub fn remove(&mut self, id: GroupId) -> Option<T> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(value)
    }

    /// Whether `id` refers to a live group.
    #[inline]
    pub fn contains(&self, id: GroupId) -> bool {
        self.get(id).is_some()
    }

    /// Get a group by id.
    #[inline]
    pub fn get(&self, id: GroupId) -> Option<&T> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Get a mutable group by id.
    #[inline]
    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Iterate over live groups in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    GroupId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    /// Iterate mutably over live groups in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (GroupId, &mut T)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value.as_mut().map(|value| {
                (
                    GroupId {
                        index: index as u32,
                        generation,
                    },
                    value,
                )
            })
        })
    }

    /// Identifiers of all live groups in slot order.
    pub fn ids(&self) -> Vec<GroupId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Drop every group. Previously issued ids become stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.len = 0;
    }
}

impl<T> Default for GroupTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut table = GroupTable::with_capacity(4);
        let a = table.insert("a");
        let b = table.insert("b");

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(a), Some(&"a"));
        assert_eq!(table.get(b), Some(&"b"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_remove_keeps_other_ids_valid() {
        let mut table = GroupTable::new();
        let a = table.insert(1);
        let b = table.insert(2);
        let c = table.insert(3);

        assert_eq!(table.remove(b), Some(2));
        assert_eq!(table.get(a), Some(&1));
        assert_eq!(table.get(c), Some(&3));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_stale_id_never_aliases_new_group() {
        let mut table = GroupTable::new();
        let old = table.insert(10);
        table.remove(old);

        let new = table.insert(20);
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(table.get(old).is_none());
        assert!(table.remove(old).is_none());
        assert_eq!(table.get(new), Some(&20));
    }

    #[test]
    fn test_insert_within_capacity_does_not_grow() {
        let mut table = GroupTable::with_capacity(3);
        let capacity = table.capacity();
        for i in 0..3 {
            table.insert(i);
        }
        assert_eq!(table.capacity(), capacity);
    }

    #[test]
    fn test_clear_invalidates_ids() {
        let mut table = GroupTable::new();
        let ids: Vec<_> = (0..3).map(|i| table.insert(i)).collect();
        table.clear();

        assert!(table.is_empty());
        for id in ids {
            assert!(!table.contains(id));
        }
        let fresh = table.insert(99);
        assert_eq!(table.get(fresh), Some(&99));
    }

    #[test]
    fn test_iter_mut_touches_only_live_groups() {
        let mut table = GroupTable::new();
        let a = table.insert(1);
        let b = table.insert(2);
        table.remove(a);

        for (_, value) in table.iter_mut() {
            *value *= 10;
        }
        assert_eq!(table.ids(), vec![b]);
        assert_eq!(table.get(b), Some(&20));
    }
}
