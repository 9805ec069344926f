//! Thread table: generation-checked TCB arena
//!
//! The subsystem never stores a TCB pointer across a yield point; it stores
//! a [`ThreadId`] and re-resolves it here at time of use. An id is an arena
//! index plus the generation the slot had when the thread was created.
//! Destroying a thread bumps the slot generation, so every id minted before
//! then fails lookup from that point on - the systems-language equivalent
//! of a weak reference with a liveness check.
//!
//! Queued async events and mask-group waiter slots both rely on this:
//! when lookup returns `None` they drop the event or clear the slot instead
//! of ever touching stale state.

use super::tcb::Tcb;
use crate::config::MAX_THREADS;

/// Stable thread identifier: 16-bit arena index + 16-bit generation.
///
/// Generations start at 1, so no valid id ever equals [`ThreadId::NIL`]
/// (raw value 0). An id is only reusable after the thread it named has been
/// destroyed, and the generation check makes the stale id harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadId(u32);

impl ThreadId {
    /// The nil thread: matches no live thread, used as an empty-slot sentinel
    pub const NIL: ThreadId = ThreadId(0);

    pub(crate) const fn from_parts(index: u16, generation: u16) -> Self {
        ThreadId(((generation as u32) << 16) | index as u32)
    }

    /// Arena index component
    #[inline]
    pub fn index(self) -> usize {
        (self.0 & 0xffff) as usize
    }

    /// Generation component
    #[inline]
    pub fn generation(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Check for the nil sentinel
    #[inline]
    pub fn is_nil(self) -> bool {
        self.0 == 0
    }

    /// Raw 32-bit representation (debug/display)
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_nil() {
            write!(f, "nil")
        } else {
            write!(f, "{}.{}", self.index(), self.generation())
        }
    }
}

struct Slot {
    /// Generation the next thread created in this slot will get
    generation: u16,
    tcb: Option<Tcb>,
}

const EMPTY_SLOT: Slot = Slot {
    generation: 1,
    tcb: None,
};

/// Fixed-capacity arena of thread records, addressed by [`ThreadId`]
pub struct ThreadTable {
    slots: [Slot; MAX_THREADS],
    live: u32,
}

impl ThreadTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            slots: [EMPTY_SLOT; MAX_THREADS],
            live: 0,
        }
    }

    /// Create a thread with empty notification state.
    ///
    /// Returns `None` when the arena is full.
    pub fn create(&mut self, priority: u8) -> Option<ThreadId> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.tcb.is_none() {
                let tid = ThreadId::from_parts(i as u16, slot.generation);
                slot.tcb = Some(Tcb::new(tid, priority));
                self.live += 1;
                return Some(tid);
            }
        }
        None
    }

    /// Destroy a thread, invalidating every outstanding copy of its id.
    ///
    /// Returns false if the id is already stale.
    pub fn destroy(&mut self, id: ThreadId) -> bool {
        let index = id.index();
        if id.is_nil() || index >= MAX_THREADS {
            return false;
        }
        let slot = &mut self.slots[index];
        if slot.tcb.is_none() || slot.generation != id.generation() {
            return false;
        }
        slot.tcb = None;
        // Generation 0 is reserved for the nil id
        slot.generation = match slot.generation.wrapping_add(1) {
            0 => 1,
            g => g,
        };
        self.live -= 1;
        true
    }

    /// Resolve an id to a live thread, or discover it no longer exists.
    pub fn get(&self, id: ThreadId) -> Option<&Tcb> {
        let index = id.index();
        if id.is_nil() || index >= MAX_THREADS {
            return None;
        }
        let slot = &self.slots[index];
        if slot.generation != id.generation() {
            return None;
        }
        slot.tcb.as_ref()
    }

    /// Mutable variant of [`get`](Self::get)
    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut Tcb> {
        let index = id.index();
        if id.is_nil() || index >= MAX_THREADS {
            return None;
        }
        let slot = &mut self.slots[index];
        if slot.generation != id.generation() {
            return None;
        }
        slot.tcb.as_mut()
    }

    /// Number of live threads
    #[inline]
    pub fn len(&self) -> usize {
        self.live as usize
    }

    /// True when no threads are live
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ThreadState;

    #[test]
    fn create_and_lookup() {
        let mut table = ThreadTable::new();

        let tid = table.create(10).unwrap();
        assert!(!tid.is_nil());
        assert_eq!(table.len(), 1);

        let tcb = table.get(tid).unwrap();
        assert_eq!(tcb.tid(), tid);
        assert_eq!(tcb.priority(), 10);
        assert_eq!(tcb.state(), ThreadState::Inactive);
    }

    #[test]
    fn destroyed_id_goes_stale() {
        let mut table = ThreadTable::new();

        let tid = table.create(0).unwrap();
        assert!(table.destroy(tid));

        assert!(table.get(tid).is_none());
        assert!(table.get_mut(tid).is_none());
        assert!(!table.destroy(tid));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn slot_reuse_does_not_revive_old_id() {
        let mut table = ThreadTable::new();

        let old = table.create(0).unwrap();
        table.destroy(old);

        // Same slot, new generation
        let new = table.create(0).unwrap();
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());

        assert!(table.get(old).is_none());
        assert!(table.get(new).is_some());
    }

    #[test]
    fn nil_id_never_resolves() {
        let mut table = ThreadTable::new();
        table.create(0).unwrap();

        assert!(table.get(ThreadId::NIL).is_none());
        assert!(table.get_mut(ThreadId::NIL).is_none());
        assert!(!table.destroy(ThreadId::NIL));
    }

    #[test]
    fn table_exhaustion() {
        let mut table = ThreadTable::new();

        for _ in 0..crate::config::MAX_THREADS {
            assert!(table.create(0).is_some());
        }
        assert!(table.create(0).is_none());
        assert_eq!(table.len(), crate::config::MAX_THREADS);
    }
}
