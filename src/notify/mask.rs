//! Notification mask groups (multi-bit aggregation)
//!
//! A mask group is a named 32-bit flag set with a bounded table of waiters.
//! Each waiter brings its own OR/AND condition; every `set` re-evaluates
//! all of them and delivers through the async queue to those now satisfied.
//!
//! Notification is level-triggered by design: a satisfied waiter stays
//! registered and is notified again on every future `set` that still
//! satisfies its condition, until it explicitly unregisters. Callers that
//! loop wait-drain-wait depend on the persistent registration.
//!
//! SAFETY: waiter slots store thread ids (not pointers). If a waiter is
//! destroyed while registered, the next `set` detects the stale id via the
//! thread table and clears the slot.

use crate::arch;
use crate::config::MAX_WAITERS;
use crate::objects::ThreadId;

/// Wait condition mode for a mask-group waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Satisfied when ANY requested flag is set
    Or,
    /// Satisfied when ALL requested flags are set
    And,
}

/// One waiter registration. `thread == ThreadId::NIL` marks an empty slot.
#[derive(Clone, Copy)]
pub(super) struct WaiterSlot {
    pub(super) thread: ThreadId,
    pub(super) mask: u32,
    pub(super) mode: WaitMode,
    pub(super) notify_bit: u32,
}

impl WaiterSlot {
    pub(super) const EMPTY: WaiterSlot = WaiterSlot {
        thread: ThreadId::NIL,
        mask: 0,
        mode: WaitMode::Or,
        notify_bit: 0,
    };
}

/// Check whether a waiter's condition is satisfied by the current flags.
#[inline]
pub(super) fn condition_met(current_flags: u32, mask: u32, mode: WaitMode) -> bool {
    match mode {
        WaitMode::Or => (current_flags & mask) != 0,
        WaitMode::And => (current_flags & mask) == mask,
    }
}

/// Notification mask group: shared flags plus a bounded waiter table
pub struct NotifyMask {
    /// Group id (monotonic, debug/display only)
    pub(super) id: u32,
    /// Debug name
    pub(super) name: &'static str,
    /// Current flag state
    pub(super) current_flags: u32,
    pub(super) waiters: [WaiterSlot; MAX_WAITERS],
    /// Count of occupied waiter slots
    pub(super) num_waiters: u8,
}

impl NotifyMask {
    pub(super) const fn new(id: u32, name: &'static str) -> Self {
        Self {
            id,
            name,
            current_flags: 0,
            waiters: [WaiterSlot::EMPTY; MAX_WAITERS],
            num_waiters: 0,
        }
    }

    /// Group id (debug/display only, not used for correctness)
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Debug name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the current flags (non-destructive masked read)
    pub fn get(&self) -> u32 {
        let _irq = arch::irq_lock();
        self.current_flags
    }

    /// Number of active waiters
    pub fn waiter_count(&self) -> u8 {
        let _irq = arch::irq_lock();
        self.num_waiters
    }

    /// Clear every waiter slot. Must run inside the caller's critical section.
    pub(super) fn clear_waiter_slots(&mut self) {
        self.num_waiters = 0;
        self.waiters = [WaiterSlot::EMPTY; MAX_WAITERS];
    }
}

impl core::fmt::Debug for NotifyMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotifyMask")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("current_flags", &format_args!("{:#x}", self.current_flags))
            .field("num_waiters", &self.num_waiters)
            .finish()
    }
}
