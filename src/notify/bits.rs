//! Direct notification bits (fast path)
//!
//! Maintains each thread's sticky flag word and its `pending` cache under
//! minimal IRQ-masked critical sections.
//!
//! ATOMICITY:
//! - Aligned 32-bit reads/writes are atomic on the target (platform
//!   assumption; a port to hardware without this guarantee must wrap the
//!   plain loads/stores below in the same masking as the read-modify-write
//!   operations).
//! - IRQ masking is only needed where two accesses must be observed
//!   together: read-modify-write, and the bits/data pair read.
//!
//! API CONSTRAINTS:
//! - Every operation takes an optional handle and is a silent no-op on
//!   `None`: callers are trusted kernel code on a hot path.
//! - Callbacks must be kernel-internal handlers only, and must not destroy
//!   their own thread.
//! - All operations may be called from any context (IRQ-safe), and none of
//!   them blocks, allocates, or fails partway.

use bitflags::bitflags;
use core::sync::atomic::{fence, Ordering};

use crate::arch;
use crate::objects::{NotifyHandler, Tcb};

bitflags! {
    /// Well-known notification bit assignments used by kernel event sources.
    ///
    /// Bits 0-30 are direct event flags; low hardware IRQs map to the bit at
    /// their own position. Bit 31 is the high-IRQ sentinel: for IRQs >= 31
    /// the sentinel is signaled and the actual IRQ number travels in the
    /// event payload word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NotifyBit: u32 {
        /// Kernel timer expiry
        const TIMER = 1 << 0;
        /// IPC readiness
        const IPC = 1 << 1;
        /// High-IRQ sentinel; IRQ number is carried in `notify_data`
        const HIGH_IRQ = 1 << 31;
    }
}

/// A consistent snapshot of a thread's notification word and payload.
///
/// The payload belongs to the delivery that set those bits, which is why
/// the two fields are only ever read together under masking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotifyEvent {
    /// Notification bit mask that was signaled
    pub bits: u32,
    /// Event-specific payload (e.g. the IRQ number for high IRQs)
    pub data: u32,
}

/// Recompute the `notify_pending` cache from `notify_bits`.
///
/// Must be called inside the same critical section as the mutation.
#[inline]
pub(crate) fn update_notify_pending(tcb: &mut Tcb) {
    tcb.notify_pending = tcb.notify_bits != 0;
}

/// Register the post-IPC notification callback (`None` to disable).
///
/// Plain aligned store; the fence orders it before any subsequent
/// cross-context read (another execution context may observe the callback
/// concurrently).
pub fn set_ipc_callback(thread: Option<&mut Tcb>, handler: Option<NotifyHandler>) {
    let Some(tcb) = thread else { return };

    tcb.ipc_notify = handler;
    fence(Ordering::Release);
}

/// Get the current notification callback, if any.
pub fn get_ipc_callback(thread: Option<&Tcb>) -> Option<NotifyHandler> {
    thread.and_then(|tcb| tcb.ipc_notify)
}

/// Signal notification bits: `notify_bits |= bits`.
///
/// Masked for the duration of the read-modify-write; OR is not a single
/// atomic operation on a plain load/store machine.
pub fn signal(thread: Option<&mut Tcb>, bits: u32) {
    let Some(tcb) = thread else { return };

    let _irq = arch::irq_lock();
    tcb.notify_bits |= bits;
    update_notify_pending(tcb);
}

/// Clear notification bits: `notify_bits &= !bits`.
pub fn clear(thread: Option<&mut Tcb>, bits: u32) {
    let Some(tcb) = thread else { return };

    let _irq = arch::irq_lock();
    tcb.notify_bits &= !bits;
    update_notify_pending(tcb);
}

/// Snapshot the current notification bits.
///
/// Plain aligned load; an eventually-consistent snapshot is acceptable.
pub fn get(thread: Option<&Tcb>) -> u32 {
    match thread {
        Some(tcb) => tcb.notify_bits,
        None => 0,
    }
}

/// Read the notification bits together with the event payload.
///
/// Masked even though each field is individually safe to read: the pair
/// must be observed consistently.
pub fn get_extended(thread: Option<&Tcb>) -> NotifyEvent {
    let Some(tcb) = thread else {
        return NotifyEvent::default();
    };

    let _irq = arch::irq_lock();
    NotifyEvent {
        bits: tcb.notify_bits,
        data: tcb.notify_data,
    }
}

/// Atomically read the notification bits and clear `mask`.
///
/// Closes the lost-wakeup race: without a single critical section, a
/// consumer could read the bits, an ISR could signal a new bit, and a
/// subsequent plain clear of the old mask would erase it.
pub fn read_and_clear(thread: Option<&mut Tcb>, mask: u32) -> u32 {
    let Some(tcb) = thread else { return 0 };

    let _irq = arch::irq_lock();
    let bits = tcb.notify_bits;
    tcb.notify_bits &= !mask;
    update_notify_pending(tcb);
    bits
}
