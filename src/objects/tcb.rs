//! Thread Control Block (TCB)
//!
//! TCBs represent threads of execution. This crate only defines the slice
//! of the TCB the notification subsystem consumes: identity, scheduling
//! state, and the notification fields. The full TCB (CPU context, address
//! spaces, IPC buffer) lives in the kernel proper; the subsystem never
//! looks at those parts.
//!
//! ## Notification Fields
//!
//! - `notify_bits`: sticky OR-accumulated event flags, cleared only by an
//!   explicit consumer read-and-clear.
//! - `notify_data`: auxiliary payload of the most recent delivery (last
//!   writer wins, not accumulated).
//! - `notify_pending`: cache of `notify_bits != 0`, recomputed on every
//!   mutation so the hot IPC path can test one word.
//! - `ipc_notify`: optional kernel-internal callback run after IPC
//!   delivery. MUST never point into user space.
//!
//! All of these are reset when a thread is created; on destruction the
//! record simply disappears and any id still referencing it goes stale.

use super::ThreadId;

/// Notification callback signature.
///
/// Called after notification delivery, with interrupts enabled. Takes the
/// owning thread's id rather than a TCB reference so the handler can
/// re-resolve the thread through the table without aliasing a live borrow.
///
/// SAFETY: must be an internal kernel handler, never a user-space pointer,
/// and must not destroy its own thread.
pub type NotifyHandler = fn(thread: ThreadId, bits: u32, data: u32);

/// Thread Control Block - represents a thread of execution
pub struct Tcb {
    /// Stable identifier; reusable only after this thread is destroyed
    tid: ThreadId,

    /// Thread state
    state: ThreadState,

    /// Thread priority (0 = highest, 255 = lowest)
    priority: u8,

    /// Sticky notification flags (OR-accumulated)
    pub(crate) notify_bits: u32,

    /// Payload of the most recent async delivery (last writer wins)
    pub(crate) notify_data: u32,

    /// Cache of `notify_bits != 0`
    pub(crate) notify_pending: bool,

    /// Optional post-IPC notification callback (kernel-internal only)
    pub(crate) ipc_notify: Option<NotifyHandler>,
}

/// Thread state - lifecycle states of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Thread is not scheduled (initial state or terminated)
    Inactive,

    /// Thread is ready to run but not currently scheduled
    Runnable,

    /// Thread is currently running on the CPU
    Running,

    /// Thread is blocked waiting to receive an IPC message
    BlockedOnReceive,

    /// Thread is blocked waiting for notification bits to arrive
    BlockedOnNotification,
}

impl Tcb {
    /// Default priority for new threads
    pub const DEFAULT_PRIORITY: u8 = 128;

    /// Create a new TCB in the Inactive state with empty notification state
    pub(crate) const fn new(tid: ThreadId, priority: u8) -> Self {
        Self {
            tid,
            state: ThreadState::Inactive,
            priority,
            notify_bits: 0,
            notify_data: 0,
            notify_pending: false,
            ipc_notify: None,
        }
    }

    /// Get the thread id
    #[inline]
    pub fn tid(&self) -> ThreadId {
        self.tid
    }

    /// Get the thread state
    #[inline]
    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Set the thread state
    #[inline]
    pub fn set_state(&mut self, state: ThreadState) {
        self.state = state;
    }

    /// Get the thread priority
    #[inline]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Set the thread priority
    #[inline]
    pub fn set_priority(&mut self, priority: u8) {
        self.priority = priority;
    }

    /// Fast-path check: does this thread have any notification pending?
    ///
    /// One-word read maintained by the notification layer; equals
    /// `notify_bits != 0` after every mutation.
    #[inline]
    pub fn notify_pending(&self) -> bool {
        self.notify_pending
    }

    /// Check if the thread is blocked
    #[inline]
    pub fn is_blocked(&self) -> bool {
        matches!(
            self.state,
            ThreadState::BlockedOnReceive | ThreadState::BlockedOnNotification
        )
    }

    /// Block the thread waiting for notification bits
    pub fn block_on_notification(&mut self) {
        self.state = ThreadState::BlockedOnNotification;
    }

    /// Unblock the thread (make it runnable)
    pub fn unblock(&mut self) {
        if self.is_blocked() {
            self.state = ThreadState::Runnable;
        }
    }
}

impl core::fmt::Debug for Tcb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tcb")
            .field("tid", &self.tid)
            .field("state", &self.state)
            .field("priority", &self.priority)
            .field("notify_bits", &format_args!("{:#x}", self.notify_bits))
            .field("notify_data", &format_args!("{:#x}", self.notify_data))
            .field("notify_pending", &self.notify_pending)
            .finish()
    }
}
