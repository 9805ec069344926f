//! Kestrel Microkernel Notification Subsystem
//!
//! Bounded-latency asynchronous event delivery for the Kestrel kernel.
//! Producers in interrupt, softirq, or thread context signal blocked threads
//! without the cost of full IPC.
//!
//! # Architecture
//!
//! Three layers, each bottoming out in the one below:
//!
//! 1. **Direct notification bits** ([`notify::bits`]): per-thread sticky
//!    32-bit flag word plus a one-word `pending` cache, mutated under brief
//!    IRQ-masked critical sections. The fast path.
//! 2. **Asynchronous event queue** ([`notify::NotifySubsystem::post`]):
//!    fixed-capacity event pool drained in bounded batches by the deferred
//!    (softirq) handler. Best-effort, drop-on-overload.
//! 3. **Notification mask groups** ([`notify::NotifyMask`]): named flag sets
//!    with up to [`config::MAX_WAITERS`] concurrent waiters, each with its
//!    own OR/AND condition, resolved synchronously on every flag change.
//!
//! # External Collaborators
//!
//! The scheduler, thread lookup, and softirq executor are not part of this
//! crate. They are reached through the [`notify::KernelServices`] trait:
//! safe lookup by [`objects::ThreadId`] (never a retained pointer), run-queue
//! hand-off, and idempotent softirq scheduling. The crate ships
//! [`objects::ThreadTable`], the generation-checked arena that backs the
//! lookup side of that seam.
//!
//! # Concurrency Model
//!
//! Single logical core, preemptive, interrupt-driven. Every mutating
//! operation brackets itself in the same IRQ-masking critical section
//! ([`arch::irq_lock`]) regardless of caller context; critical sections are
//! O(1) or O(`MAX_WAITERS`). A multi-core port must replace each masked
//! section with a spinlock scoped to the structure it protects.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod debug;
pub mod notify;
pub mod objects;

// Re-export main types
pub use notify::{ExecContext, KernelServices, NotifyError, NotifyStats, NotifySubsystem};
pub use notify::{NotifyMask, WaitMode};
pub use notify::bits::{NotifyBit, NotifyEvent};
pub use objects::{Tcb, ThreadId, ThreadState, ThreadTable};
