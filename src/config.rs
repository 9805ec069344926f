//! Compile-time configuration
//!
//! All capacities here are fixed at build time. Nothing in the subsystem
//! resizes dynamically: under load the only failure mode is the documented
//! `QueueFull`/`GroupFull`, never an allocation surprise.

/// Capacity of the asynchronous event pool.
///
/// When the pool is exhausted, `post` fails with `QueueFull` and the event
/// is dropped (best-effort delivery). Size this for the worst burst of
/// producers between two softirq passes.
pub const MAX_NOTIFICATIONS: usize = 16;

/// Maximum events delivered per `drain_batch` invocation.
///
/// Bounds the worst-case execution time of one softirq pass; a deeper
/// backlog is drained over several passes via reschedule. Raising this
/// trades drain throughput against softirq latency.
pub const BATCH_SIZE: usize = 4;

/// Waiter slots per notification mask group.
pub const MAX_WAITERS: usize = 8;

/// Capacity of the thread table arena.
pub const MAX_THREADS: usize = 32;

/// Maximum queued events enumerated by the KDB dump.
#[cfg(feature = "kdb")]
pub const KDB_MAX_PENDING_DISPLAY: usize = 10;
