//! Kernel object model
//!
//! The two objects the notification subsystem works against:
//!
//! - **TCB**: the per-thread state record. The subsystem owns the TCB's
//!   notification fields exclusively while the thread exists; everything
//!   else on the TCB belongs to the (external) thread and scheduler code.
//! - **ThreadTable**: a generation-checked arena mapping [`ThreadId`] to a
//!   live TCB, or to nothing once the thread is destroyed. Every reference
//!   the subsystem retains across a yield point is a `ThreadId`, never a
//!   pointer; stale ids fail lookup cleanly and the referencing state
//!   self-heals.

pub mod tcb;
pub mod thread_table;

// Re-export main types
pub use tcb::{NotifyHandler, Tcb, ThreadState};
pub use thread_table::{ThreadId, ThreadTable};
