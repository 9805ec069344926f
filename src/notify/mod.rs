//! Unified notification subsystem
//!
//! Three delivery layers, each bottoming out in the one below:
//!
//! 1. Direct bits ([`bits`]): masked read-modify-write on a thread's sticky
//!    flag word. Synchronous, minimal overhead.
//! 2. Async queue ([`NotifySubsystem::post`] / [`NotifySubsystem::drain_batch`]):
//!    queue-based delivery with RT-safe bounded batch processing in softirq
//!    context, plus a softirq-only fast path that skips allocation.
//! 3. Mask groups ([`NotifyMask`]): multi-bit flag aggregation with OR/AND
//!    wait semantics and multi-source coordination, delivering through the
//!    async queue.
//!
//! The scheduler, thread lookup, and softirq executor are external; the
//! subsystem reaches them through [`KernelServices`]. All cross-context
//! references are thread ids resolved at time of use - a destroyed target
//! is routine cleanup (drop the event, clear the slot), never an error.

pub mod bits;
mod mask;
mod queue;

pub use mask::{NotifyMask, WaitMode};

use core::fmt;

use crate::arch;
use crate::config::{BATCH_SIZE, MAX_NOTIFICATIONS, MAX_WAITERS};
use crate::knotify_debug;
use crate::objects::{Tcb, ThreadId, ThreadState};

use mask::{condition_met, WaiterSlot};
use queue::EventQueue;

/// Execution contexts, ordered by restriction.
///
/// Hard IRQ context may call `signal`/`clear`/`post` but never the fast
/// path or anything that blocks. Softirq context may call everything; it is
/// where `drain_batch` runs. Thread context may call everything but must
/// not assume it runs uninterrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecContext {
    /// Hard interrupt handler (most restricted)
    Irq,
    /// Deferred/softirq handler
    Softirq,
    /// Normal thread context
    Thread,
}

/// Seam to the external thread, scheduler, and softirq collaborators.
///
/// The subsystem never retains a TCB reference across a yield point; it
/// stores [`ThreadId`]s and re-resolves them here. `thread_by_id` returning
/// `None` for a destroyed thread is the cornerstone safety contract the
/// whole design relies on.
pub trait KernelServices {
    /// Resolve an id to a live thread, or `None` once it is destroyed.
    fn thread_by_id(&mut self, id: ThreadId) -> Option<&mut Tcb>;

    /// Hand a thread the subsystem just made runnable to the run queue.
    fn sched_enqueue(&mut self, id: ThreadId);

    /// Schedule the notification drain handler to run in softirq context.
    /// Idempotent: scheduling an already-pending handler is a no-op.
    fn softirq_schedule(&mut self);

    /// The execution context the caller is currently running in.
    fn current_context(&self) -> ExecContext;
}

/// Notification subsystem errors. All local and recoverable; none are
/// fatal to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    /// Async event pool exhausted at post time (best-effort channel:
    /// callers must tolerate drops under sustained overload)
    QueueFull,
    /// No free waiter slot in the mask group
    GroupFull,
    /// Unwait for a thread with no registered slot
    NotWaiting,
    /// Fast path called from a disallowed execution context (programming
    /// contract violation; also trips a debug assertion)
    BadContext,
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::QueueFull => write!(f, "async event pool exhausted"),
            NotifyError::GroupFull => write!(f, "no free waiter slot in mask group"),
            NotifyError::NotWaiting => write!(f, "thread is not a registered waiter"),
            NotifyError::BadContext => write!(f, "fast path called from IRQ context"),
        }
    }
}

/// Aggregate counters (debug/profiling). Read-only instrumentation; no
/// effect on correctness.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyStats {
    /// Events accepted by `post`/`post_fast`
    pub posted: u32,
    /// Events delivered to a live target
    pub delivered: u32,
    /// Events dropped (pool exhausted, or target destroyed before drain)
    pub dropped: u32,
    /// `drain_batch` invocations
    pub batches: u32,
    /// Softirq reschedules (queue still non-empty after a batch)
    pub reschedules: u32,
    /// Mask groups created
    pub mask_created: u32,
    /// Mask groups deleted
    pub mask_deleted: u32,
    /// Mask `set` operations
    pub mask_sets: u32,
    /// Mask `clear` operations
    pub mask_clears: u32,
    /// Waiter registrations (new slots only, not updates)
    pub mask_waits: u32,
    /// Waiter unregistrations
    pub mask_unwaits: u32,
    /// Notifications generated by mask groups
    pub mask_notifications: u32,
}

impl NotifyStats {
    const fn new() -> Self {
        Self {
            posted: 0,
            delivered: 0,
            dropped: 0,
            batches: 0,
            reschedules: 0,
            mask_created: 0,
            mask_deleted: 0,
            mask_sets: 0,
            mask_clears: 0,
            mask_waits: 0,
            mask_unwaits: 0,
            mask_notifications: 0,
        }
    }
}

/// Wake a thread if it is blocked waiting for notification bits.
///
/// Returns true when the caller must hand the thread to the run queue.
/// Threads blocked on IPC receive are NOT woken - they are waiting for a
/// message, not for bits.
fn wake_if_blocked(tcb: &mut Tcb) -> bool {
    if tcb.state() == ThreadState::BlockedOnNotification {
        tcb.set_state(ThreadState::Runnable);
        true
    } else {
        false
    }
}

/// Process-wide notification state: event pool, FIFO, counters, group id
/// allocator. One instance per kernel, normally [`NOTIFY`].
pub struct NotifySubsystem {
    queue: EventQueue,
    stats: NotifyStats,
    mask_id_counter: u32,
}

/// Global subsystem instance.
///
/// Single-owner-at-a-time access: lock from one execution context and
/// release before yielding. Interrupt handlers must not contend for this
/// lock while the owning context holds it.
pub static NOTIFY: spin::Mutex<NotifySubsystem> = spin::Mutex::new(NotifySubsystem::new());

impl NotifySubsystem {
    /// Create an empty subsystem (all pools free, all counters zero)
    pub const fn new() -> Self {
        Self {
            queue: EventQueue::new(),
            stats: NotifyStats::new(),
            mask_id_counter: 0,
        }
    }

    /// Post an asynchronous event to a target thread.
    ///
    /// Queues the event for softirq delivery and schedules the drain
    /// handler. If the pool is exhausted the event is dropped and
    /// `QueueFull` returned: this is a best-effort channel and a real-time
    /// kernel cannot block an interrupt-adjacent producer on queue space.
    ///
    /// IRQ-safe, callable from any context.
    pub fn post(
        &mut self,
        env: &mut dyn KernelServices,
        target: ThreadId,
        bits: u32,
        data: u32,
    ) -> Result<(), NotifyError> {
        // Nil target: trusted-caller no-op, same as the direct-bits layer
        if target.is_nil() {
            return Ok(());
        }

        let _irq = arch::irq_lock();

        let Some(idx) = self.queue.alloc() else {
            self.stats.dropped += 1;
            knotify_debug!("notify: event dropped (queue full) for thread {}", target);
            return Err(NotifyError::QueueFull);
        };

        let event = self.queue.event_mut(idx);
        event.target = target;
        event.bits = bits;
        event.data = data;
        self.queue.push_back(idx);
        self.stats.posted += 1;

        env.softirq_schedule();

        knotify_debug!(
            "notify: posted event to {} bits={:#x} data={:#x}",
            target,
            bits,
            data
        );

        Ok(())
    }

    /// Fast-path delivery, bypassing the async queue.
    ///
    /// Signals the bits directly and wakes the target if it is blocked
    /// waiting for events. Usable from softirq or thread context only -
    /// calling it from a hard IRQ handler is a contract violation, reported
    /// via a debug assertion and `BadContext`, never silently routed to the
    /// slow path (the contract exists to bound latency in this context).
    ///
    /// A target that no longer resolves is the routine no-op, as in the
    /// direct-bits layer.
    pub fn post_fast(
        &mut self,
        env: &mut dyn KernelServices,
        target: ThreadId,
        bits: u32,
    ) -> Result<(), NotifyError> {
        if env.current_context() == ExecContext::Irq {
            debug_assert!(false, "post_fast called from IRQ context");
            return Err(NotifyError::BadContext);
        }

        let Some(tcb) = env.thread_by_id(target) else {
            return Ok(());
        };

        bits::signal(Some(tcb), bits);
        let wake = wake_if_blocked(tcb);
        if wake {
            env.sched_enqueue(target);
        }

        self.stats.posted += 1;
        self.stats.delivered += 1;

        knotify_debug!("notify: fast-path delivery to {} bits={:#x}", target, bits);

        Ok(())
    }

    /// Softirq handler: drain one bounded batch from the event queue.
    ///
    /// Performs at most [`BATCH_SIZE`] pop-and-process iterations
    /// regardless of queue depth, then reschedules itself if events remain.
    /// This bounds worst-case time per invocation while still draining an
    /// arbitrarily deep backlog over several passes.
    ///
    /// Returns the number of events delivered to live targets.
    pub fn drain_batch(&mut self, env: &mut dyn KernelServices) -> u32 {
        self.stats.batches += 1;
        let mut delivered = 0;

        for _ in 0..BATCH_SIZE {
            let idx = {
                let _irq = arch::irq_lock();
                match self.queue.pop_front() {
                    Some(idx) => idx,
                    None => break,
                }
            };

            let (target, bits, data) = {
                let event = self.queue.event(idx);
                (event.target, event.bits, event.data)
            };

            // Resolve outside the critical section; the target may have
            // been destroyed while the event sat in the queue.
            let wake = match env.thread_by_id(target) {
                None => {
                    knotify_debug!("notify: dropping event for dead thread {}", target);
                    let _irq = arch::irq_lock();
                    self.queue.free(idx);
                    self.stats.dropped += 1;
                    continue;
                }
                Some(tcb) => {
                    let irq = arch::irq_lock();
                    tcb.notify_bits |= bits;
                    // Last writer wins: payload is advisory context for
                    // the bits, not a reliable message channel.
                    tcb.notify_data = data;
                    bits::update_notify_pending(tcb);
                    drop(irq);

                    wake_if_blocked(tcb)
                }
            };

            {
                let _irq = arch::irq_lock();
                self.queue.free(idx);
            }
            if wake {
                env.sched_enqueue(target);
            }
            delivered += 1;
        }

        self.stats.delivered += delivered;

        if !self.queue.is_fifo_empty() {
            env.softirq_schedule();
            self.stats.reschedules += 1;
            knotify_debug!(
                "notify: queue still has events, rescheduling (reschedules={})",
                self.stats.reschedules
            );
        }

        delivered
    }

    /// Number of pending async events. O(1) snapshot; may be stale by the
    /// time the caller acts on it.
    #[inline]
    pub fn queue_depth(&self) -> u32 {
        self.queue.depth()
    }

    /// Check whether the event pool is exhausted. O(1) snapshot.
    #[inline]
    pub fn queue_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Create a notification mask group: zero flags, all waiter slots
    /// empty, fresh id.
    pub fn mask_create(&mut self, name: &'static str) -> NotifyMask {
        let _irq = arch::irq_lock();
        self.mask_id_counter += 1;
        self.stats.mask_created += 1;
        knotify_debug!("notify: created mask group {} ({})", self.mask_id_counter, name);
        NotifyMask::new(self.mask_id_counter, name)
    }

    /// Delete a mask group: clears all waiter slots and flags without
    /// notifying anyone. Callers must not delete a group another thread
    /// still expects to be notified by.
    pub fn mask_delete(&mut self, group: &mut NotifyMask) {
        let _irq = arch::irq_lock();
        knotify_debug!("notify: deleting mask group {} ({})", group.id, group.name);
        group.clear_waiter_slots();
        group.current_flags = 0;
        group.id = 0;
        self.stats.mask_deleted += 1;
    }

    /// Set flags in a mask group (OR with current), then scan every
    /// occupied waiter slot and deliver to those now satisfied.
    ///
    /// Waiter slots whose thread no longer resolves are cleared in passing
    /// (self-healing). A satisfied slot is NOT removed: notification is
    /// level-triggered, and the waiter will be notified again by any future
    /// `set` that still satisfies its condition, until it unregisters.
    pub fn mask_set(
        &mut self,
        group: &mut NotifyMask,
        env: &mut dyn KernelServices,
        flags_to_set: u32,
    ) {
        let _irq = arch::irq_lock();

        group.current_flags |= flags_to_set;
        self.stats.mask_sets += 1;

        knotify_debug!(
            "notify: set flags in group {}: |= {:#x} -> {:#x}",
            group.id,
            flags_to_set,
            group.current_flags
        );

        for i in 0..MAX_WAITERS {
            let slot = group.waiters[i];
            if slot.thread.is_nil() {
                continue;
            }

            // Safe lookup handles waiter destruction: clear the slot and
            // move on, never dereference stale state.
            if env.thread_by_id(slot.thread).is_none() {
                knotify_debug!(
                    "notify: waiter {} destroyed, clearing slot {} in group {}",
                    slot.thread,
                    i,
                    group.id
                );
                group.waiters[i] = WaiterSlot::EMPTY;
                group.num_waiters -= 1;
                continue;
            }

            if !condition_met(group.current_flags, slot.mask, slot.mode) {
                continue;
            }

            // Slot is retained after satisfaction (level-triggered).
            let _ = self.post(env, slot.thread, slot.notify_bit, group.current_flags);
            self.stats.mask_notifications += 1;
        }
    }

    /// Clear flags in a mask group (AND NOT with current).
    ///
    /// Never scans or notifies waiters: clearing can only make conditions
    /// less satisfied, never newly satisfied.
    pub fn mask_clear(&mut self, group: &mut NotifyMask, flags_to_clear: u32) {
        let _irq = arch::irq_lock();
        group.current_flags &= !flags_to_clear;
        self.stats.mask_clears += 1;
    }

    /// Register a thread to wait for mask-group flags, or update its
    /// existing registration in place (a thread occupies at most one slot
    /// per group).
    ///
    /// If the condition is already met by the current flags, delivery
    /// happens immediately via the async queue - a flag set before this
    /// call must not require a second external event to be observed.
    pub fn mask_wait(
        &mut self,
        group: &mut NotifyMask,
        env: &mut dyn KernelServices,
        requested_mask: u32,
        mode: WaitMode,
        thread: ThreadId,
        notify_bit: u32,
    ) -> Result<(), NotifyError> {
        // Nil thread: trusted-caller no-op
        if thread.is_nil() {
            return Ok(());
        }

        let _irq = arch::irq_lock();

        // Find slot: existing registration for this thread, else first
        // free slot.
        let mut slot = None;
        let mut is_update = false;
        for i in 0..MAX_WAITERS {
            if group.waiters[i].thread == thread {
                slot = Some(i);
                is_update = true;
                break;
            }
            if slot.is_none() && group.waiters[i].thread.is_nil() {
                slot = Some(i);
            }
        }

        let Some(i) = slot else {
            knotify_debug!("notify: failed to add waiter, group {} full", group.id);
            return Err(NotifyError::GroupFull);
        };

        group.waiters[i] = WaiterSlot {
            thread,
            mask: requested_mask,
            mode,
            notify_bit,
        };
        if !is_update {
            group.num_waiters += 1;
            self.stats.mask_waits += 1;
        }

        knotify_debug!(
            "notify: {} wait for {} in group {} (mask={:#x}, bit={:#x})",
            if is_update { "updated" } else { "added" },
            thread,
            group.id,
            requested_mask,
            notify_bit
        );

        if condition_met(group.current_flags, requested_mask, mode) {
            let _ = self.post(env, thread, notify_bit, group.current_flags);
            self.stats.mask_notifications += 1;
        }

        Ok(())
    }

    /// Unregister a thread from a mask group.
    pub fn mask_unwait(
        &mut self,
        group: &mut NotifyMask,
        thread: ThreadId,
    ) -> Result<(), NotifyError> {
        if thread.is_nil() {
            return Err(NotifyError::NotWaiting);
        }

        let _irq = arch::irq_lock();

        for i in 0..MAX_WAITERS {
            if group.waiters[i].thread != thread {
                continue;
            }

            group.waiters[i] = WaiterSlot::EMPTY;
            group.num_waiters -= 1;
            self.stats.mask_unwaits += 1;
            return Ok(());
        }

        Err(NotifyError::NotWaiting)
    }

    /// Snapshot of the aggregate counters
    #[inline]
    pub fn stats(&self) -> NotifyStats {
        self.stats
    }

    /// Enumerate currently-queued events (target, bits, data) without
    /// mutating state. Read-only instrumentation.
    pub fn pending_events(&self) -> impl Iterator<Item = (ThreadId, u32, u32)> + '_ {
        self.queue.pending().map(|e| (e.target, e.bits, e.data))
    }

    /// KDB command: dump unified notification statistics plus up to
    /// [`crate::config::KDB_MAX_PENDING_DISPLAY`] queued events.
    #[cfg(feature = "kdb")]
    pub fn dump<W: fmt::Write>(&self, w: &mut W) -> fmt::Result {
        use crate::config::KDB_MAX_PENDING_DISPLAY;

        let depth = self.queue_depth();

        writeln!(w, "Async notification statistics:")?;
        writeln!(w, "  Posted:    {}", self.stats.posted)?;
        writeln!(w, "  Delivered: {}", self.stats.delivered)?;
        writeln!(w, "  Dropped:   {}", self.stats.dropped)?;
        writeln!(w, "  Pending:   {}", depth)?;
        writeln!(w, "  Pool size: {}", MAX_NOTIFICATIONS)?;
        writeln!(w, "  Pool free: {}", MAX_NOTIFICATIONS - depth as usize)?;

        writeln!(w)?;
        writeln!(w, "Bounded processing:")?;
        writeln!(w, "  Max batch size:   {} events", BATCH_SIZE)?;
        writeln!(w, "  Softirq calls:    {}", self.stats.batches)?;
        writeln!(w, "  Reschedules:      {}", self.stats.reschedules)?;
        if self.stats.batches > 0 {
            writeln!(
                w,
                "  Avg events/batch: {}",
                self.stats.delivered / self.stats.batches
            )?;
        }

        if depth > 0 {
            writeln!(w)?;
            writeln!(w, "Pending notifications:")?;

            let _irq = arch::irq_lock();
            let mut shown = 0;
            for event in self.queue.pending().take(KDB_MAX_PENDING_DISPLAY) {
                writeln!(
                    w,
                    "  [{}] target={} bits={:#x} data={:#x}",
                    shown, event.target, event.bits, event.data
                )?;
                shown += 1;
            }
            if depth as usize > shown {
                writeln!(w, "  ... {} more", depth as usize - shown)?;
            }
        }

        writeln!(w)?;
        writeln!(w, "Notification mask statistics:")?;
        writeln!(w, "  Created:       {}", self.stats.mask_created)?;
        writeln!(w, "  Deleted:       {}", self.stats.mask_deleted)?;
        writeln!(
            w,
            "  Active:        {}",
            self.stats.mask_created - self.stats.mask_deleted
        )?;
        writeln!(w, "  Set ops:       {}", self.stats.mask_sets)?;
        writeln!(w, "  Clear ops:     {}", self.stats.mask_clears)?;
        writeln!(w, "  Wait regs:     {}", self.stats.mask_waits)?;
        writeln!(w, "  Wait unregs:   {}", self.stats.mask_unwaits)?;
        writeln!(w, "  Notifications: {}", self.stats.mask_notifications)?;

        Ok(())
    }
}

impl Default for NotifySubsystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ThreadTable;

    /// Test double for the scheduler / thread-lookup / softirq collaborators
    struct MockKernel {
        table: ThreadTable,
        run_queue: Vec<ThreadId>,
        softirq_pending: bool,
        schedule_calls: u32,
        context: ExecContext,
    }

    impl MockKernel {
        fn new() -> Self {
            Self {
                table: ThreadTable::new(),
                run_queue: Vec::new(),
                softirq_pending: false,
                schedule_calls: 0,
                context: ExecContext::Softirq,
            }
        }

        fn spawn(&mut self) -> ThreadId {
            self.table.create(Tcb::DEFAULT_PRIORITY).unwrap()
        }

        fn spawn_blocked(&mut self) -> ThreadId {
            let tid = self.spawn();
            self.table.get_mut(tid).unwrap().block_on_notification();
            tid
        }
    }

    impl KernelServices for MockKernel {
        fn thread_by_id(&mut self, id: ThreadId) -> Option<&mut Tcb> {
            self.table.get_mut(id)
        }

        fn sched_enqueue(&mut self, id: ThreadId) {
            self.run_queue.push(id);
        }

        fn softirq_schedule(&mut self) {
            self.softirq_pending = true;
            self.schedule_calls += 1;
        }

        fn current_context(&self) -> ExecContext {
            self.context
        }
    }

    #[test]
    fn e2e_post_then_drain_delivers() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn_blocked();

        notify.post(&mut env, tid, 0x5, 42).unwrap();
        assert_eq!(notify.queue_depth(), 1);
        assert!(env.softirq_pending);

        let delivered = notify.drain_batch(&mut env);
        assert_eq!(delivered, 1);

        let tcb = env.table.get(tid).unwrap();
        assert_eq!(tcb.notify_bits, 0x5);
        assert_eq!(tcb.notify_data, 42);
        assert!(tcb.notify_pending());
        assert_eq!(tcb.state(), ThreadState::Runnable);
        assert_eq!(env.run_queue, [tid]);

        let stats = notify.stats();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.dropped, 0);
        assert_eq!(notify.queue_depth(), 0);
    }

    #[test]
    fn e2e_queue_full_drops_event() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        for i in 0..MAX_NOTIFICATIONS {
            notify.post(&mut env, tid, 1 << (i % 32), 0).unwrap();
        }
        assert!(notify.queue_full());

        let err = notify.post(&mut env, tid, 0x1, 0);
        assert_eq!(err, Err(NotifyError::QueueFull));
        assert_eq!(notify.stats().dropped, 1);
        assert_eq!(notify.queue_depth() as usize, MAX_NOTIFICATIONS);
    }

    #[test]
    fn fifo_order_and_last_payload_wins_per_target() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        notify.post(&mut env, tid, 0x1, 1).unwrap();
        notify.post(&mut env, tid, 0x2, 2).unwrap();

        let pending: Vec<_> = notify.pending_events().collect();
        assert_eq!(pending, [(tid, 0x1, 1), (tid, 0x2, 2)]);

        notify.drain_batch(&mut env);

        let tcb = env.table.get(tid).unwrap();
        assert_eq!(tcb.notify_bits, 0x3);
        // Only the most recent payload survives
        assert_eq!(tcb.notify_data, 2);
    }

    #[test]
    fn bounded_batch_drains_in_fixed_increments() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        for _ in 0..BATCH_SIZE * 3 {
            notify.post(&mut env, tid, 0x1, 0).unwrap();
        }

        // First two passes hit the batch limit and reschedule
        assert_eq!(notify.drain_batch(&mut env), BATCH_SIZE as u32);
        assert_eq!(notify.stats().reschedules, 1);
        assert_eq!(notify.drain_batch(&mut env), BATCH_SIZE as u32);
        assert_eq!(notify.stats().reschedules, 2);

        // Last pass empties the queue without rescheduling
        assert_eq!(notify.drain_batch(&mut env), BATCH_SIZE as u32);
        assert_eq!(notify.stats().reschedules, 2);
        assert_eq!(notify.queue_depth(), 0);
        assert_eq!(notify.stats().batches, 3);
    }

    #[test]
    fn stale_target_self_heals_without_leaking() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        notify.post(&mut env, tid, 0x1, 0).unwrap();
        env.table.destroy(tid);

        let delivered = notify.drain_batch(&mut env);
        assert_eq!(delivered, 0);
        assert_eq!(notify.stats().dropped, 1);
        assert_eq!(notify.queue_depth(), 0);
        assert!(env.run_queue.is_empty());

        // The slot went back to the pool: a full refill still succeeds
        let tid = env.spawn();
        for _ in 0..MAX_NOTIFICATIONS {
            notify.post(&mut env, tid, 0x1, 0).unwrap();
        }
    }

    #[test]
    fn drain_does_not_wake_running_threads() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();
        env.table.get_mut(tid).unwrap().set_state(ThreadState::Running);

        notify.post(&mut env, tid, 0x1, 0).unwrap();
        notify.drain_batch(&mut env);

        assert_eq!(env.table.get(tid).unwrap().state(), ThreadState::Running);
        assert!(env.run_queue.is_empty());
    }

    #[test]
    fn fast_path_signals_and_wakes_directly() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn_blocked();

        notify.post_fast(&mut env, tid, 0x9).unwrap();

        let tcb = env.table.get(tid).unwrap();
        assert_eq!(tcb.notify_bits, 0x9);
        assert_eq!(tcb.state(), ThreadState::Runnable);
        assert_eq!(env.run_queue, [tid]);

        // No queue traffic on the fast path
        assert_eq!(notify.queue_depth(), 0);
        let stats = notify.stats();
        assert_eq!(stats.posted, 1);
        assert_eq!(stats.delivered, 1);
    }

    #[test]
    fn fast_path_tolerates_stale_target() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();
        env.table.destroy(tid);

        assert_eq!(notify.post_fast(&mut env, tid, 0x1), Ok(()));
        assert_eq!(notify.stats().posted, 0);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "IRQ context"))]
    fn fast_path_rejects_irq_context() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();
        env.context = ExecContext::Irq;

        let result = notify.post_fast(&mut env, tid, 0x1);

        // Release builds reject with an error instead of asserting
        #[cfg(not(debug_assertions))]
        assert_eq!(result, Err(NotifyError::BadContext));
        #[cfg(debug_assertions)]
        let _ = result;
    }

    #[test]
    fn e2e_mask_level_triggered_renotify() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        let mut group = notify.mask_create("e2e");
        notify
            .mask_wait(&mut group, &mut env, 0x3, WaitMode::Or, tid, 0x1)
            .unwrap();
        assert_eq!(notify.queue_depth(), 0);

        notify.mask_set(&mut group, &mut env, 0x1);
        let pending: Vec<_> = notify.pending_events().collect();
        assert_eq!(pending, [(tid, 0x1, 0x1)]);

        // Still registered: a second set that still satisfies the
        // condition notifies again, with the updated flag state as payload
        notify.mask_set(&mut group, &mut env, 0x2);
        let pending: Vec<_> = notify.pending_events().collect();
        assert_eq!(pending, [(tid, 0x1, 0x1), (tid, 0x1, 0x3)]);

        assert_eq!(group.waiter_count(), 1);
        assert_eq!(notify.stats().mask_notifications, 2);
    }

    #[test]
    fn mask_wait_notifies_immediately_when_already_satisfied() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        let mut group = notify.mask_create("preset");
        notify.mask_set(&mut group, &mut env, 0x4);

        notify
            .mask_wait(&mut group, &mut env, 0x4, WaitMode::And, tid, 0x10)
            .unwrap();

        let pending: Vec<_> = notify.pending_events().collect();
        assert_eq!(pending, [(tid, 0x10, 0x4)]);
    }

    #[test]
    fn mask_and_condition_requires_all_flags() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        let mut group = notify.mask_create("and");
        notify
            .mask_wait(&mut group, &mut env, 0x6, WaitMode::And, tid, 0x1)
            .unwrap();

        notify.mask_set(&mut group, &mut env, 0x2);
        assert_eq!(notify.queue_depth(), 0);

        notify.mask_set(&mut group, &mut env, 0x4);
        assert_eq!(notify.queue_depth(), 1);
    }

    #[test]
    fn mask_clear_never_notifies() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        let mut group = notify.mask_create("clear");
        notify.mask_set(&mut group, &mut env, 0x7);
        notify.mask_clear(&mut group, 0x5);
        assert_eq!(group.get(), 0x2);

        notify
            .mask_wait(&mut group, &mut env, 0x4, WaitMode::Or, tid, 0x1)
            .unwrap();
        notify.mask_clear(&mut group, 0x2);
        assert_eq!(group.get(), 0);
        assert_eq!(notify.queue_depth(), 0);
    }

    #[test]
    fn mask_reregistration_updates_in_place() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        let mut group = notify.mask_create("update");
        notify
            .mask_wait(&mut group, &mut env, 0x1, WaitMode::Or, tid, 0x1)
            .unwrap();
        notify
            .mask_wait(&mut group, &mut env, 0x8, WaitMode::Or, tid, 0x2)
            .unwrap();
        assert_eq!(group.waiter_count(), 1);
        assert_eq!(notify.stats().mask_waits, 1);

        // Only the updated condition fires
        notify.mask_set(&mut group, &mut env, 0x1);
        assert_eq!(notify.queue_depth(), 0);
        notify.mask_set(&mut group, &mut env, 0x8);
        assert_eq!(notify.queue_depth(), 1);
    }

    #[test]
    fn mask_group_full() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();

        let mut group = notify.mask_create("full");
        for _ in 0..MAX_WAITERS {
            let tid = env.spawn();
            notify
                .mask_wait(&mut group, &mut env, 0x1, WaitMode::Or, tid, 0x1)
                .unwrap();
        }

        let tid = env.spawn();
        let err = notify.mask_wait(&mut group, &mut env, 0x1, WaitMode::Or, tid, 0x1);
        assert_eq!(err, Err(NotifyError::GroupFull));
        assert_eq!(group.waiter_count(), MAX_WAITERS as u8);
    }

    #[test]
    fn mask_unwait_removes_registration() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        let mut group = notify.mask_create("unwait");
        assert_eq!(
            notify.mask_unwait(&mut group, tid),
            Err(NotifyError::NotWaiting)
        );

        notify
            .mask_wait(&mut group, &mut env, 0x1, WaitMode::Or, tid, 0x1)
            .unwrap();
        notify.mask_unwait(&mut group, tid).unwrap();
        assert_eq!(group.waiter_count(), 0);

        notify.mask_set(&mut group, &mut env, 0x1);
        assert_eq!(notify.queue_depth(), 0);

        assert_eq!(
            notify.mask_unwait(&mut group, ThreadId::NIL),
            Err(NotifyError::NotWaiting)
        );
    }

    #[test]
    fn mask_set_clears_slots_of_destroyed_waiters() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        let mut group = notify.mask_create("stale");
        notify
            .mask_wait(&mut group, &mut env, 0x1, WaitMode::Or, tid, 0x1)
            .unwrap();
        env.table.destroy(tid);

        notify.mask_set(&mut group, &mut env, 0x1);
        assert_eq!(group.waiter_count(), 0);
        assert_eq!(notify.queue_depth(), 0);
        assert_eq!(notify.stats().mask_notifications, 0);
    }

    #[test]
    fn mask_delete_abandons_waiters_silently() {
        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        let mut group = notify.mask_create("doomed");
        notify
            .mask_wait(&mut group, &mut env, 0x1, WaitMode::Or, tid, 0x1)
            .unwrap();

        notify.mask_delete(&mut group);
        assert_eq!(group.waiter_count(), 0);
        assert_eq!(group.get(), 0);
        assert_eq!(notify.queue_depth(), 0);
        assert_eq!(notify.stats().mask_deleted, 1);
    }

    #[cfg(feature = "kdb")]
    #[test]
    fn dump_caps_pending_display() {
        use crate::config::KDB_MAX_PENDING_DISPLAY;

        let mut env = MockKernel::new();
        let mut notify = NotifySubsystem::new();
        let tid = env.spawn();

        let queued = KDB_MAX_PENDING_DISPLAY + 2;
        for _ in 0..queued {
            notify.post(&mut env, tid, 0x1, 0).unwrap();
        }

        let mut out = String::new();
        notify.dump(&mut out).unwrap();

        assert!(out.contains(&format!("Posted:    {}", queued)));
        assert!(out.contains(&format!("Pending:   {}", queued)));
        assert!(out.contains(&format!("[{}]", KDB_MAX_PENDING_DISPLAY - 1)));
        assert!(!out.contains(&format!("[{}]", KDB_MAX_PENDING_DISPLAY)));
        assert!(out.contains("... 2 more"));
    }
}
