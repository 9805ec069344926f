//! Fixed-pool asynchronous event queue
//!
//! The storage layer under the async delivery path: a pool of
//! [`crate::config::MAX_NOTIFICATIONS`] event records, an index-linked free
//! list, and an index-linked FIFO. No heap, no unbounded traversal: depth
//! is a maintained O(1) counter, never recomputed by walking the list.
//!
//! An event is in exactly one of {free list, FIFO} at any time, except for
//! the one event the drain handler is currently processing (popped from the
//! FIFO but not yet freed). The depth counter covers posted-but-not-yet-
//! freed events, so the in-flight event still counts.
//!
//! Events reference their target by [`ThreadId`], never by pointer: the
//! target may be destroyed while the event is queued, and delivery
//! discovers that through the thread table instead of dereferencing stale
//! state.

use crate::config::MAX_NOTIFICATIONS;
use crate::objects::ThreadId;

/// One pending deferred delivery
pub(crate) struct AsyncEvent {
    /// Target thread (safe lookup at delivery time)
    pub(crate) target: ThreadId,
    /// Notification bit mask
    pub(crate) bits: u32,
    /// Optional 32-bit payload
    pub(crate) data: u32,
    /// Free-list / FIFO linkage
    next: Option<usize>,
}

const EMPTY_EVENT: AsyncEvent = AsyncEvent {
    target: ThreadId::NIL,
    bits: 0,
    data: 0,
    next: None,
};

/// Event pool plus FIFO, both linked through slot indices
pub(crate) struct EventQueue {
    slots: [AsyncEvent; MAX_NOTIFICATIONS],
    free_head: Option<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    /// Posted-but-not-yet-freed events (maintained, never recomputed)
    count: u32,
}

impl EventQueue {
    pub(crate) const fn new() -> Self {
        let mut slots = [EMPTY_EVENT; MAX_NOTIFICATIONS];
        let mut i = 0;
        while i < MAX_NOTIFICATIONS {
            slots[i].next = if i + 1 < MAX_NOTIFICATIONS {
                Some(i + 1)
            } else {
                None
            };
            i += 1;
        }
        Self {
            slots,
            free_head: Some(0),
            head: None,
            tail: None,
            count: 0,
        }
    }

    /// Take an event record from the pool. `None` on exhaustion.
    pub(crate) fn alloc(&mut self) -> Option<usize> {
        let idx = self.free_head?;
        self.free_head = self.slots[idx].next;
        self.slots[idx].next = None;
        Some(idx)
    }

    /// Return an event record to the pool and drop it from the depth count.
    pub(crate) fn free(&mut self, idx: usize) {
        debug_assert!(self.count > 0, "freeing more events than were queued");
        self.slots[idx] = AsyncEvent {
            next: self.free_head,
            ..EMPTY_EVENT
        };
        self.free_head = Some(idx);
        self.count -= 1;
    }

    /// Append an allocated event to the FIFO tail.
    pub(crate) fn push_back(&mut self, idx: usize) {
        self.slots[idx].next = None;
        match self.tail {
            None => self.head = Some(idx),
            Some(tail) => self.slots[tail].next = Some(idx),
        }
        self.tail = Some(idx);
        self.count += 1;
    }

    /// Pop the FIFO head. The event stays counted until freed.
    pub(crate) fn pop_front(&mut self) -> Option<usize> {
        let idx = self.head?;
        self.head = self.slots[idx].next;
        if self.head.is_none() {
            self.tail = None;
        }
        self.slots[idx].next = None;
        Some(idx)
    }

    #[inline]
    pub(crate) fn event(&self, idx: usize) -> &AsyncEvent {
        &self.slots[idx]
    }

    #[inline]
    pub(crate) fn event_mut(&mut self, idx: usize) -> &mut AsyncEvent {
        &mut self.slots[idx]
    }

    /// O(1) depth snapshot (may be stale by the time the caller acts on it)
    #[inline]
    pub(crate) fn depth(&self) -> u32 {
        self.count
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.count as usize >= MAX_NOTIFICATIONS
    }

    #[inline]
    pub(crate) fn is_fifo_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Iterate the FIFO front-to-back without mutating it.
    pub(crate) fn pending(&self) -> Pending<'_> {
        Pending {
            queue: self,
            next: self.head,
        }
    }
}

/// Non-destructive FIFO iterator (KDB enumeration)
pub(crate) struct Pending<'a> {
    queue: &'a EventQueue,
    next: Option<usize>,
}

impl<'a> Iterator for Pending<'a> {
    type Item = &'a AsyncEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let event = self.queue.event(idx);
        self.next = event.next;
        Some(event)
    }
}
