//! IRQ-masking critical sections
//!
//! The subsystem's one concurrency primitive: a brief mask-disable /
//! do-work / mask-restore sequence around every read-modify-write. On the
//! bare-metal aarch64 target this saves DAIF and sets the I bit; on hosted
//! builds (unit tests) interrupts do not exist and the guard degrades to a
//! compiler fence.
//!
//! Guards nest: each one restores exactly the mask state it saved.
//!
//! A multi-core port must replace these sections with spinlocks scoped to
//! the exact structure each protects (event pool + FIFO as one lock, each
//! mask group as its own lock, per-thread notify fields via the owning
//! thread's lock) - not a single global lock.

use core::marker::PhantomData;

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
mod aarch64;
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
use aarch64 as imp;

#[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
mod host {
    use core::sync::atomic::{compiler_fence, Ordering};

    pub(super) fn irq_save() -> u64 {
        compiler_fence(Ordering::SeqCst);
        0
    }

    pub(super) fn irq_restore(_flags: u64) {
        compiler_fence(Ordering::SeqCst);
    }
}
#[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
use host as imp;

/// RAII guard for an IRQ-masked critical section.
///
/// Interrupts stay masked until the guard is dropped. Not `Send`: the
/// restore must happen on the core that saved the mask state.
pub struct IrqGuard {
    flags: u64,
    _not_send: PhantomData<*mut ()>,
}

/// Enter an IRQ-masked critical section.
#[inline]
#[must_use = "dropping the guard immediately ends the critical section"]
pub fn irq_lock() -> IrqGuard {
    IrqGuard {
        flags: imp::irq_save(),
        _not_send: PhantomData,
    }
}

impl Drop for IrqGuard {
    #[inline]
    fn drop(&mut self) {
        imp::irq_restore(self.flags);
    }
}
