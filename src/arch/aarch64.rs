//! aarch64 IRQ masking via DAIF
//!
//! Only the I bit is set; debug, SError, and FIQ masking are left to the
//! exception vector configuration.

use core::arch::asm;

pub(super) fn irq_save() -> u64 {
    let daif: u64;
    unsafe {
        asm!("mrs {}, daif", out(reg) daif, options(nomem, nostack, preserves_flags));
        asm!("msr daifset, #2", options(nomem, nostack, preserves_flags));
    }
    daif
}

pub(super) fn irq_restore(daif: u64) {
    unsafe {
        asm!("msr daif, {}", in(reg) daif, options(nomem, nostack, preserves_flags));
    }
}
