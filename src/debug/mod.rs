//! Debug output and logging
//!
//! This crate owns no UART; the integrating kernel registers a console sink
//! once during boot with [`set_console`]. Until then, output is discarded.

use core::fmt;

/// Registered console sink (set once at boot)
static CONSOLE: spin::Once<fn(&str)> = spin::Once::new();

/// Register the console sink. Later calls are ignored.
pub fn set_console(sink: fn(&str)) {
    CONSOLE.call_once(|| sink);
}

/// Debug writer (forwards to the registered console sink)
pub struct DebugWriter;

impl fmt::Write for DebugWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(sink) = CONSOLE.get() {
            sink(s);
        }
        Ok(())
    }
}

/// Print macro for kernel
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let _ = write!($crate::debug::DebugWriter, $($arg)*);
    });
}

/// Print with newline macro for kernel
#[macro_export]
macro_rules! kprintln {
    () => ($crate::kprint!("\n"));
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let _ = writeln!($crate::debug::DebugWriter, $($arg)*);
    });
}

/// Notification subsystem trace output (enabled by the `debug-notify` feature)
#[cfg(feature = "debug-notify")]
#[macro_export]
macro_rules! knotify_debug {
    ($($arg:tt)*) => ($crate::kprintln!($($arg)*));
}

/// Notification subsystem trace output (enabled by the `debug-notify` feature)
#[cfg(not(feature = "debug-notify"))]
#[macro_export]
macro_rules! knotify_debug {
    ($($arg:tt)*) => {
        ()
    };
}
