//! # Debug Log
//!
//! Routes the `log` facade to libdragon's debug channel (IS-Viewer, which
//! emulators and flashcarts display). Lines longer than [`LINE_LEN`] are
//! cut short.
//!
//! ```ignore
//! keen64_hal::logger::init(log::LevelFilter::Debug);
//! log::debug!("mounted {} save files", n);
//! ```

use core::fmt::{self, Write};

use log::Level;

use crate::fmtbuf::LineBuffer;

pub const LINE_LEN: usize = 128;

/// Render one log line, leaving room for a terminating NUL.
pub fn format_record(
    level: Level,
    target: &str,
    args: fmt::Arguments<'_>,
) -> LineBuffer<{ LINE_LEN - 1 }> {
    let mut line = LineBuffer::new();
    let _ = write!(line, "[{:<5} {}] {}", level, target, args);
    line
}

#[cfg(target_arch = "mips")]
mod isviewer {
    use super::*;
    use crate::sys;

    struct IsViewer;

    static LOGGER: IsViewer = IsViewer;

    impl log::Log for IsViewer {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &log::Record<'_>) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let line = format_record(record.level(), record.target(), *record.args());
            let mut cstr = [0u8; LINE_LEN];
            let bytes = line.as_bytes();
            cstr[..bytes.len()].copy_from_slice(bytes);
            unsafe { sys::debugf(c"%s\n".as_ptr(), cstr.as_ptr()) };
        }

        fn flush(&self) {}
    }

    /// Open the IS-Viewer channel and install the logger. Safe to call
    /// more than once; later calls only change the level.
    pub fn init(level: log::LevelFilter) {
        unsafe { sys::debug_init(sys::DEBUG_FEATURE_LOG_ISVIEWER) };
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(level);
    }
}

#[cfg(target_arch = "mips")]
pub use isviewer::init;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_level_and_target() {
        let args = format_args!("{} missing", "CONFIG.CK4");
        let line = format_record(Level::Warn, "keen64_hal::table", args);
        assert_eq!(line.as_str(), "[WARN  keen64_hal::table] CONFIG.CK4 missing");
    }

    #[test]
    fn long_lines_fit_with_nul() {
        let long = "x".repeat(400);
        let line = format_record(Level::Debug, "t", format_args!("{}", long));
        assert_eq!(line.as_bytes().len(), LINE_LEN - 1);
    }
}
