#![deny(missing_docs)]
//! Shared logging utilities for the bulk sender workspace.
//!
//! This crate provides the `sender_*` logging macros used across the codebase,
//! a per-thread row context that the batch worker sets while it processes a
//! spreadsheet row, and a minimal test initializer for the global logger.

use std::cell::Cell;

#[doc(hidden)]
pub use log as __log;

thread_local! {
    /// One-based spreadsheet row currently being processed on this thread, 0 when none.
    static CURRENT_ROW: Cell<usize> = const { Cell::new(0) };
}

/// Guard returned by [`enter_row`]; restores the previous row context on drop.
#[must_use = "the row context is cleared as soon as the guard is dropped"]
pub struct RowScope {
    previous: usize,
}

impl Drop for RowScope {
    fn drop(&mut self) {
        CURRENT_ROW.with(|v| v.set(self.previous));
    }
}

/// Marks `row` (one-based) as the row being processed on the current thread.
///
/// Every `sender_*` log line emitted while the guard is alive is prefixed with
/// `[row n] `.
pub fn enter_row(row: usize) -> RowScope {
    let previous = CURRENT_ROW.with(|v| v.replace(row));
    RowScope { previous }
}

/// Returns the row set by [`enter_row`] on this thread, if any.
pub fn current_row() -> Option<usize> {
    match CURRENT_ROW.with(|v| v.get()) {
        0 => None,
        row => Some(row),
    }
}

/// Log-line prefix for the current row context; empty outside a row.
#[doc(hidden)]
pub fn row_prefix() -> String {
    current_row()
        .map(|row| format!("[row {row}] "))
        .unwrap_or_default()
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! sender_trace {
    ($($arg:tt)*) => {{
        $crate::__log::trace!("{}{}", $crate::row_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! sender_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!("{}{}", $crate::row_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! sender_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!("{}{}", $crate::row_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! sender_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!("{}{}", $crate::row_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! sender_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!("{}{}", $crate::row_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may already own the global logger.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::{current_row, enter_row, row_prefix};

    #[test]
    fn row_context_is_scoped_and_nests() {
        assert_eq!(current_row(), None);
        assert_eq!(row_prefix(), "");
        {
            let _outer = enter_row(3);
            assert_eq!(row_prefix(), "[row 3] ");
            {
                let _inner = enter_row(4);
                assert_eq!(current_row(), Some(4));
            }
            assert_eq!(current_row(), Some(3));
        }
        assert_eq!(current_row(), None);
    }

    #[test]
    fn macros_accept_format_arguments() {
        super::initialize_for_tests();
        let _row = enter_row(1);
        sender_info!("sending to {}", "+15550100");
        sender_warn!("image missing: {path}", path = "a.png");
    }
}
