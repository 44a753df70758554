//! Leveled, categorized diagnostics
//!
//! Messages carry a category and a [`LogSeverity`]. Each category has a
//! minimum severity configured through [`Logger`]; messages that pass are
//! forwarded to the `log` facade with the category name as target, so the
//! installed logger (see [`crate::init_logging`]) timestamps them and writes
//! them to stderr. A FATAL message aborts the process after it is written.

pub mod registry;
pub mod severity;

pub use registry::{
    LevelRule, LevelRules, LogCategory, Logger, DEFAULT_CATEGORY, DEFAULT_SEVERITY, LOG_LEVELS_ENV,
};
pub use severity::{LogSeverity, SeverityParseError};

use std::fmt;
use std::panic::Location;

/// Emit a message through a category.
///
/// ```rust,ignore
/// let category = Logger::category("Af");
/// diag!(category, LogSeverity::Debug, "variance {:.2} at step {}", variance, focus);
/// ```
#[macro_export]
macro_rules! diag {
    ($category:expr, $severity:expr, $($arg:tt)+) => {
        $crate::diagnostics::emit_at(
            &$category,
            $severity,
            file!(),
            line!(),
            format_args!($($arg)+),
        )
    };
}

/// Filter and forward one message, attributed to the caller's source
/// location. Returns whether it passed the category filter.
#[track_caller]
pub fn emit(category: &LogCategory, severity: LogSeverity, args: fmt::Arguments) -> bool {
    let caller = Location::caller();
    emit_at(category, severity, caller.file(), caller.line(), args)
}

/// [`emit`] with an explicit source location, used by [`diag!`]
#[doc(hidden)]
pub fn emit_at(
    category: &LogCategory,
    severity: LogSeverity,
    file: &'static str,
    line: u32,
    args: fmt::Arguments,
) -> bool {
    let enabled = category.enabled(severity);
    let level = severity.level();

    if enabled && level <= log::max_level() {
        let prefix = if severity == LogSeverity::Fatal { "FATAL " } else { "" };
        log::logger().log(
            &log::Record::builder()
                .args(format_args!("{}{}", prefix, args))
                .level(level)
                .target(category.name())
                .file(Some(file))
                .line(Some(line))
                .build(),
        );
        if severity == LogSeverity::Fatal {
            log::logger().flush();
        }
    }

    if severity == LogSeverity::Fatal {
        std::process::abort();
    }

    enabled
}

/// Report an unreachable state and abort
#[track_caller]
pub fn fatal(category: &str, message: &str) -> ! {
    let category = Logger::category(category);
    emit(&category, LogSeverity::Fatal, format_args!("{}", message));
    unreachable!("FATAL diagnostics abort the process")
}
