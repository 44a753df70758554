//! Runtime invariant checking with contract test support
//!
//! Invariants guard states that must be unreachable. A violation is reported
//! through the diagnostics sink at FATAL severity, which aborts the process.
//! Every check is recorded per thread so tests can assert that the code path
//! they exercised actually verified the invariants it is supposed to.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crabcamera_af::invariant_ppt::*;
//!
//! assert_invariant!(
//!     focus <= max_step,
//!     "Actuator step must stay within [0, max_step]",
//!     "af::scanner"
//! );
//!
//! #[test]
//! fn contract_scanner() {
//!     contract_test("scanner", &["Actuator step must stay within [0, max_step]"]);
//! }
//! ```

use crate::diagnostics::DEFAULT_CATEGORY;
use std::cell::RefCell;
use std::collections::HashSet;
use std::thread_local;

thread_local! {
    static INVARIANT_LOG: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Assert an invariant and log it for contract testing.
///
/// # Arguments
/// * `condition` - The invariant condition (must be true)
/// * `message` - Description of the invariant
/// * `context` - Optional diagnostics category to report the violation under,
///   the default category otherwise
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

/// Internal implementation - do not call directly
#[doc(hidden)]
#[track_caller]
pub fn __assert_invariant_impl(condition: bool, message: &str, context: Option<&str>) {
    INVARIANT_LOG.with(|log| {
        log.borrow_mut().insert(message.to_string());
    });

    if !condition {
        let category = context.unwrap_or(DEFAULT_CATEGORY);
        crate::diagnostics::fatal(category, &format!("INVARIANT VIOLATION: {}", message));
    }
}

/// Check that specific invariants were verified during test execution.
///
/// # Panics
/// Panics if any required invariant was not checked on this thread.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let log = INVARIANT_LOG.with(|log| log.borrow().clone());

    let missing: Vec<&str> = required_invariants
        .iter()
        .filter(|invariant| !log.contains(**invariant))
        .copied()
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

/// Clear the invariant log (call between test runs if needed)
pub fn clear_invariant_log() {
    INVARIANT_LOG.with(|log| {
        log.borrow_mut().clear();
    });
}
