//! Runtime invariant checks with contract-test support.
//!
//! Production code asserts invariants through [`assert_invariant!`]; every
//! checked message is recorded in a thread-local log so tests can prove, via
//! [`contract_test`], that a given code path really exercised the checks it
//! is supposed to.
//!
//! ```rust,ignore
//! use scangate::invariants::*;
//!
//! assert_invariant!(ratio <= 1.0, RATIO_IN_UNIT_RANGE, "preprocess");
//!
//! #[test]
//! fn contract_gate_escalation() {
//!     clear_invariant_log();
//!     let _ = CaptureGate::default().evaluate(&metrics);
//!     contract_test("capture gate", &[STATUS_NEVER_DOWNGRADES]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::BTreeSet;

/// Gate status escalation within one evaluation is monotonic.
pub const STATUS_NEVER_DOWNGRADES: &str = "gate status never downgrades within an evaluation";

/// Every ratio produced by the analyzers and aggregators lies in [0, 1].
pub const RATIO_IN_UNIT_RANGE: &str = "ratio lies in [0, 1]";

/// Filters and masks keep the dimensions of their input.
pub const SHAPE_PRESERVED: &str = "output shape equals input shape";

thread_local! {
    static CHECKED: RefCell<BTreeSet<String>> = RefCell::new(BTreeSet::new());
}

/// Assert an invariant and record it for contract testing.
///
/// # Panics
/// Panics with the invariant message and context when the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariants::__check($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariants::__check($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __check(condition: bool, message: &str, context: Option<&str>) {
    CHECKED.with(|log| {
        log.borrow_mut().insert(message.to_string());
    });

    if !condition {
        panic!(
            "INVARIANT VIOLATION [{}]: {}",
            context.unwrap_or("unknown"),
            message
        );
    }
}

/// Check a ratio value against [`RATIO_IN_UNIT_RANGE`].
pub fn check_unit_ratio(value: f64, context: &str) {
    __check((0.0..=1.0).contains(&value), RATIO_IN_UNIT_RANGE, Some(context));
}

/// Panic unless every named invariant was checked on this thread.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let missing: Vec<&str> = CHECKED.with(|log| {
        let log = log.borrow();
        required_invariants
            .iter()
            .copied()
            .filter(|inv| !log.contains(*inv))
            .collect()
    });

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

/// Forget everything checked so far on this thread
pub fn clear_invariant_log() {
    CHECKED.with(|log| log.borrow_mut().clear());
}
