// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime support for dynamic checks.
//!
//! A dynamic check enforces an invariant that could not be proven at compile time, e.g., a
//! bounds, null or range condition introduced by a static checker. The condition is evaluated by
//! the caller. If it holds, the check has no effect. If it does not hold, the process is
//! terminated through an abnormal exit that cannot be intercepted by the program: no unwinding,
//! no destructors, no panic hook and no error value returned to the caller.
//!
//! Buffered output is not flushed before the trap. Anything that must be visible after a failed
//! check must be flushed by the caller.

/// Checks that `cond` holds, trapping the process otherwise.
///
/// # Example:
///
/// ```rust
/// let idx = 3;
/// let len = 8;
/// dyncheck::dynamic_check(idx < len);
/// ```
///
/// The following program never reaches its last statement and terminates abnormally:
///
/// ```rust,no_run
/// dyncheck::dynamic_check(false);
/// unreachable!("the check above always traps");
/// ```
#[inline]
pub fn dynamic_check(cond: bool) {
    if !cond {
        trap()
    }
}

/// Terminates the whole process abnormally.
///
/// On Unix the process is killed by `SIGABRT`, so a supervising process observes a crash rather
/// than an exit status.
#[cold]
#[inline(never)]
pub fn trap() -> ! {
    std::process::abort()
}

/// Evaluates the given condition once and passes the result to [`dynamic_check`].
///
/// ```rust
/// let buf = [0u8; 4];
/// let i = 2;
/// dyncheck::dynamic_check!(i < buf.len());
/// ```
#[macro_export]
macro_rules! dynamic_check {
    ($cond:expr $(,)?) => {
        $crate::dynamic_check($cond)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_passing_condition_is_noop() {
        let mut counter = 0;
        for i in 0..1_000 {
            dynamic_check(i >= 0);
            counter += 1;
        }
        assert_eq!(counter, 1_000);
    }

    #[test]
    fn check_macro_evaluates_once() {
        let mut evaluations = 0;
        let mut cond = || {
            evaluations += 1;
            true
        };
        dynamic_check!(cond());
        assert_eq!(evaluations, 1);
    }
}
