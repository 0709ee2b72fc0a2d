//! Constant-time comparison.

use subtle::ConstantTimeEq;

/// Compare two byte strings without short-circuiting on the first difference.
///
/// Inputs of different length compare unequal; only the lengths, which are
/// not secret, influence timing in that case.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    #[cfg(test)]
    COMPARISONS.with(|count| count.set(count.get() + 1));
    a.ct_eq(b).into()
}

#[cfg(test)]
thread_local! {
    static COMPARISONS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Calls to [`constant_time_eq`] made on the current thread.
#[cfg(test)]
pub(crate) fn comparison_count() -> usize {
    COMPARISONS.with(std::cell::Cell::get)
}
