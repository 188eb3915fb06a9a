//! Small helpers shared by the descriptor graph.
//!
//! - [`memoize`] - publish-once lazy initialization that never caches a failure
//! - [`names_equal`] - ordinal or case-insensitive member name comparison

use std::sync::OnceLock;

use crate::Result;

/// Returns the value stored in `cell`, computing it with `init` on first access.
///
/// Racing first accesses may all run `init`, but only one result is published and every
/// caller observes that one. An `Err` from `init` is returned to the caller and nothing is
/// stored, so the next access retries.
///
/// # Errors
/// Returns whatever error `init` returns.
pub fn memoize<T, F>(cell: &OnceLock<T>, init: F) -> Result<&T>
where
    F: FnOnce() -> Result<T>,
{
    if let Some(value) = cell.get() {
        return Ok(value);
    }

    let value = init()?;
    // A concurrent initializer may have won; `get_or_init` hands back the published value.
    Ok(cell.get_or_init(|| value))
}

/// Compares two member names, ordinally or ignoring case.
#[must_use]
pub fn names_equal(left: &str, right: &str, ignore_case: bool) -> bool {
    if ignore_case {
        if left.is_ascii() && right.is_ascii() {
            return left.eq_ignore_ascii_case(right);
        }

        left.to_lowercase() == right.to_lowercase()
    } else {
        left == right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn memoize_publishes_first_success() {
        let cell = OnceLock::new();

        assert_eq!(*memoize(&cell, || Ok(42)).unwrap(), 42);
        assert_eq!(*memoize(&cell, || Ok(7)).unwrap(), 42);
    }

    #[test]
    fn memoize_does_not_cache_failure() {
        let cell: OnceLock<u32> = OnceLock::new();

        assert!(matches!(memoize(&cell, || Err(Error::Released)), Err(Error::Released)));
        assert!(cell.get().is_none());
        assert_eq!(*memoize(&cell, || Ok(3)).unwrap(), 3);
    }

    #[test]
    fn memoize_concurrent_first_access() {
        let cell = std::sync::Arc::new(OnceLock::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cell = cell.clone();
                std::thread::spawn(move || *memoize(&cell, || Ok(i)).unwrap())
            })
            .collect();

        let seen: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(seen.iter().all(|value| *value == seen[0]));
    }

    #[test]
    fn name_comparison() {
        assert!(names_equal("Count", "Count", false));
        assert!(!names_equal("Count", "count", false));
        assert!(names_equal("Count", "count", true));
        assert!(names_equal("ÄPFEL", "äpfel", true));
    }
}
