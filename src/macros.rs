#![allow(unused_macros)]

/// Helper macro for reading locked items, mapping a poisoned lock to [`crate::Error::LockError`]
///
/// ```rust, ignore
///  let hook = read_lock!(self.hook).clone();
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock.read().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for writing to locked items, mapping a poisoned lock to [`crate::Error::LockError`]
///
/// ```rust, ignore
///  *write_lock!(self.hook) = None;
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock.write().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for the lazily populated caches of descriptors
///
/// Expands to a [`crate::utils::memoize`] call, so a failed computation is returned but never
/// stored and the next access computes again.
///
/// ```rust, ignore
///  let name = cached!(self.name, || self.read_name());
/// ```
macro_rules! cached {
    ($cell:expr, $init:expr) => {
        crate::utils::memoize(&$cell, $init)?
    };
}
