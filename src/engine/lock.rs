//! # Query exclusivity lock
//!
//! A scene carries one [`QueryLock`]: a single atomic flag meaning "a query is
//! iterating (or a removal callback is running)". While the flag is held:
//!
//! - every structural entry point of the scene fails with
//!   [`ThreadingError::QueryInProgress`](crate::engine::error::ThreadingError::QueryInProgress),
//! - a second query fails with [`QueryError::NestedQuery`].
//!
//! The flag does not distinguish between queries. Two queries over disjoint
//! component sets can still visit the same pool, so nesting is rejected
//! outright.
//!
//! ## RAII
//! [`QueryLock::claim`] returns a [`QueryGuard`] that releases the flag when
//! dropped, including on early return through `?` and on unwinding.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::error::QueryError;


/// The scene-wide "query in progress" flag.

#[derive(Debug, Default)]
pub struct QueryLock {
    held: AtomicBool,
}

impl QueryLock {
    /// Creates a released lock.
    pub const fn new() -> Self {
        Self { held: AtomicBool::new(false) }
    }

    /// Acquires the flag.
    ///
    /// # Errors
    /// [`QueryError::NestedQuery`] if the flag is already held.

    pub fn claim(&self) -> Result<QueryGuard<'_>, QueryError> {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| QueryGuard { lock: self })
            .map_err(|_| QueryError::NestedQuery)
    }

    /// Returns `true` while a guard is alive.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Releases the [`QueryLock`] on drop.

#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct QueryGuard<'a> {
    lock: &'a QueryLock,
}

impl Drop for QueryGuard<'_> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
