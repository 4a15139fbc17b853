//! Shared, serialized access to a vault instance
//!
//! One mutex per instance. `transact` runs a closure against a working copy
//! and only writes it back on `Ok`, so a sequence of operations either lands
//! completely or not at all. `apply` skips the copy for single operations
//! that validate before they write.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct SharedVault<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for SharedVault<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> SharedVault<T> {
    pub fn new(vault: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vault)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        // `transact` replaces state wholesale and `apply` callers validate
        // before writing, so a poisoned lock still guards a consistent value.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a read-only query under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock())
    }

    /// Run `f` against a copy and commit the copy only if `f` succeeds.
    ///
    /// Every call clones the whole instance, so its cost grows with the
    /// number of holders. Prefer [`SharedVault::apply`] for a single vault
    /// operation.
    pub fn transact<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        let mut guard = self.lock();
        let mut working = guard.clone();
        let result = f(&mut working)?;
        *guard = working;
        Ok(result)
    }

    /// Run one operation directly on the shared value.
    ///
    /// `f` must fail before its first write, as every vault operation does.
    /// Multi-step batches belong in `transact`.
    pub fn apply<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        f(&mut self.lock())
    }
}
