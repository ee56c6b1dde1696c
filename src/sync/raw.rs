//! Raw mutual-exclusion primitives.

use std::sync::{Condvar, Mutex, PoisonError};

/// A mutual-exclusion primitive with explicit `lock`/`unlock` calls.
///
/// Implementations must block in `lock` until the primitive is free. Calling
/// `unlock` on a primitive the caller did not lock is a contract violation;
/// `LockGuard` exists so callers never have to track that themselves.
pub trait RawLock: Send + Sync {
    /// Block until the lock is acquired.
    fn lock(&self);

    /// Release a lock previously acquired with [`RawLock::lock`].
    fn unlock(&self);
}

/// A blocking mutex without a borrow-scoped guard.
///
/// Built from a `Mutex<bool>` and a `Condvar`, so it can be unlocked from a
/// different scope (or stack frame) than the one that locked it.
#[derive(Debug, Default)]
pub struct BlockingMutex {
    locked: Mutex<bool>,
    released: Condvar,
}

impl BlockingMutex {
    /// Create a new, unlocked mutex.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return true if some owner currently holds the mutex.
    pub fn is_locked(&self) -> bool {
        *self.locked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RawLock for BlockingMutex {
    fn lock(&self) {
        let mut locked = self.locked.lock().unwrap_or_else(PoisonError::into_inner);
        while *locked {
            locked = self
                .released
                .wait(locked)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *locked = true;
    }

    fn unlock(&self) {
        let mut locked = self.locked.lock().unwrap_or_else(PoisonError::into_inner);
        *locked = false;
        drop(locked);
        self.released.notify_one();
    }
}
