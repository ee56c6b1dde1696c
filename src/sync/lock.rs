//! Resettable lock guard.
//!
//! # Responsibilities
//! - Track whether this owner currently holds its raw mutex
//! - Panic on double lock and on unlock without a hold
//! - Rebind to a different mutex without leaking the old hold
//! - Scoped acquisition that always releases what it acquired
//!
//! # State Machine
//! ```text
//!            lock()
//!  Unlocked ────────▶ Locked
//!     ▲                 │
//!     └─────────────────┘
//!           unlock()
//! ```
//! Every other transition is a programming error and panics.
//!
//! # Contention on `reset`
//! `reset(new, true)` blocks in `lock` if another owner holds `new`. The guard
//! does not detect or report cross-owner contention; that is the raw mutex's
//! business.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::sync::raw::{BlockingMutex, RawLock};

/// A single owner's view onto a shared raw mutex.
///
/// The guard is not meant to be shared between threads: each thread that
/// needs the same resource wraps the same `Arc`'d mutex in its own guard.
/// Dropping a guard does not unlock it.
#[derive(Debug)]
pub struct LockGuard<M: RawLock + ?Sized = BlockingMutex> {
    mutex: Arc<M>,
    held: bool,
}

impl<M: RawLock + ?Sized> LockGuard<M> {
    /// Create an unlocked guard bound to `mutex`.
    pub fn new(mutex: Arc<M>) -> Self {
        Self { mutex, held: false }
    }

    /// Return true if this guard currently holds its mutex.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// The mutex this guard is bound to.
    pub fn mutex(&self) -> &Arc<M> {
        &self.mutex
    }

    /// Acquire the mutex.
    ///
    /// # Panics
    ///
    /// Panics if this guard already holds the lock.
    pub fn lock(&mut self) {
        assert!(!self.held, "LockGuard::lock called while the lock is already held");
        self.mutex.lock();
        self.held = true;
    }

    /// Release the mutex.
    ///
    /// # Panics
    ///
    /// Panics if this guard does not hold the lock.
    pub fn unlock(&mut self) {
        assert!(self.held, "LockGuard::unlock called while the lock is not held");
        self.mutex.unlock();
        self.held = false;
    }

    /// Rebind the guard to `mutex`, releasing the current hold first.
    ///
    /// When `lock_now` is true the new mutex is acquired before returning.
    pub fn reset(&mut self, mutex: Arc<M>, lock_now: bool) {
        if self.held {
            self.unlock();
        }
        self.mutex = mutex;
        if lock_now {
            self.lock();
        }
    }

    /// Run `body` while holding the lock.
    ///
    /// If the guard is unlocked on entry, the lock is acquired here and
    /// released on every exit from `body`, including a panic. If it is already
    /// held, `body` runs without re-acquiring and the hold is left for the
    /// caller to balance. `body` receives the guard and may unlock it; a lock
    /// released inside `body` is not released a second time.
    pub fn synchronize<R, F>(&mut self, body: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let acquired_here = !self.held;
        if acquired_here {
            self.lock();
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| body(self)));

        if acquired_here && self.held {
            self.unlock();
        }

        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
