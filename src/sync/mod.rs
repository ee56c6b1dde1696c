//! Lock primitives shared by the request handler.
//!
//! # Data Flow
//! ```text
//! Arc<BlockingMutex>  (one per shared resource)
//!     → LockGuard      (one per owner / thread)
//!     → lock / unlock / synchronize / reset
//! ```
//!
//! # Design Decisions
//! - The raw mutex has no guard object; the `held` flag lives in `LockGuard`
//! - Misuse (double lock, unbalanced unlock) panics instead of deadlocking
//! - A guard is a single-owner view; threads share the raw mutex, not the guard

pub mod lock;
pub mod raw;

pub use lock::LockGuard;
pub use raw::{BlockingMutex, RawLock};
