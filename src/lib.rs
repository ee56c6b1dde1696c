//! Worker process bootstrap for an application server.
//!
//! A spawned worker receives its startup options from a supervisor through a
//! handoff directory, initializes its runtime, loads the hosted application
//! and serves requests until told to stop. [`sync::LockGuard`] is the lock
//! primitive the request handler uses for shared output.

pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod helpers;
pub mod lifecycle;
pub mod observability;
pub mod sync;

pub use config::StartupOptions;
pub use error::{BootError, Channel, Failure, Fatal};
pub use lifecycle::{Phase, WorkerBootstrap};
pub use sync::LockGuard;
