//! Worker bootstrap lifecycle.
//!
//! # Data Flow
//! ```text
//! ArgumentIngestion (startup.rs):  SPAWN_WORK_DIR → StartupOptions
//! RuntimeInit       (startup.rs):  locate helpers → unbuffer stdio → init → WorkerConfig
//! ApplicationLoad   (startup.rs):  hooks → loader → ApplicationHandle
//! RequestServing    (serving.rs):  construct handler → advertise → main loop
//! Shutdown          (shutdown.rs): cleanup → after_handling_requests
//!
//! failure in any phase → report (infrastructure | application) → exit status
//! ```
//!
//! # Design Decisions
//! - Phases run in order on one thread; none is re-entered
//! - State lives in an explicit `WorkerContext`, not in globals
//! - Phase functions return `Result`; the driver reports and decides the exit

pub mod bootstrap;
pub mod context;
pub mod phase;
pub mod serving;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use bootstrap::WorkerBootstrap;
pub use context::WorkerContext;
pub use phase::Phase;
pub use shutdown::Shutdown;
