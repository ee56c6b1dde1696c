//! Startup configuration subsystem.
//!
//! # Data Flow
//! ```text
//! SPAWN_WORK_DIR (env)
//!     → loader.rs (one file per key, raw bytes)
//!     → StartupOptions (supervisor keys, immutable)
//!     → runtime init adds derived keys
//!     → validation.rs (semantic checks, all errors at once)
//!     → WorkerConfig (typed view used by later phases)
//! ```
//!
//! # Design Decisions
//! - Values stay raw bytes; only the typed view decodes UTF-8
//! - Supervisor-provided keys cannot be overwritten by accident
//! - Validation separates "present" from "usable"

pub mod loader;
pub mod options;
pub mod schema;
pub mod validation;

pub use loader::{read_startup_arguments, work_dir_from, WORK_DIR_ENV};
pub use options::StartupOptions;
pub use schema::WorkerConfig;
pub use validation::ValidationError;
