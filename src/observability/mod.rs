//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (phase, channel, request_id fields)
//!     → logging.rs subscriber (stderr)
//!
//! stdout is reserved for handler responses and the fallback formatter.
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing by the supervisor
//! - Pretty format for development
//! - Log level configurable via CLI and `RUST_LOG`

pub mod logging;

pub use logging::{init_logging, LogFormat};
