//! Runtime helper collaborators.
//!
//! # Responsibilities
//! - Locate the runtime helpers (may fail: reporting falls back to text)
//! - Initialize the runtime and add derived options
//! - Run the pre-load and post-load hooks around application loading
//! - Report infrastructure and application failures on separate entry points
//! - Advertise sockets and readiness to the supervisor
//!
//! # Design Decisions
//! - Hooks return `Result` so the bootstrap can route their failures
//! - Reporting never fails from the caller's point of view

pub mod standard;

use std::io::Write;

use crate::config::StartupOptions;
use crate::error::{BootError, Failure};
use crate::handler::RequestHandler;

pub use standard::{StandardHelpers, StandardLocator};

/// Finds the runtime helpers for this worker.
pub trait RuntimeLocator {
    /// Resolve the helpers, or fail before any rich reporting exists.
    fn locate(&self, options: &StartupOptions) -> Result<Box<dyn LoaderHelpers>, BootError>;
}

/// Hooks and reporting entry points the bootstrap drives.
pub trait LoaderHelpers {
    /// Make pending stdio visible to the supervisor.
    ///
    /// Rust's stdout stays line-buffered and cannot be switched off, so the
    /// default only flushes whatever is pending on stdout and stderr. Writers
    /// that need immediate delivery emit whole lines and flush them
    /// explicitly, as the JSON-lines handler does.
    fn disable_stdio_buffering(&self) -> Result<(), BootError> {
        std::io::stdout()
            .flush()
            .and_then(|()| std::io::stderr().flush())
            .map_err(|e| BootError::Collaborator(format!("cannot flush stdio: {}", e)))
    }

    /// Initialize the runtime; may return additional derived options.
    fn init(&self, options: StartupOptions) -> Result<StartupOptions, BootError>;

    fn before_loading_app_code_step1(
        &self,
        startup_file: &std::path::Path,
        options: &StartupOptions,
    ) -> Result<(), BootError>;

    fn run_load_path_setup_code(&self, options: &StartupOptions) -> Result<(), BootError>;

    fn before_loading_app_code_step2(&self, options: &StartupOptions) -> Result<(), BootError>;

    /// Make the named framework dependency available.
    fn activate_dependency(&self, name: &str) -> Result<(), BootError>;

    fn after_loading_app_code(&self, options: &StartupOptions) -> Result<(), BootError>;

    /// Report a platform failure.
    fn report_exception(&self, options: &StartupOptions, failure: &Failure);

    /// Report a failure in the hosted application's loading code.
    fn report_app_exception(&self, options: &StartupOptions, failure: &Failure);

    /// Last call before the process exits with a failure.
    fn about_to_abort(&self, options: &StartupOptions, failure: &Failure);

    fn before_handling_requests(
        &self,
        forked: bool,
        options: &StartupOptions,
    ) -> Result<(), BootError>;

    /// Tell the supervisor where the handler accepts requests.
    fn advertise_sockets(
        &self,
        options: &StartupOptions,
        handler: &dyn RequestHandler,
    ) -> Result<(), BootError>;

    /// Tell the supervisor the worker is ready.
    fn advertise_readiness(&self, options: &StartupOptions) -> Result<(), BootError>;

    fn after_handling_requests(&self) -> Result<(), BootError>;
}
