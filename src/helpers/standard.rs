//! Standard runtime helpers used by the `spawn-loader` binary.
//!
//! When the supervisor passes a `response_dir` option, reports and readiness
//! are written there:
//!
//! ```text
//! <response_dir>/error.json       failure report (internal | application)
//! <response_dir>/properties.json  advertised sockets
//! <response_dir>/finish           "1" once the worker is ready
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::config::{StartupOptions, ValidationError};
use crate::error::{format_failure, BootError, Failure};
use crate::handler::{RequestHandler, SocketDescriptor};
use crate::helpers::{LoaderHelpers, RuntimeLocator};

/// Locates [`StandardHelpers`] for a set of startup options.
#[derive(Debug, Clone, Default)]
pub struct StandardLocator {
    frameworks: Vec<String>,
}

impl StandardLocator {
    /// Create a locator whose helpers can activate `frameworks`.
    pub fn new(frameworks: Vec<String>) -> Self {
        Self { frameworks }
    }
}

impl RuntimeLocator for StandardLocator {
    fn locate(&self, options: &StartupOptions) -> Result<Box<dyn LoaderHelpers>, BootError> {
        let response_dir = match options.get("response_dir") {
            None => None,
            Some(raw) => {
                let text = std::str::from_utf8(raw)
                    .map_err(|_| BootError::Config(vec![ValidationError::NotUtf8("response_dir")]))?;
                let dir = PathBuf::from(text.trim());
                if !dir.is_dir() {
                    return Err(BootError::io(
                        &dir,
                        io::Error::new(io::ErrorKind::NotFound, "response directory does not exist"),
                    ));
                }
                Some(dir)
            }
        };

        tracing::debug!(
            response_dir = ?response_dir,
            frameworks = ?self.frameworks,
            "Runtime helpers located"
        );
        Ok(Box::new(StandardHelpers::new(
            response_dir,
            self.frameworks.clone(),
        )))
    }
}

/// Failure report written for the supervisor.
#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    category: &'a str,
    kind: &'a str,
    summary: String,
    details: String,
    exit_code: i32,
}

#[derive(Debug, Serialize)]
struct Properties<'a> {
    sockets: &'a [SocketDescriptor],
}

/// Logging and handoff-directory backed helpers.
#[derive(Debug, Clone)]
pub struct StandardHelpers {
    response_dir: Option<PathBuf>,
    frameworks: Vec<String>,
}

impl StandardHelpers {
    pub fn new(response_dir: Option<PathBuf>, frameworks: Vec<String>) -> Self {
        Self {
            response_dir,
            frameworks,
        }
    }

    fn write_response(&self, name: &str, contents: &[u8]) -> Result<(), BootError> {
        let Some(dir) = &self.response_dir else {
            return Ok(());
        };
        let path = dir.join(name);
        fs::write(&path, contents).map_err(|e| BootError::io(&path, e))
    }

    fn report(&self, category: &str, failure: &Failure) {
        let error = failure.error();
        let report = ErrorReport {
            category,
            kind: error.kind(),
            summary: error.to_string(),
            details: format_failure(failure),
            exit_code: failure.exit_code(),
        };

        tracing::error!(
            category,
            kind = report.kind,
            summary = %report.summary,
            "Worker failure"
        );

        let written = serde_json::to_vec_pretty(&report)
            .map_err(|e| BootError::Collaborator(e.to_string()))
            .and_then(|json| self.write_response("error.json", &json));
        if let Err(e) = written {
            tracing::warn!(error = %e, "Cannot write error report");
        }
    }
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl LoaderHelpers for StandardHelpers {
    fn init(&self, mut options: StartupOptions) -> Result<StartupOptions, BootError> {
        options.insert_derived("worker_pid", std::process::id().to_string())?;
        options.insert_derived("worker_started_at", unix_time().to_string())?;
        tracing::info!(options = options.len(), "Runtime initialized");
        Ok(options)
    }

    fn before_loading_app_code_step1(
        &self,
        startup_file: &Path,
        options: &StartupOptions,
    ) -> Result<(), BootError> {
        let app_root = options
            .get("app_root")
            .map(|raw| PathBuf::from(String::from_utf8_lossy(raw).trim()))
            .unwrap_or_default();
        if !app_root.is_dir() {
            return Err(BootError::io(
                &app_root,
                io::Error::new(io::ErrorKind::NotFound, "application root is not a directory"),
            ));
        }
        tracing::info!(
            app_root = %app_root.display(),
            startup_file = %startup_file.display(),
            "Loading application code"
        );
        Ok(())
    }

    fn run_load_path_setup_code(&self, _options: &StartupOptions) -> Result<(), BootError> {
        tracing::debug!("No load path customization");
        Ok(())
    }

    fn before_loading_app_code_step2(&self, options: &StartupOptions) -> Result<(), BootError> {
        let environment = options
            .get("environment")
            .map(String::from_utf8_lossy)
            .unwrap_or_else(|| "production".into());
        tracing::debug!(environment = %environment.trim(), "Application environment");
        Ok(())
    }

    fn activate_dependency(&self, name: &str) -> Result<(), BootError> {
        if !self.frameworks.iter().any(|f| f == name) {
            return Err(BootError::MissingDependency(name.to_string()));
        }
        tracing::debug!(dependency = name, "Dependency activated");
        Ok(())
    }

    fn after_loading_app_code(&self, _options: &StartupOptions) -> Result<(), BootError> {
        tracing::info!("Application code loaded");
        Ok(())
    }

    fn report_exception(&self, _options: &StartupOptions, failure: &Failure) {
        self.report("internal", failure);
    }

    fn report_app_exception(&self, _options: &StartupOptions, failure: &Failure) {
        self.report("application", failure);
    }

    fn about_to_abort(&self, _options: &StartupOptions, failure: &Failure) {
        tracing::warn!(exit_code = failure.exit_code(), "Worker about to abort");
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
    }

    fn before_handling_requests(
        &self,
        forked: bool,
        _options: &StartupOptions,
    ) -> Result<(), BootError> {
        tracing::info!(forked, pid = std::process::id(), "About to handle requests");
        Ok(())
    }

    fn advertise_sockets(
        &self,
        _options: &StartupOptions,
        handler: &dyn RequestHandler,
    ) -> Result<(), BootError> {
        let sockets = handler.sockets();
        for socket in &sockets {
            tracing::info!(
                name = %socket.name,
                address = %socket.address,
                protocol = %socket.protocol,
                concurrency = socket.concurrency,
                "Advertising socket"
            );
        }
        let json = serde_json::to_vec_pretty(&Properties { sockets: &sockets })
            .map_err(|e| BootError::Collaborator(e.to_string()))?;
        self.write_response("properties.json", &json)
    }

    fn advertise_readiness(&self, _options: &StartupOptions) -> Result<(), BootError> {
        self.write_response("finish", b"1")?;
        tracing::info!("Worker ready");
        Ok(())
    }

    fn after_handling_requests(&self) -> Result<(), BootError> {
        tracing::info!("Finished handling requests");
        Ok(())
    }
}
