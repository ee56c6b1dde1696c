//! Error types for the worker bootstrap.
//!
//! # Design Decisions
//! - `BootError` says what went wrong; `Failure` adds where (a backtrace)
//! - Backtraces are always captured, whatever `RUST_BACKTRACE` says
//! - Reporting channel is chosen by the phase that failed, not by the error
//! - Exit status derives from the error: deliberate exits carry their own

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::validation::ValidationError;
use crate::lifecycle::phase::Phase;

/// Everything that can abort a worker bootstrap.
#[derive(Debug, Error)]
pub enum BootError {
    /// The required work directory environment variable is unset or empty.
    #[error("{0} not set")]
    MissingEnv(&'static str),

    /// Reading or writing a file in the handoff protocol failed.
    #[error("cannot access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A handoff entry name is not valid UTF-8.
    #[error("startup argument name {0:?} is not valid UTF-8")]
    InvalidKey(std::ffi::OsString),

    /// The startup options failed semantic validation.
    #[error("invalid startup options: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    /// A supervisor-provided option was about to be overwritten.
    #[error("cannot overwrite supervisor-provided option '{0}'")]
    ProtectedOption(String),

    /// A framework dependency could not be activated.
    #[error("dependency '{0}' is not available")]
    MissingDependency(String),

    /// The application loader rejected the entry-point file.
    #[error("cannot load application from {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// A deliberate exit request carrying its own status code.
    #[error("exit requested with status {0}")]
    Exit(i32),

    /// The request handler failed to start, run or clean up.
    #[error("request handler failed: {0}")]
    Handler(String),

    /// A collaborator call failed for a reason of its own.
    #[error("{0}")]
    Collaborator(String),
}

impl BootError {
    /// Short kind name used by the fallback formatter.
    pub fn kind(&self) -> &'static str {
        match self {
            BootError::MissingEnv(_) => "MissingEnv",
            BootError::Io { .. } => "Io",
            BootError::InvalidKey(_) => "InvalidKey",
            BootError::Config(_) => "Config",
            BootError::ProtectedOption(_) => "ProtectedOption",
            BootError::MissingDependency(_) => "MissingDependency",
            BootError::Load { .. } => "Load",
            BootError::Exit(_) => "Exit",
            BootError::Handler(_) => "Handler",
            BootError::Collaborator(_) => "Collaborator",
        }
    }

    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BootError::Io {
            path: path.into(),
            source,
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A `BootError` together with the backtrace captured where it surfaced.
#[derive(Debug)]
pub struct Failure {
    error: BootError,
    backtrace: Backtrace,
}

impl Failure {
    /// The underlying error.
    pub fn error(&self) -> &BootError {
        &self.error
    }

    /// Backtrace captured when the failure was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self.error {
            BootError::Exit(status) => status,
            _ => 1,
        }
    }
}

impl From<BootError> for Failure {
    fn from(error: BootError) -> Self {
        Self {
            error,
            backtrace: Backtrace::force_capture(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

/// Which operator-facing channel a failure is reported through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The platform broke: argument ingestion, runtime init, serving.
    Infrastructure,
    /// The hosted application's own loading code broke.
    Application,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Infrastructure => write!(f, "infrastructure"),
            Channel::Application => write!(f, "application"),
        }
    }
}

/// Terminal outcome of a failed bootstrap, produced after reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fatal {
    pub phase: Phase,
    pub channel: Channel,
    pub exit_code: i32,
}

/// Minimal text rendering used when no richer reporter is available.
///
/// Produces `"<message> (<kind>)"` followed by the error's source chain and,
/// when one was captured, the backtrace; each following line is indented by
/// two spaces.
pub fn format_failure(failure: &Failure) -> String {
    let error = failure.error();
    let mut result = format!("{} ({})", error, error.kind());

    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(result, "\n  caused by: {}", cause);
        source = cause.source();
    }

    if failure.backtrace().status() == BacktraceStatus::Captured {
        for line in failure.backtrace().to_string().lines() {
            let _ = write!(result, "\n  {}", line.trim_start());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_defaults_to_one() {
        let failure = Failure::from(BootError::Config(vec![ValidationError::Missing("app_root")]));
        assert_eq!(failure.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_uses_explicit_status() {
        let failure = Failure::from(BootError::Exit(3));
        assert_eq!(failure.exit_code(), 3);
        let failure = Failure::from(BootError::Exit(0));
        assert_eq!(failure.exit_code(), 0);
    }

    #[test]
    fn test_missing_env_message_names_variable() {
        let error = BootError::MissingEnv("SPAWN_WORK_DIR");
        assert_eq!(error.to_string(), "SPAWN_WORK_DIR not set");
    }

    #[test]
    fn test_config_error_lists_every_problem() {
        let error = BootError::Config(vec![
            ValidationError::Missing("app_root"),
            ValidationError::Empty("app_loader"),
        ]);
        assert_eq!(
            error.to_string(),
            "invalid startup options: required option 'app_root' is missing, option 'app_loader' is empty"
        );
    }

    #[test]
    fn test_format_failure_includes_kind_and_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let failure = Failure::from(BootError::io("/tmp/missing", io));
        let text = format_failure(&failure);

        let first = text.lines().next().unwrap();
        assert!(first.starts_with("cannot access /tmp/missing"));
        assert!(first.ends_with("(Io)"));
        assert!(text.contains("\n  caused by: no such file"));
    }

    #[test]
    fn test_backtrace_captured_without_env_opt_in() {
        // force_capture ignores RUST_BACKTRACE and RUST_LIB_BACKTRACE
        let failure = Failure::from(BootError::Collaborator("init blew up".into()));
        assert_eq!(failure.backtrace().status(), BacktraceStatus::Captured);

        let text = format_failure(&failure);
        assert!(text.starts_with("init blew up (Collaborator)"));
        assert!(text.lines().count() > 1);
        assert!(text.lines().skip(1).all(|line| line.starts_with("  ")));
    }
}
