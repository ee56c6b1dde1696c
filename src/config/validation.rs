//! Startup option validation.
//!
//! # Responsibilities
//! - Check required keys are present and non-empty
//! - Check values decode as UTF-8 where a text value is expected
//! - Check numeric options parse and are in range
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: StartupOptions → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::options::StartupOptions;

/// Options that must be present.
pub const REQUIRED_KEYS: &[&str] = &["app_root"];

/// Options that must be text when present.
pub const TEXT_KEYS: &[&str] = &[
    "app_root",
    "startup_file",
    "app_loader",
    "environment",
    "response_dir",
];

/// Options that must be positive integers when present.
pub const POSITIVE_INT_KEYS: &[&str] = &["max_concurrency"];

/// A single semantic problem with the startup options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required option '{0}' is missing")]
    Missing(&'static str),

    #[error("option '{0}' is empty")]
    Empty(&'static str),

    #[error("option '{0}' is not valid UTF-8")]
    NotUtf8(&'static str),

    #[error("option '{key}' must be a positive integer, got '{value}'")]
    NotPositive { key: &'static str, value: String },
}

/// Validate `options`, collecting every problem found.
pub fn validate_options(options: &StartupOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for &key in REQUIRED_KEYS {
        if !options.contains_key(key) {
            errors.push(ValidationError::Missing(key));
        }
    }

    for &key in TEXT_KEYS {
        match options.get(key).map(std::str::from_utf8) {
            Some(Err(_)) => errors.push(ValidationError::NotUtf8(key)),
            Some(Ok(text)) if text.trim().is_empty() => errors.push(ValidationError::Empty(key)),
            _ => {}
        }
    }

    for &key in POSITIVE_INT_KEYS {
        if let Some(raw) = options.get(key) {
            let text = String::from_utf8_lossy(raw);
            match text.trim().parse::<usize>() {
                Ok(n) if n > 0 => {}
                _ => errors.push(ValidationError::NotPositive {
                    key,
                    value: text.into_owned(),
                }),
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
