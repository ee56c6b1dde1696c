//! Typed view over the startup options.
//!
//! Raw options stay the source of truth; `WorkerConfig` is decoded from them
//! once runtime init has added its derived keys.

use std::path::PathBuf;

use crate::config::options::StartupOptions;
use crate::config::validation::validate_options;
use crate::error::BootError;

/// Loader used when `app_loader` is not given.
pub const DEFAULT_APP_LOADER: &str = "static";

/// Bound on in-flight requests when `max_concurrency` is not given.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Decoded worker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Root directory of the hosted application.
    pub app_root: PathBuf,

    /// Explicit entry-point file, if the supervisor named one.
    pub startup_file: Option<PathBuf>,

    /// Name of the application loader to use.
    pub app_loader: String,

    /// Maximum number of requests handled at once.
    pub max_concurrency: usize,

    /// Deployment environment name (e.g. "production").
    pub environment: String,

    /// Directory the supervisor reads reports and readiness from.
    pub response_dir: Option<PathBuf>,
}

impl WorkerConfig {
    /// Validate and decode `options`.
    pub fn from_options(options: &StartupOptions) -> Result<Self, BootError> {
        validate_options(options).map_err(BootError::Config)?;

        // Validated above: text keys are UTF-8 and numeric keys parse.
        let text = |key: &str| {
            options
                .get(key)
                .and_then(|raw| std::str::from_utf8(raw).ok())
                .map(|s| s.trim().to_string())
        };

        Ok(Self {
            app_root: text("app_root").map(PathBuf::from).unwrap_or_default(),
            startup_file: text("startup_file").map(PathBuf::from),
            app_loader: text("app_loader").unwrap_or_else(|| DEFAULT_APP_LOADER.to_string()),
            max_concurrency: text("max_concurrency")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
            environment: text("environment").unwrap_or_else(|| "production".to_string()),
            response_dir: text("response_dir").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn options(pairs: &[(&str, &str)]) -> StartupOptions {
        let values: BTreeMap<String, Vec<u8>> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect();
        StartupOptions::from_supervisor(values)
    }

    #[test]
    fn test_defaults_apply() {
        let config = WorkerConfig::from_options(&options(&[("app_root", "/srv/app")])).unwrap();
        assert_eq!(config.app_root, PathBuf::from("/srv/app"));
        assert_eq!(config.startup_file, None);
        assert_eq!(config.app_loader, DEFAULT_APP_LOADER);
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.environment, "production");
        assert_eq!(config.response_dir, None);
    }

    #[test]
    fn test_explicit_values_are_decoded() {
        let config = WorkerConfig::from_options(&options(&[
            ("app_root", "/srv/app\n"),
            ("startup_file", "boot/app.toml"),
            ("app_loader", "static"),
            ("max_concurrency", "4"),
            ("environment", "staging"),
            ("response_dir", "/tmp/spawn/response"),
        ]))
        .unwrap();
        assert_eq!(config.app_root, PathBuf::from("/srv/app"));
        assert_eq!(config.startup_file, Some(PathBuf::from("boot/app.toml")));
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.environment, "staging");
        assert_eq!(config.response_dir, Some(PathBuf::from("/tmp/spawn/response")));
    }

    #[test]
    fn test_missing_app_root_is_config_error() {
        let err = WorkerConfig::from_options(&options(&[])).unwrap_err();
        assert!(matches!(err, BootError::Config(ref errors) if errors.len() == 1));
    }
}
