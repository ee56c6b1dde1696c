//! Static builder loader.
//!
//! The entry-point file is a TOML builder document:
//!
//! ```toml
//! [run]
//! status = 200
//! body = "hello"
//! headers = { "Content-Type" = "text/plain" }
//!
//! [[map]]
//! path = "/health"
//! body = "ok"
//! ```
//!
//! `[run]` answers every request no mount matches; each `[[map]]` entry
//! answers requests under its path prefix, longest prefix first.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::app::loader::{AppLoader, EntryPoint};
use crate::app::{AppError, Application, ApplicationHandle, Env, Response};
use crate::config::StartupOptions;
use crate::error::BootError;

fn default_status() -> u16 {
    200
}

#[derive(Debug, Clone, Deserialize)]
struct StaticResponse {
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: String,
}

impl From<StaticResponse> for Response {
    fn from(r: StaticResponse) -> Self {
        Response {
            status: r.status,
            headers: r.headers,
            body: r.body,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Mount {
    path: String,
    #[serde(flatten)]
    response: StaticResponse,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuilderDocument {
    run: Option<StaticResponse>,
    #[serde(default)]
    map: Vec<Mount>,
}

/// Application built from a builder document.
#[derive(Debug, Clone)]
pub struct StaticApp {
    /// Mounts sorted by descending prefix length.
    mounts: Vec<(String, Response)>,
    fallback: Option<Response>,
}

impl StaticApp {
    fn route(&self, path: &str) -> Option<&Response> {
        self.mounts
            .iter()
            .find(|(prefix, _)| prefix_matches(prefix, path))
            .map(|(_, response)| response)
            .or(self.fallback.as_ref())
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl Application for StaticApp {
    fn call(&self, env: &Env) -> Result<Response, AppError> {
        let path = env.get("PATH_INFO").map(String::as_str).unwrap_or("/");
        Ok(self
            .route(path)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "Not Found").with_header("Content-Type", "text/plain")))
    }
}

/// Loader for static builder documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBuilderLoader;

impl StaticBuilderLoader {
    /// Parse a builder document into an application.
    pub fn build(&self, entry: &EntryPoint<'_>) -> Result<StaticApp, BootError> {
        let load_error = |reason: String| BootError::Load {
            path: entry.path.to_path_buf(),
            reason,
        };

        let text = std::str::from_utf8(entry.source)
            .map_err(|e| load_error(format!("entry point is not UTF-8: {}", e)))?;
        let document: BuilderDocument =
            toml::from_str(text).map_err(|e| load_error(e.to_string()))?;

        if document.run.is_none() && document.map.is_empty() {
            return Err(load_error("builder did not produce an application".to_string()));
        }

        let mut mounts = Vec::with_capacity(document.map.len());
        for mount in document.map {
            if !mount.path.starts_with('/') {
                return Err(load_error(format!(
                    "mount path '{}' must start with '/'",
                    mount.path
                )));
            }
            let prefix = match mount.path.trim_end_matches('/') {
                "" => "/".to_string(),
                trimmed => trimmed.to_string(),
            };
            mounts.push((prefix, Response::from(mount.response)));
        }
        mounts.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Ok(StaticApp {
            mounts,
            fallback: document.run.map(Response::from),
        })
    }
}

impl AppLoader for StaticBuilderLoader {
    fn name(&self) -> &str {
        "static"
    }

    fn framework(&self) -> &str {
        "static-builder"
    }

    fn load(
        &self,
        entry: &EntryPoint<'_>,
        _options: &StartupOptions,
    ) -> Result<ApplicationHandle, BootError> {
        let app = self.build(entry)?;
        tracing::info!(
            path = %entry.path.display(),
            mounts = app.mounts.len(),
            fallback = app.fallback.is_some(),
            "Static application built"
        );
        Ok(Arc::new(app))
    }
}
