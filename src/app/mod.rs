//! Hosted application contract.
//!
//! # Data Flow
//! ```text
//! entry-point file (default <app_root>/config.ru)
//!     → loader.rs (registry lookup by `app_loader` option)
//!     → builder.rs (static builder document)
//!     → ApplicationHandle (shared with the request handler)
//! ```
//!
//! # Design Decisions
//! - Loaders are selected by configuration; no source text is executed
//! - An application is a single `call(env) -> (status, headers, body)`

pub mod builder;
pub mod loader;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use builder::StaticBuilderLoader;
pub use loader::{AppLoader, EntryPoint, LoaderRegistry};

/// Request environment passed to an application.
pub type Env = BTreeMap<String, String>;

/// Status, headers and body returned by an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Add a header, replacing any previous value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Error raised by an application while handling a request.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AppError(pub String);

/// A loaded application.
pub trait Application: Send + Sync {
    /// Handle one request.
    fn call(&self, env: &Env) -> Result<Response, AppError>;
}

/// Shared handle to the loaded application.
pub type ApplicationHandle = Arc<dyn Application>;
