//! Pluggable application loaders.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::app::builder::StaticBuilderLoader;
use crate::app::ApplicationHandle;
use crate::config::StartupOptions;
use crate::error::BootError;

/// The entry-point file, already read in full.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoint<'a> {
    pub path: &'a Path,
    pub source: &'a [u8],
}

/// Turns an entry-point file into an application.
pub trait AppLoader: Send + Sync {
    /// Name matched against the `app_loader` option.
    fn name(&self) -> &str;

    /// Framework dependency activated before this loader runs.
    fn framework(&self) -> &str;

    /// Build the application described by `entry`.
    fn load(
        &self,
        entry: &EntryPoint<'_>,
        options: &StartupOptions,
    ) -> Result<ApplicationHandle, BootError>;
}

/// Loaders available to the worker, keyed by name.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: BTreeMap<String, Arc<dyn AppLoader>>,
}

impl LoaderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in loader.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(StaticBuilderLoader));
        registry
    }

    /// Add a loader, replacing any loader with the same name.
    pub fn register(&mut self, loader: Arc<dyn AppLoader>) {
        self.loaders.insert(loader.name().to_string(), loader);
    }

    /// Look up the loader called `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn AppLoader>, BootError> {
        self.loaders
            .get(name)
            .cloned()
            .ok_or_else(|| BootError::MissingDependency(format!("app loader '{}'", name)))
    }

    /// Framework names of all registered loaders.
    pub fn frameworks(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .loaders
            .values()
            .map(|l| l.framework().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
