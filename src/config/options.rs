//! The key/value mapping handed over by the supervisor.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::BootError;

/// Startup options: string keys mapped to raw byte values.
///
/// Keys ingested from the supervisor are recorded as such. Later phases may
/// add derived keys with [`StartupOptions::insert_derived`], which refuses to
/// touch a supervisor key; replacing one takes an explicit
/// [`StartupOptions::override_supervisor`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupOptions {
    values: BTreeMap<String, Vec<u8>>,
    supervisor_keys: BTreeSet<String>,
}

impl StartupOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options whose every key came from the supervisor.
    pub fn from_supervisor(values: BTreeMap<String, Vec<u8>>) -> Self {
        let supervisor_keys = values.keys().cloned().collect();
        Self {
            values,
            supervisor_keys,
        }
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.values.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Return true if `key` was provided by the supervisor.
    pub fn is_supervisor_key(&self, key: &str) -> bool {
        self.supervisor_keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Add or replace a derived key.
    ///
    /// Fails with [`BootError::ProtectedOption`] if `key` came from the
    /// supervisor.
    pub fn insert_derived(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), BootError> {
        let key = key.into();
        if self.supervisor_keys.contains(&key) {
            return Err(BootError::ProtectedOption(key));
        }
        self.values.insert(key, value.into());
        Ok(())
    }

    /// Deliberately replace a supervisor-provided value.
    ///
    /// Returns the previous value. The key keeps its supervisor status.
    pub fn override_supervisor(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Option<Vec<u8>> {
        let key = key.into();
        tracing::warn!(key = %key, "Overriding supervisor-provided startup option");
        self.supervisor_keys.insert(key.clone());
        self.values.insert(key, value.into())
    }
}
