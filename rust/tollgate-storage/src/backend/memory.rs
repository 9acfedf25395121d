use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{PersistedStore, TollgateStorageError};

/// A trivial implementation of [PersistedStore] - backed by a [HashMap] -
/// where all values are kept in memory and never persisted.
///
/// Clones share the same entries, which makes it possible to hand one clone
/// to a session store and inspect the other from a test.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates a store pre-populated with `entries`
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Returns true when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns true when a value is stored against `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }
}

impl PersistedStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, TollgateStorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TollgateStorageError> {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TollgateStorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
