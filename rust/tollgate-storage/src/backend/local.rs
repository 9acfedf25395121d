//! `window.localStorage` backend for `wasm32-unknown-unknown`.

use wasm_bindgen::JsValue;
use web_sys::Storage;

use crate::{PersistedStore, TollgateStorageError};

fn describe(value: JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

/// A [PersistedStore] that writes through to the browser's `localStorage`,
/// so that values survive a page reload.
///
/// An optional namespace is prepended to every key, allowing several
/// applications served from one origin to keep separate sessions.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    storage: Storage,
    namespace: Option<String>,
}

impl LocalStorage {
    /// Opens `window.localStorage`
    pub fn open() -> Result<Self, TollgateStorageError> {
        let window = web_sys::window()
            .ok_or_else(|| TollgateStorageError::Unavailable("no global window".into()))?;
        let storage = window
            .local_storage()
            .map_err(|error| TollgateStorageError::Unavailable(describe(error)))?
            .ok_or_else(|| TollgateStorageError::Unavailable("localStorage is disabled".into()))?;

        Ok(Self {
            storage,
            namespace: None,
        })
    }

    /// Prefixes every key with `namespace` and a `:` separator
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn key(&self, key: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}:{key}"),
            None => key.to_owned(),
        }
    }
}

impl PersistedStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, TollgateStorageError> {
        self.storage
            .get_item(&self.key(key))
            .map_err(|error| TollgateStorageError::ReadFailed {
                key: key.to_owned(),
                reason: describe(error),
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TollgateStorageError> {
        self.storage
            .set_item(&self.key(key), value)
            .map_err(|error| TollgateStorageError::WriteFailed {
                key: key.to_owned(),
                reason: describe(error),
            })
    }

    fn remove(&self, key: &str) -> Result<(), TollgateStorageError> {
        self.storage
            .remove_item(&self.key(key))
            .map_err(|error| TollgateStorageError::WriteFailed {
                key: key.to_owned(),
                reason: describe(error),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn it_round_trips_through_local_storage() {
        let storage = LocalStorage::open().unwrap().with_namespace("tollgate-test");
        storage.set("user", "{\"id\":\"u1\"}").unwrap();

        assert_eq!(
            storage.get("user").unwrap().as_deref(),
            Some("{\"id\":\"u1\"}")
        );

        storage.remove("user").unwrap();
        assert_eq!(storage.get("user").unwrap(), None);
    }
}
