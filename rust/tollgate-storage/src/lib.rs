#![warn(missing_docs)]

//! This crate defines the narrow contract the session layer needs from
//! persisted storage: string values stored against string keys, with `get`,
//! `set` and `remove`. Two backends are provided:
//!
//! - [`MemoryStorage`] keeps entries in memory and never persists them. It is
//!   the backend used natively and in tests.
//! - `LocalStorage` (only on `wasm32-unknown-unknown`) writes through to the
//!   browser's `window.localStorage`, so values survive page reloads.
//!
//! ```rust
//! use tollgate_storage::{MemoryStorage, PersistedStore};
//!
//! let storage = MemoryStorage::default();
//! storage.set("access_token", "\"abc\"").unwrap();
//!
//! assert_eq!(storage.get("access_token").unwrap().as_deref(), Some("\"abc\""));
//! ```

mod error;
pub use error::*;

mod backend;
pub use backend::*;

use std::sync::Arc;

use tollgate_common::ConditionalSync;

/// A synchronous string key-value store.
///
/// Reads happen while rendering, so the contract is synchronous.
/// Implementations must be cheap to call and must not block on I/O for long.
pub trait PersistedStore: ConditionalSync {
    /// Retrieve the value (if any) stored against `key`
    fn get(&self, key: &str) -> Result<Option<String>, TollgateStorageError>;

    /// Store `value` against `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), TollgateStorageError>;

    /// Remove any value stored against `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), TollgateStorageError>;
}

impl<T> PersistedStore for Arc<T>
where
    T: PersistedStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<String>, TollgateStorageError> {
        T::get(self, key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TollgateStorageError> {
        T::set(self, key, value)
    }

    fn remove(&self, key: &str) -> Result<(), TollgateStorageError> {
        T::remove(self, key)
    }
}
