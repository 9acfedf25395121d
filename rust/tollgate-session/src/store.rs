use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::watch;
use tollgate_common::StateCell;
use tollgate_storage::PersistedStore;

use crate::{Identity, Session, SessionConfig, SessionSync, TollgateSessionError};

struct Inner {
    storage: Box<dyn PersistedStore>,
    config: SessionConfig,
    state: StateCell<Session>,
    changes: watch::Sender<Session>,
}

/// Handle to the process-wide session.
///
/// Clones share state. Reads are synchronous and return a [Session]
/// snapshot; each mutation updates persisted storage and memory under one
/// exclusive borrow, so no reader can see a token that belongs to a
/// different identity than the one beside it. Once a mutation returns, its
/// new snapshot is published to every [SessionStore::subscribe] receiver.
///
/// Storage failures never reach callers: they are logged and memory stays
/// authoritative.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("SessionStore")
            .field("subject", &state.subject_id())
            .field("has_access_token", &state.has_access_token())
            .field("generation", &state.generation)
            .finish()
    }
}

impl SessionStore {
    /// Opens a session over `storage` using the default keys
    pub fn open<S>(storage: S) -> Self
    where
        S: PersistedStore + 'static,
    {
        Self::open_with_config(storage, SessionConfig::default())
    }

    /// Opens a session over `storage`, seeding memory from whatever is
    /// persisted there. Missing or malformed entries start out empty.
    pub fn open_with_config<S>(storage: S, config: SessionConfig) -> Self
    where
        S: PersistedStore + 'static,
    {
        let access_token = load::<String>(&storage, &config.access_token_key)
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "Discarding persisted access token");
                None
            })
            .unwrap_or_default();

        let identity = load::<Identity>(&storage, &config.identity_key)
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "Discarding persisted identity");
                None
            })
            .filter(|identity| !identity.subject_id.is_empty());

        let session = Session {
            identity,
            access_token,
            generation: 0,
        };
        let (changes, _) = watch::channel(session.clone());

        Self {
            inner: Arc::new(Inner {
                storage: Box::new(storage),
                config,
                state: StateCell::new(session),
                changes,
            }),
        }
    }

    /// The current session
    pub fn snapshot(&self) -> Session {
        self.inner.state.read().clone()
    }

    /// The current access token; empty when there is none
    pub fn access_token(&self) -> String {
        self.inner.state.read().access_token.clone()
    }

    /// The current identity
    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.read().identity.clone()
    }

    /// Receives a fresh [Session] after every mutation
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.changes.subscribe()
    }

    /// Replaces the identity wholesale, or clears it when `None`
    pub fn set_identity(&self, identity: Option<Identity>) {
        self.mutate(|store, session| store.replace_identity(session, identity));
    }

    /// Replaces the identity only if it has not been replaced or cleared
    /// since `generation` was observed. Returns whether it was applied.
    pub fn set_identity_if_current(&self, generation: u64, identity: Identity) -> bool {
        self.mutate(|store, session| {
            if session.generation != generation {
                tracing::debug!(
                    expected = generation,
                    actual = session.generation,
                    "Discarding identity resolved against a stale session"
                );
                return false;
            }
            store.replace_identity(session, Some(identity));
            true
        })
    }

    /// Replaces the access token
    pub fn set_access_token(&self, token: &str) {
        self.mutate(|store, session| store.replace_access_token(session, token));
    }

    /// Clears the access token but keeps the identity
    pub fn reset_access_token(&self) {
        self.mutate(|store, session| store.replace_access_token(session, ""));
    }

    /// Clears identity and access token
    pub fn reset(&self) {
        self.mutate(|store, session| {
            store.replace_access_token(session, "");
            store.replace_identity(session, None);
        });
    }

    /// Merges a server-issued update into the session. Fields absent from
    /// `payload` keep their current values.
    pub fn sync_from_server(&self, payload: &SessionSync) {
        self.mutate(|store, session| store.apply_sync(session, payload));
    }

    /// Like [SessionStore::sync_from_server], but only if the identity has
    /// not been replaced or cleared since `generation` was observed. Returns
    /// whether it was applied.
    pub fn sync_from_server_if_current(&self, generation: u64, payload: &SessionSync) -> bool {
        self.mutate(|store, session| {
            if session.generation != generation {
                tracing::debug!(
                    expected = generation,
                    actual = session.generation,
                    "Discarding server update issued to a stale session"
                );
                return false;
            }
            store.apply_sync(session, payload);
            true
        })
    }

    /// Identity generation of the current session
    pub fn generation(&self) -> u64 {
        self.inner.state.read().generation
    }

    fn mutate<R>(&self, change: impl FnOnce(&Inner, &mut Session) -> R) -> R {
        let (result, published) = {
            let mut session = self.inner.state.write();
            let result = change(self.inner.as_ref(), &mut *session);
            (result, session.clone())
        };
        self.inner.changes.send_replace(published);
        result
    }
}

impl Inner {
    fn apply_sync(&self, session: &mut Session, payload: &SessionSync) {
        if let Some(token) = payload.token.as_deref() {
            self.replace_access_token(session, token);
        }

        if let Some(patch) = payload.user.clone() {
            let previous_subject = session.subject_id().map(str::to_owned);
            let merged = patch.apply(session.identity.clone());
            let subject_changed = merged.as_ref().map(|identity| identity.subject_id.as_str())
                != previous_subject.as_deref();

            self.persist(&self.config.identity_key, merged.as_ref());
            session.identity = merged;
            if subject_changed {
                session.generation += 1;
            }
        }
    }

    fn replace_identity(&self, session: &mut Session, identity: Option<Identity>) {
        self.persist(&self.config.identity_key, identity.as_ref());
        session.identity = identity;
        session.generation += 1;
    }

    fn replace_access_token(&self, session: &mut Session, token: &str) {
        if token.is_empty() {
            self.persist::<String>(&self.config.access_token_key, None);
        } else {
            self.persist(&self.config.access_token_key, Some(&token.to_owned()));
        }
        session.access_token = token.to_owned();
    }

    fn persist<T>(&self, key: &str, value: Option<&T>)
    where
        T: Serialize,
    {
        if let Err(error) = store(self.storage.as_ref(), key, value) {
            tracing::warn!(%error, key, "Session change was not persisted");
        }
    }
}

fn load<T>(storage: &dyn PersistedStore, key: &str) -> Result<Option<T>, TollgateSessionError>
where
    T: DeserializeOwned,
{
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };

    serde_json::from_str::<Option<T>>(&raw).map_err(|error| TollgateSessionError::Malformed {
        key: key.to_owned(),
        reason: error.to_string(),
    })
}

fn store<T>(
    storage: &dyn PersistedStore,
    key: &str,
    value: Option<&T>,
) -> Result<(), TollgateSessionError>
where
    T: Serialize,
{
    match value {
        Some(value) => {
            let encoded =
                serde_json::to_string(value).map_err(|error| TollgateSessionError::EncodeFailed {
                    key: key.to_owned(),
                    reason: error.to_string(),
                })?;
            storage.set(key, &encoded)?;
        }
        None => storage.remove(key)?,
    }
    Ok(())
}
