#![warn(missing_docs)]

//! The session store is the single source of truth for who is signed in and
//! with which access token. Every other component (the HTTP pipeline, the
//! route guard, the permission evaluator) holds a clone of the same
//! [SessionStore] handle and either reads a [Session] snapshot from it or
//! calls one of its mutation operations; nothing mutates session fields
//! directly.
//!
//! ```rust
//! use tollgate_session::{Identity, SessionStore, SessionSync};
//! use tollgate_storage::MemoryStorage;
//!
//! let store = SessionStore::open(MemoryStorage::default());
//! store.set_identity(Some(Identity::new("u1").with_role("admin")));
//! store.set_access_token("t1");
//!
//! // A refresh response carrying only a token keeps the identity intact
//! store.sync_from_server(&SessionSync::token("t2"));
//!
//! let session = store.snapshot();
//! assert_eq!(session.access_token, "t2");
//! assert_eq!(session.role_designation(), Some("admin"));
//! ```

mod config;
pub use config::*;

mod error;
pub use error::*;

mod identity;
pub use identity::*;

mod payload;
pub use payload::*;

mod session;
pub use session::*;

mod store;
pub use store::*;
