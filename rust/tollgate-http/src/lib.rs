#![warn(missing_docs)]

//! An HTTP client pipeline that keeps the access-token lifecycle invisible
//! to callers.
//!
//! Requests flow through an ordered chain of [Middleware] before reaching a
//! [Transport]. [ApiClient] assembles the standard chain:
//!
//! 1. [RefreshMiddleware] watches responses. When one fails with an
//!    authorization status it refreshes the access token (once, shared by
//!    every request that failed against the same token) and re-issues the
//!    request a single time.
//! 2. [BearerAuth] stamps the current access token onto the request at the
//!    moment it is sent, so token rotation takes effect immediately.
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), tollgate_http::TollgateHttpError> {
//! use tollgate_http::{ApiClient, ClientConfig};
//! use tollgate_session::SessionStore;
//! use tollgate_storage::MemoryStorage;
//!
//! let session = SessionStore::open(MemoryStorage::default());
//! let client = ApiClient::new(
//!     ClientConfig {
//!         base_url: "https://api.example.com".into(),
//!         ..Default::default()
//!     },
//!     session.clone(),
//! )?;
//!
//! session.set_access_token("t1");
//! let modules: serde_json::Value = client.get_json("/modules").await?;
//! # Ok(())
//! # }
//! ```

pub use reqwest::{Method, StatusCode, header};

mod config;
pub use config::*;

mod error;
pub use error::*;

mod message;
pub use message::*;

mod transport;
pub use transport::*;

mod middleware;
pub use middleware::*;

mod bearer;
pub use bearer::*;

mod refresh;
pub use refresh::*;

mod client;
pub use client::*;

#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;

#[cfg(test)]
mod tests;
