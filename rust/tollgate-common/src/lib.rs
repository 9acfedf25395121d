#![warn(missing_docs)]

//! Light weight helpers shared by the tollgate crates. The session, HTTP and
//! access crates all run both natively and inside a browser, so the bounds
//! and cells in here resolve to thread-safe types on native targets and to
//! single-threaded ones on `wasm32-unknown-unknown`.

mod sync;
pub use sync::*;
