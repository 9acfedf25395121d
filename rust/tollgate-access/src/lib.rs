#![warn(missing_docs)]

//! Authorization decisions over a [tollgate_session::SessionStore].
//!
//! [Permissions] answers "may the current subject do X" from a static
//! role → capability table, failing closed for unknown roles and unknown
//! capability names. [RouteGuard] runs before each navigation and resolves
//! to a [Decision]: proceed, or redirect to sign-in, to a role landing
//! area, or away from a forbidden destination. When the session names a
//! subject but no role, the guard fetches the subject's profile through
//! the API pipeline before deciding.

mod error;
pub use error::*;

mod capability;
pub use capability::*;

mod permission;
pub use permission::*;

mod profile;
pub use profile::*;

mod guard;
pub use guard::*;
