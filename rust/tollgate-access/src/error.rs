use thiserror::Error;
use tollgate_http::TollgateHttpError;

/// Errors raised while resolving access decisions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TollgateAccessError {
    /// The profile request did not succeed
    #[error("Profile request failed: {0}")]
    Http(#[from] TollgateHttpError),

    /// The profile response could not be turned into an identity
    #[error("Profile for {subject_id} is malformed: {reason}")]
    MalformedProfile {
        /// Subject whose profile was requested
        subject_id: String,
        /// What was wrong with it
        reason: String,
    },
}
