use crate::Identity;

/// A point-in-time view of the session.
///
/// Snapshots are plain values: holding one never blocks a mutation, and a
/// snapshot never changes after it was taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// The signed-in subject, if any
    pub identity: Option<Identity>,

    /// Bearer credential; empty when there is none
    pub access_token: String,

    /// Bumped every time the identity is replaced or cleared. Used to detect
    /// that an asynchronous lookup was started against an identity that is
    /// no longer current.
    pub generation: u64,
}

impl Session {
    /// True when an access token is present
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// The subject identifier, if one is resolvable
    pub fn subject_id(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .map(|identity| identity.subject_id.as_str())
            .filter(|subject| !subject.is_empty())
    }

    /// True when there is both a token and a resolvable subject
    pub fn is_authenticated(&self) -> bool {
        self.has_access_token() && self.subject_id().is_some()
    }

    /// See [Identity::role_designation]
    pub fn role_designation(&self) -> Option<&str> {
        self.identity.as_ref().and_then(Identity::role_designation)
    }
}
