use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Identity, Profile,
    identity::{canonical_identity, collapse_spellings, lenient_optional_string},
};

/// Session fields as a server reports them after sign-in or a token refresh.
///
/// Every field is optional: whatever is absent leaves the corresponding
/// session state untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSync {
    /// New access token
    #[serde(default, alias = "access_token", alias = "accessToken")]
    pub token: Option<String>,

    /// New refresh token. The session store never keeps this; it is handed
    /// on to whichever pipeline owns refresh.
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,

    /// Identity fields to merge
    #[serde(default)]
    pub user: Option<IdentityPatch>,
}

impl SessionSync {
    /// A payload that carries only an access token
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Adds a refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Adds identity fields
    pub fn with_user(mut self, user: IdentityPatch) -> Self {
        self.user = Some(user);
        self
    }

    /// Decodes a server response body, ignoring unknown fields. Fields the
    /// server spells more than one way are collapsed to one spelling first.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let Value::Object(fields) = value else {
            return SessionSync::deserialize(value);
        };

        let mut fields = fields.clone();
        collapse_spellings(&mut fields, &["token", "access_token", "accessToken"]);
        collapse_spellings(&mut fields, &["refresh_token", "refreshToken"]);
        if let Some(user) = fields.get_mut("user") {
            *user = canonical_identity(user);
        }
        SessionSync::deserialize(&Value::Object(fields))
    }
}

/// A partial [Identity]: `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityPatch {
    #[allow(missing_docs)]
    #[serde(
        default,
        alias = "subjectId",
        alias = "id",
        deserialize_with = "lenient_optional_string"
    )]
    pub subject_id: Option<String>,

    #[allow(missing_docs)]
    #[serde(default)]
    pub email: Option<String>,

    #[allow(missing_docs)]
    #[serde(default, alias = "roleId", deserialize_with = "lenient_optional_string")]
    pub role_id: Option<String>,

    #[allow(missing_docs)]
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl IdentityPatch {
    /// Applies the patch on top of `current`.
    ///
    /// With no current identity, a patch that names a subject creates one;
    /// a patch without a subject has nothing to attach to and yields `None`.
    pub fn apply(self, current: Option<Identity>) -> Option<Identity> {
        let mut identity = match (current, self.subject_id.as_deref()) {
            (Some(identity), _) => identity,
            (None, Some(subject)) if !subject.is_empty() => Identity::new(subject),
            (None, _) => return None,
        };

        if let Some(subject_id) = self.subject_id.filter(|subject| !subject.is_empty()) {
            identity.subject_id = subject_id;
        }
        if let Some(email) = self.email {
            identity.email = Some(email);
        }
        if let Some(role_id) = self.role_id {
            identity.role_id = Some(role_id);
        }
        if let Some(profile) = self.profile {
            identity.profile = Some(profile);
        }

        Some(identity)
    }
}
