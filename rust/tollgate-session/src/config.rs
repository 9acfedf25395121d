use serde::{Deserialize, Serialize};

/// Keys under which the session is persisted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Key holding the JSON-encoded access token
    pub access_token_key: String,

    /// Key holding the JSON-encoded identity
    pub identity_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_key: "access_token".to_string(),
            identity_key: "user".to_string(),
        }
    }
}
