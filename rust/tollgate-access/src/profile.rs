use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tollgate_common::ConditionalSync;
use tollgate_http::ApiClient;
use tollgate_session::Identity;

use crate::TollgateAccessError;

/// Where a subject's full profile comes from
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ProfileSource: ConditionalSync {
    /// Fetch the identity, including role designation, of `subject_id`
    async fn fetch_profile(&self, subject_id: &str) -> Result<Identity, TollgateAccessError>;
}

/// Configuration for [ApiProfiles]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Request path; `{id}` is replaced with the subject identifier
    pub path_template: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            path_template: "/users/{id}".into(),
        }
    }
}

impl ProfileConfig {
    /// The request path for `subject_id`
    pub fn path_for(&self, subject_id: &str) -> String {
        self.path_template.replace("{id}", subject_id)
    }
}

/// Fetches profiles from the API through the authenticated pipeline
#[derive(Clone, Debug)]
pub struct ApiProfiles {
    client: ApiClient,
    config: ProfileConfig,
}

impl ApiProfiles {
    #[allow(missing_docs)]
    pub fn new(client: ApiClient, config: ProfileConfig) -> Self {
        Self { client, config }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ProfileSource for ApiProfiles {
    async fn fetch_profile(&self, subject_id: &str) -> Result<Identity, TollgateAccessError> {
        let path = self.config.path_for(subject_id);
        let response: Value = self.client.get_json(&path).await?;
        identity_from_response(subject_id, response)
    }
}

const SUBJECT_FIELDS: [&str; 3] = ["subject_id", "subjectId", "id"];

/// Accepts the record either bare or wrapped in a `data` envelope. A record
/// that omits its own identifier is attributed to `subject_id`.
fn identity_from_response(
    subject_id: &str,
    response: Value,
) -> Result<Identity, TollgateAccessError> {
    let malformed = |reason: &str| TollgateAccessError::MalformedProfile {
        subject_id: subject_id.to_owned(),
        reason: reason.to_owned(),
    };

    let Value::Object(mut record) = response else {
        return Err(malformed("expected a JSON object"));
    };
    let mut record = match record.remove("data") {
        Some(Value::Object(inner)) => inner,
        Some(other) => {
            record.insert("data".into(), other);
            record
        }
        None => record,
    };
    if !SUBJECT_FIELDS.iter().any(|field| record.contains_key(*field)) {
        record.insert("subject_id".into(), Value::String(subject_id.to_owned()));
    }

    Identity::from_record(&Value::Object(record))
        .ok_or_else(|| malformed("no usable subject identifier"))
}
