use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Servers are inconsistent about whether identifiers are strings or numbers;
/// both are accepted and kept as strings.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(text) => text,
        Repr::Number(number) => number.to_string(),
    })
}

pub(crate) fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(serde_json::Number),
        Null,
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Text(text)) => Some(text),
        Some(Repr::Number(number)) => Some(number.to_string()),
        Some(Repr::Null) | None => None,
    })
}

const SUBJECT_SPELLINGS: &[&str] = &["subject_id", "subjectId", "id"];
const ROLE_SPELLINGS: &[&str] = &["role_id", "roleId"];
const FIRST_NAME_SPELLINGS: &[&str] = &["first_name", "firstName"];
const LAST_NAME_SPELLINGS: &[&str] = &["last_name", "lastName"];

/// Keeps a single spelling of a field that servers send under several
/// names. The first non-null value in `spellings` order wins and is stored
/// under the first spelling; serde would otherwise reject the record as
/// carrying a duplicate field.
pub(crate) fn collapse_spellings(record: &mut Map<String, Value>, spellings: &[&str]) {
    let kept = spellings
        .iter()
        .find_map(|spelling| record.get(*spelling).filter(|value| !value.is_null()).cloned());
    for spelling in spellings {
        record.remove(*spelling);
    }
    if let (Some(value), Some(canonical)) = (kept, spellings.first()) {
        record.insert((*canonical).to_owned(), value);
    }
}

/// `record` with every aliased identity and profile field collapsed to one
/// spelling. Anything that is not an object is returned unchanged.
pub(crate) fn canonical_identity(record: &Value) -> Value {
    let Value::Object(fields) = record else {
        return record.clone();
    };

    let mut fields = fields.clone();
    collapse_spellings(&mut fields, SUBJECT_SPELLINGS);
    collapse_spellings(&mut fields, ROLE_SPELLINGS);
    if let Some(Value::Object(profile)) = fields.get_mut("profile") {
        collapse_spellings(profile, FIRST_NAME_SPELLINGS);
        collapse_spellings(profile, LAST_NAME_SPELLINGS);
    }
    Value::Object(fields)
}

/// The authenticated subject as it is held in memory and persisted.
///
/// Only the fields declared here survive deserialization; anything else a
/// server sends alongside them is dropped before it can reach persisted
/// storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identifier of the subject
    #[serde(alias = "subjectId", alias = "id", deserialize_with = "lenient_string")]
    pub subject_id: String,

    /// Contact address, when the server shares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role designation, e.g. `"admin"`
    #[serde(
        default,
        alias = "roleId",
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub role_id: Option<String>,

    /// Nested profile record, kept whole
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl Identity {
    /// An identity holding nothing but a subject identifier
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: None,
            role_id: None,
            profile: None,
        }
    }

    /// Sets the direct role designation
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role_id = Some(role.into());
        self
    }

    /// Sets the contact address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attaches a nested profile
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Picks the allow-listed identity fields out of an arbitrary server
    /// record. Returns `None` when the record has no usable subject
    /// identifier. A record may spell a field several ways (`id` and
    /// `subject_id`, say); the canonical spelling wins.
    pub fn from_record(record: &Value) -> Option<Self> {
        let record = canonical_identity(record);
        let identity = Identity::deserialize(&record).ok()?;
        (!identity.subject_id.is_empty()).then_some(identity)
    }

    /// The role designation: the direct field when present, otherwise the
    /// one on the nested profile.
    pub fn role_designation(&self) -> Option<&str> {
        self.role_id
            .as_deref()
            .filter(|role| !role.is_empty())
            .or_else(|| {
                self.profile
                    .as_ref()
                    .and_then(|profile| profile.role.as_deref())
                    .filter(|role| !role.is_empty())
            })
    }
}

/// Profile details nested under an [Identity].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Role designation as recorded on the profile
    #[serde(
        default,
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<String>,

    #[allow(missing_docs)]
    #[serde(default, alias = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[allow(missing_docs)]
    #[serde(default, alias = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Any other profile attributes
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Profile {
    /// A profile carrying only a role designation
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            ..Default::default()
        }
    }
}
