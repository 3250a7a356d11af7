//! Wire types for the hosted backend REST API.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use servicehub_core::AccountId;

/// Attribute map of a document.
pub type Payload = serde_json::Map<String, Value>;

/// A stored document: system fields plus whatever attributes the collection
/// schema currently has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$collectionId", default)]
    pub collection_id: String,
    #[serde(rename = "$createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "$updatedAt", default)]
    pub updated_at: Option<String>,
    #[serde(rename = "$permissions", default)]
    pub permissions: Vec<String>,
    #[serde(flatten)]
    pub data: Payload,
}

impl Document {
    /// String attribute, if present and non-blank.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// First non-blank string among several attribute name variants.
    #[must_use]
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.str(key))
    }

    /// Numeric attribute, accepting numbers and numeric strings.
    #[must_use]
    pub fn f64(&self, key: &str) -> Option<f64> {
        match self.data.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn i64(&self, key: &str) -> Option<i64> {
        match self.data.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// `true` only for a boolean `true` attribute.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.data.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// A page of documents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// Document id for creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentId {
    /// Let the backend generate an id.
    Unique,
    /// Caller-chosen id (e.g. `user_<id>`); a second create conflicts (409).
    Custom(String),
}

impl DocumentId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unique => "unique()",
            Self::Custom(id) => id,
        }
    }
}

/// A permission role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role(String);

impl Role {
    /// `user:<id>` with the id sanitized to the allowed alphabet.
    #[must_use]
    pub fn user(id: &AccountId) -> Self {
        Self(format!("user:{}", id.sanitized()))
    }
}

/// A document permission string such as `read("user:abc")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    #[must_use]
    pub fn read(role: &Role) -> Self {
        Self(format!("read(\"{}\")", role.0))
    }

    #[must_use]
    pub fn update(role: &Role) -> Self {
        Self(format!("update(\"{}\")", role.0))
    }

    #[must_use]
    pub fn delete(role: &Role) -> Self {
        Self(format!("delete(\"{}\")", role.0))
    }

    /// Read, update and delete for one account.
    #[must_use]
    pub fn owner(id: &AccountId) -> Vec<Self> {
        let role = Role::user(id);
        vec![Self::read(&role), Self::update(&role), Self::delete(&role)]
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A list query, serialized as the JSON form the REST API accepts in
/// `queries[]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

impl Query {
    #[must_use]
    pub fn equal(attribute: &str, value: impl Into<Value>) -> Self {
        Self {
            method: "equal",
            attribute: Some(attribute.to_string()),
            values: vec![value.into()],
        }
    }

    #[must_use]
    pub fn limit(limit: u32) -> Self {
        Self {
            method: "limit",
            attribute: None,
            values: vec![json!(limit)],
        }
    }

    /// Value for one `queries[]` parameter.
    #[must_use]
    pub fn to_param(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "emailVerification", default)]
    pub email_verification: bool,
}

/// A session created for an account.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Only populated when the request carried the server API key.
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub expire: Option<String>,
}

/// Backend error body.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: u16,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Supported OAuth2 providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl OAuthProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "google" => Some(Self::Google),
            "facebook" => Some(Self::Facebook),
            _ => None,
        }
    }
}
