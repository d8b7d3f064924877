use serde::{Deserialize, Serialize};

/// Seed input for one directory record. Serialized field names follow the
/// API's camelCase wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerkDescriptor {
    pub title: String,
    pub description: String,
    pub category: String,
    pub merchant: String,
    pub discount_percent: u8,
}

impl PerkDescriptor {
    /// The store's logical uniqueness key.
    pub fn logical_key(&self) -> (&str, &str) {
        (self.title.as_str(), self.merchant.as_str())
    }

    pub fn with_title(&self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self.clone()
        }
    }
}

/// A directory record as the store returns it. `id` is the deletion handle;
/// some deployments emit it as `_id` and some omit it entirely on embedded
/// listings, so it stays optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerkRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub merchant: String,
    #[serde(default)]
    pub discount_percent: u8,
}

impl PerkRecord {
    pub fn logical_key(&self) -> (&str, &str) {
        (self.title.as_str(), self.merchant.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredUser {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Outcome of a successful registration: the bearer token plus whatever user
/// document the API chose to echo back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSession {
    pub token: String,
    pub user: Option<RegisteredUser>,
}
