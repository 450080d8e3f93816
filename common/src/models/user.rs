// common/src/models/user.rs
use serde::{Deserialize, Serialize};

/// Backend role values. Anything the gateway does not recognize is rejected
/// at deserialization, which the callers treat as a malformed upstream body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// A registered MERKE Cloud user, as returned by the backend.
///
/// The gateway never mutates this; it only displays and forwards it. The
/// backend identifies users with a Mongo-style `_id`; the `alias` lets the
/// gateway re-read its own normalized bodies, which carry `id` as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Long-lived ingestion credential, round-tripped opaquely
    #[serde(default)]
    pub api_key: Option<String>,
}
