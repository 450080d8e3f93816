// common/src/models/channel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One named, unit-tagged numeric measurement within a channel's schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub unit: String,
}

/// A named, user-owned data stream with a fixed field schema.
///
/// Owned by the backend; the gateway only holds read-through copies,
/// optionally augmented with live history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(rename = "_id", alias = "channelId")]
    pub channel_id: String,
    pub user_id: String,
    pub project_name: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<FieldDef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_data: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_entries: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
}

impl Channel {
    /// Field names must be unique within a channel; they form the key set
    /// expected in each history entry's data mapping.
    pub fn has_unique_field_names(fields: &[FieldDef]) -> bool {
        let mut seen = HashSet::new();
        fields.iter().all(|f| seen.insert(f.name.as_str()))
    }
}

/// One timestamped reading for a channel, keyed by field name.
///
/// `channel_id`, `data` and `created_at` are mandatory: a realtime event
/// missing any of them fails deserialization and is discarded by the
/// consumer instead of propagating a type error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub channel_id: String,
    pub data: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts from `/channels/user/{userId}/stats/overview`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_channels: u64,
    pub total_fields: u64,
    pub total_requests: u64,
}

/// Partial update body for `PUT /channels/{channelId}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldDef>>,
}
