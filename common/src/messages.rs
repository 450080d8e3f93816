// common/src/messages.rs
use crate::models::HistoryEntry;
use actix::prelude::*;
use serde::{Deserialize, Serialize};

/// Events the gateway sends upstream to the realtime endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[rtype(result = "()")]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Subscribe { channel_id: String },
    #[serde(rename_all = "camelCase")]
    Unsubscribe { channel_id: String },
}

/// Events pushed to (and through) the gateway.
///
/// `HistoryUpdate` is the realtime payload from the upstream endpoint;
/// `Subscribed`/`Unsubscribed` are room acks; `Connected`/`Disconnected`
/// are bridge status events emitted toward the browser only.
#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[rtype(result = "()")]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerEvent {
    HistoryUpdate {
        #[serde(flatten)]
        entry: HistoryEntry,
    },
    #[serde(rename_all = "camelCase")]
    Subscribed { channel_id: String },
    #[serde(rename_all = "camelCase")]
    Unsubscribed { channel_id: String },
    Connected,
    Disconnected,
}
