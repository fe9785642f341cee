use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// An EventBridge event envelope around a service-specific `detail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBridgeEvent<D> {
    /// Always `"0"` today.
    pub version: String,
    pub id: String,
    /// Emitting service; AWS sources start with `aws.`.
    pub source: String,
    pub account: String,
    #[serde(with = "timestamp")]
    pub time: DateTime<Utc>,
    pub region: String,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    pub detail: D,
    #[serde(rename = "replay-name", default, skip_serializing_if = "Option::is_none")]
    pub replay_name: Option<String>,
}
