use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use super::timestamp;

pub const SQS_EVENT_SOURCE: &str = "aws:sqs";

/// A batch of SQS messages delivered to the function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqsEvent<B> {
    #[serde(rename = "Records")]
    pub records: Vec<SqsRecord<B>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsRecord<B> {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: B,
    pub attributes: SqsAttributes,
    #[serde(default)]
    pub message_attributes: BTreeMap<String, SqsMessageAttribute>,
    pub md5_of_body: String,
    #[serde(default)]
    pub md5_of_message_attributes: Option<String>,
    #[serde(deserialize_with = "sqs_event_source")]
    pub event_source: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub aws_region: String,
}

fn sqs_event_source<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let source = String::deserialize(deserializer)?;
    if source == SQS_EVENT_SOURCE {
        Ok(source)
    } else {
        Err(D::Error::custom(format!(
            "unexpected eventSource {source:?}, expected {SQS_EVENT_SOURCE:?}"
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqsAttributes {
    /// How many times the message was received but not deleted.
    #[serde(rename = "ApproximateReceiveCount")]
    pub approximate_receive_count: String,
    #[serde(rename = "MessageDeduplicationId", default)]
    pub message_deduplication_id: Option<String>,
    #[serde(rename = "MessageGroupId", default)]
    pub message_group_id: Option<String>,
    #[serde(rename = "AWSTraceHeader", default)]
    pub aws_trace_header: Option<String>,
    #[serde(rename = "SentTimestamp", with = "timestamp")]
    pub sent_timestamp: DateTime<Utc>,
    #[serde(rename = "SequenceNumber", default)]
    pub sequence_number: Option<String>,
    /// Set when the message was moved off a dead-letter queue.
    #[serde(rename = "DeadLetterQueueSourceArn", default)]
    pub dead_letter_queue_source_arn: Option<String>,
    #[serde(rename = "SenderId")]
    pub sender_id: String,
    #[serde(rename = "ApproximateFirstReceiveTimestamp", with = "timestamp")]
    pub approximate_first_receive_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsMessageAttribute {
    #[serde(default)]
    pub string_value: Option<String>,
    /// Base64-encoded.
    #[serde(default)]
    pub binary_value: Option<String>,
    #[serde(default)]
    pub string_list_values: Vec<String>,
    #[serde(default)]
    pub binary_list_values: Vec<String>,
    /// `String`, `Number`, `Binary` or a custom `String.xyz` type.
    pub data_type: String,
}

/// One failed record, reported back so only it is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaCheckpointItem {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

/// The partial batch response (`ReportBatchItemFailures`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaCheckpointResponse {
    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<LambdaCheckpointItem>,
}

impl LambdaCheckpointResponse {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch_item_failures.is_empty()
    }
}

impl FromIterator<LambdaCheckpointItem> for LambdaCheckpointResponse {
    fn from_iter<I: IntoIterator<Item = LambdaCheckpointItem>>(iter: I) -> Self {
        Self {
            batch_item_failures: iter.into_iter().collect(),
        }
    }
}
