//! Webhook payload and delivery attempt types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use switchboard_core::{EventKind, SubscriptionId, WebhookEvent};
use uuid::Uuid;

/// The JSON document POSTed to a subscription
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    /// Event kind, e.g. `message.sent`
    pub event: EventKind,

    /// When the payload was built, ISO-8601 UTC with millisecond precision
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Event-specific data
    pub data: WebhookEvent,
}

impl WebhookPayload {
    /// Build a payload for `event`, stamped now
    pub fn new(event: WebhookEvent) -> Self {
        Self {
            event: event.kind(),
            timestamp: Utc::now(),
            data: event,
        }
    }

    /// Set a custom timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Convert to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

fn serialize_timestamp<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Record of one delivery attempt
///
/// Written exactly once per matching subscription and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAttempt {
    /// Unique attempt ID
    pub id: Uuid,

    /// Subscription the payload was sent to
    pub subscription_id: SubscriptionId,

    /// Event kind that was delivered
    pub event: EventKind,

    /// The exact JSON body that was sent
    pub payload: String,

    /// HTTP status, or 0 when no response was received
    pub response_status: u16,

    /// Response body or error message, truncated
    pub response_body: String,

    /// Whether the target answered with a 2xx status
    pub success: bool,

    /// When the attempt finished
    pub created_at: DateTime<Utc>,
}

impl DeliveryAttempt {
    /// Attempt that received an HTTP response
    pub fn responded(
        subscription_id: SubscriptionId,
        event: EventKind,
        payload: String,
        status: u16,
        body: &str,
        snippet_limit: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscription_id,
            event,
            payload,
            response_status: status,
            response_body: truncate_chars(body, snippet_limit),
            success: (200..300).contains(&status),
            created_at: Utc::now(),
        }
    }

    /// Attempt that produced no usable response
    pub fn failed(
        subscription_id: SubscriptionId,
        event: EventKind,
        payload: String,
        error: &str,
        snippet_limit: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscription_id,
            event,
            payload,
            response_status: 0,
            response_body: truncate_chars(error, snippet_limit),
            success: false,
            created_at: Utc::now(),
        }
    }
}

/// Keep at most `max_chars` characters of `s`
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use switchboard_core::{MessageStatus, MessageStatusData};

    fn status_event() -> WebhookEvent {
        WebhookEvent::from(MessageStatusData {
            message_id: 9,
            status: MessageStatus::Delivered,
        })
    }

    #[test]
    fn test_payload_wire_shape() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let payload = WebhookPayload::new(status_event()).with_timestamp(timestamp);

        let json: serde_json::Value = serde_json::from_slice(&payload.to_bytes().unwrap()).unwrap();
        assert_eq!(json["event"], "message.status");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00.000Z");
        assert_eq!(json["data"]["messageId"], 9);
        assert_eq!(json["data"]["status"], "delivered");
    }

    #[test]
    fn test_success_range() {
        let ok = DeliveryAttempt::responded(1, EventKind::MessageSent, "{}".into(), 204, "", 1000);
        let redirect =
            DeliveryAttempt::responded(1, EventKind::MessageSent, "{}".into(), 301, "", 1000);
        let error = DeliveryAttempt::responded(1, EventKind::MessageSent, "{}".into(), 500, "", 1000);

        assert!(ok.success);
        assert!(!redirect.success);
        assert!(!error.success);
    }

    #[test]
    fn test_failed_attempt_has_zero_status() {
        let attempt = DeliveryAttempt::failed(
            3,
            EventKind::MessageReceived,
            "{}".into(),
            "connection refused",
            1000,
        );
        assert_eq!(attempt.response_status, 0);
        assert!(!attempt.success);
        assert_eq!(attempt.response_body, "connection refused");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte characters must not be split
        assert_eq!(truncate_chars("ééééé", 2), "éé");
        assert_eq!(truncate_chars(&"x".repeat(1500), 1000).chars().count(), 1000);
    }
}
