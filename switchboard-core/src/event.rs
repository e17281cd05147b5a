//! Typed webhook events
//!
//! Each event kind carries a fixed data shape. The data is what ends up in
//! the `data` member of the webhook payload.

use crate::{MessageId, MessageStatus, MessageType, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event kinds a subscription can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "message.sent")]
    MessageSent,
    #[serde(rename = "message.received")]
    MessageReceived,
    #[serde(rename = "message.status")]
    MessageStatus,
}

impl EventKind {
    /// All known event kinds
    pub const ALL: [EventKind; 3] = [
        EventKind::MessageSent,
        EventKind::MessageReceived,
        EventKind::MessageStatus,
    ];

    /// Dotted event name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageSent => "message.sent",
            Self::MessageReceived => "message.received",
            Self::MessageStatus => "message.status",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownEvent(s.to_string()))
    }
}

/// Data for `message.sent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSentData {
    pub message_id: MessageId,
    pub phone_number: String,
    pub content: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub media_url: Option<String>,
}

/// Data for `message.received`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceivedData {
    pub message_id: MessageId,
    pub phone_number: String,
    pub content: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub media_url: Option<String>,
}

/// Data for `message.status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatusData {
    pub message_id: MessageId,
    pub status: MessageStatus,
}

/// A domain event raised by the session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WebhookEvent {
    MessageSent(MessageSentData),
    MessageReceived(MessageReceivedData),
    MessageStatus(MessageStatusData),
}

impl WebhookEvent {
    /// The kind used for subscription matching
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MessageSent(_) => EventKind::MessageSent,
            Self::MessageReceived(_) => EventKind::MessageReceived,
            Self::MessageStatus(_) => EventKind::MessageStatus,
        }
    }

    /// The message this event is about
    pub fn message_id(&self) -> MessageId {
        match self {
            Self::MessageSent(data) => data.message_id,
            Self::MessageReceived(data) => data.message_id,
            Self::MessageStatus(data) => data.message_id,
        }
    }
}

impl From<MessageSentData> for WebhookEvent {
    fn from(data: MessageSentData) -> Self {
        Self::MessageSent(data)
    }
}

impl From<MessageReceivedData> for WebhookEvent {
    fn from(data: MessageReceivedData) -> Self {
        Self::MessageReceived(data)
    }
}

impl From<MessageStatusData> for WebhookEvent {
    fn from(data: MessageStatusData) -> Self {
        Self::MessageStatus(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::MessageSent.as_str(), "message.sent");
        assert_eq!("message.status".parse::<EventKind>(), Ok(EventKind::MessageStatus));
        assert!("message.deleted".parse::<EventKind>().is_err());

        let json = serde_json::to_string(&EventKind::MessageReceived).unwrap();
        assert_eq!(json, "\"message.received\"");
    }

    #[test]
    fn test_event_data_is_untagged() {
        let event = WebhookEvent::from(MessageStatusData {
            message_id: 42,
            status: MessageStatus::Delivered,
        });

        assert_eq!(event.kind(), EventKind::MessageStatus);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"messageId": 42, "status": "delivered"})
        );
    }

    #[test]
    fn test_received_data_keeps_null_media_url() {
        let event = WebhookEvent::from(MessageReceivedData {
            message_id: 1,
            phone_number: "551199999999".into(),
            content: "hi".into(),
            message_type: MessageType::Text,
            media_url: None,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json.get("mediaUrl"), Some(&serde_json::Value::Null));
        assert_eq!(json["messageType"], "text");
    }

    #[test]
    fn test_sent_and_received_agree_on_missing_media_url() {
        let sent = WebhookEvent::from(MessageSentData {
            message_id: 7,
            phone_number: "551199999999".into(),
            content: "hello".into(),
            message_type: MessageType::Text,
            media_url: None,
        });
        let received = WebhookEvent::from(MessageReceivedData {
            message_id: 8,
            phone_number: "551199999999".into(),
            content: "hello".into(),
            message_type: MessageType::Text,
            media_url: None,
        });

        let sent = serde_json::to_value(&sent).unwrap();
        let received = serde_json::to_value(&received).unwrap();
        assert_eq!(sent.get("mediaUrl"), Some(&serde_json::Value::Null));
        assert_eq!(sent.get("mediaUrl"), received.get("mediaUrl"));

        let parsed: MessageSentData = serde_json::from_value(serde_json::json!({
            "messageId": 7,
            "phoneNumber": "551199999999",
            "content": "hello",
            "messageType": "text"
        }))
        .unwrap();
        assert_eq!(parsed.media_url, None);
    }
}
