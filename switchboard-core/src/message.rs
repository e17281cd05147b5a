//! Message model persisted by the gateway

use crate::{MediaType, MessageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a message travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Delivery status of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content kind of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Document,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }

    /// Whether this type carries an attachment
    pub fn is_media(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl From<MediaType> for MessageType {
    fn from(media: MediaType) -> Self {
        match media {
            MediaType::Image => Self::Image,
            MediaType::Video => Self::Video,
            MediaType::Audio => Self::Audio,
            MediaType::Document => Self::Document,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields supplied when persisting a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub user_id: UserId,
    pub phone_number: String,
    pub direction: Direction,
    pub content: String,
    pub message_type: MessageType,
    pub media_url: Option<String>,
    pub status: MessageStatus,
}

impl NewMessage {
    /// Outbound message that the transport accepted
    pub fn outbound(
        user_id: UserId,
        phone_number: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            phone_number: phone_number.into(),
            direction: Direction::Outbound,
            content: content.into(),
            message_type: MessageType::Text,
            media_url: None,
            status: MessageStatus::Sent,
        }
    }

    /// Inbound message, already delivered to the gateway
    pub fn inbound(
        user_id: UserId,
        phone_number: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            phone_number: phone_number.into(),
            direction: Direction::Inbound,
            content: content.into(),
            message_type: MessageType::Text,
            media_url: None,
            status: MessageStatus::Delivered,
        }
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn with_media_url(mut self, media_url: Option<String>) -> Self {
        self.media_url = media_url;
        self
    }
}

/// A persisted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub user_id: UserId,
    pub phone_number: String,
    pub direction: Direction,
    pub content: String,
    pub status: MessageStatus,
    pub message_type: MessageType,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Materialize a new message with the id assigned by the store
    pub fn from_new(id: MessageId, new: NewMessage) -> Self {
        Self {
            id,
            user_id: new.user_id,
            phone_number: new.phone_number,
            direction: new.direction,
            content: new.content,
            status: new.status,
            message_type: new.message_type,
            media_url: new.media_url,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_defaults() {
        let out = NewMessage::outbound(1, "5511", "hello");
        assert_eq!(out.direction, Direction::Outbound);
        assert_eq!(out.status, MessageStatus::Sent);
        assert_eq!(out.message_type, MessageType::Text);

        let inbound = NewMessage::inbound(1, "5511", "hi").with_type(MessageType::Image);
        assert_eq!(inbound.direction, Direction::Inbound);
        assert_eq!(inbound.status, MessageStatus::Delivered);
        assert!(inbound.message_type.is_media());
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let message = Message::from_new(7, NewMessage::inbound(3, "5511", "hi"));
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["phoneNumber"], "5511");
        assert_eq!(json["messageType"], "text");
        assert_eq!(json["status"], "delivered");
        assert_eq!(json["direction"], "inbound");
    }
}
