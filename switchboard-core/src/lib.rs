//! Shared domain types for Switchboard.
//!
//! Everything the session registry and the webhook dispatcher need to agree
//! on lives here: identifiers, the message model, the typed webhook events,
//! the media classification rule and phone-number handling.
//!
//! # Example
//!
//! ```rust
//! use switchboard_core::{classify_mime, MediaType, phone};
//!
//! assert_eq!(classify_mime("image/png").unwrap(), MediaType::Image);
//! assert_eq!(phone::to_address("+55 (11) 9999-9999", "c.us"), "551199999999@c.us");
//! ```

mod error;
mod event;
mod media;
mod message;
pub mod phone;

pub use error::{MediaError, ValidationError};
pub use event::{
    EventKind, MessageReceivedData, MessageSentData, MessageStatusData, WebhookEvent,
};
pub use media::{MAX_MEDIA_SIZE, MediaType, classify_mime, validate_media_size};
pub use message::{Direction, Message, MessageStatus, MessageType, NewMessage};

/// Tenant identifier.
pub type UserId = i64;

/// Identifier of a persisted message.
pub type MessageId = i64;

/// Identifier of a webhook subscription.
pub type SubscriptionId = i64;
