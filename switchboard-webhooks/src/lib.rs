//! Webhook delivery for Switchboard
//!
//! Domain events raised by the session layer are fanned out to the HTTP
//! subscriptions a user registered for them. Every delivery is signed when
//! the subscription has a secret and logged exactly once.
//!
//! # Features
//!
//! - **Subscription matching**: only active subscriptions that list the event kind
//! - **Signature**: lowercase hex HMAC-SHA256 of the exact body in `X-Webhook-Signature`
//! - **Detached delivery**: `trigger_event` never blocks the caller
//! - **Attempt log**: one [`DeliveryAttempt`] per delivery, no retries
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use switchboard_core::{EventKind, MessageStatus, MessageStatusData, WebhookEvent};
//! use switchboard_webhooks::{
//!     InMemoryWebhookStore, NewSubscription, WebhookConfig, WebhookDispatcher,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryWebhookStore::new());
//!     store
//!         .create(1, NewSubscription::new("https://example.com/hook", [EventKind::MessageStatus]))
//!         .await?;
//!
//!     let dispatcher = WebhookDispatcher::new(WebhookConfig::default(), store.clone(), store)?;
//!     dispatcher.trigger_event(
//!         1,
//!         WebhookEvent::from(MessageStatusData { message_id: 7, status: MessageStatus::Delivered }),
//!     );
//!     dispatcher.drain().await;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod dispatcher;
mod error;
mod payload;
mod signature;
mod store;
mod subscription;

pub use client::WebhookClient;
pub use config::{
    DEFAULT_MAX_CONCURRENT_DELIVERIES, DEFAULT_RESPONSE_SNIPPET_LIMIT, WebhookConfig,
    WebhookConfigBuilder,
};
pub use dispatcher::{EventSink, WebhookDispatcher};
pub use error::WebhookError;
pub use payload::{DeliveryAttempt, WebhookPayload};
pub use signature::{WebhookSignature, headers};
pub use store::{
    DEFAULT_ATTEMPT_LIMIT, DeliveryLogger, InMemoryWebhookStore, MAX_ATTEMPT_LIMIT,
    SubscriptionStore,
};
pub use subscription::{
    NewSubscription, SECRET_LEN, SubscriptionUpdate, WebhookSubscription, generate_secret,
};

/// Result type for webhook operations
pub type Result<T> = std::result::Result<T, WebhookError>;
