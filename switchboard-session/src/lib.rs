//! Messaging transport sessions for Switchboard.
//!
//! Each user owns at most one connection to the external messaging network.
//! [`SessionRegistry`] creates it, drives its lifecycle from the events the
//! [`Transport`] reports and tears it down again:
//!
//! ```text
//! Uninitialized ─initialize─▶ Initializing ─challenge─▶ AwaitingScan
//!                                  │                        │
//!                                  └──── authenticated, ready ──▶ Connected
//!
//! auth failure ─▶ Failed        disconnected ─▶ Disconnected
//! ```
//!
//! `Failed` and `Disconnected` are terminal for the handle; the session is
//! removed and the next `initialize` starts fresh.
//!
//! Sent and received messages are persisted through a [`MessageStore`] and
//! announced through an [`EventSink`](switchboard_webhooks::EventSink).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use switchboard_session::*;
//! use switchboard_webhooks::{InMemoryWebhookStore, WebhookConfig, WebhookDispatcher};
//!
//! # async fn run(factory: Arc<dyn TransportFactory>) -> Result<(), Box<dyn std::error::Error>> {
//! let hooks = Arc::new(InMemoryWebhookStore::new());
//! let dispatcher = WebhookDispatcher::new(WebhookConfig::default(), hooks.clone(), hooks)?;
//!
//! let registry = SessionRegistry::new(
//!     SessionConfig::default(),
//!     factory,
//!     Arc::new(InMemoryMessageStore::new()),
//!     Arc::new(InMemoryMediaStorage::default()),
//!     Arc::new(dispatcher),
//! );
//!
//! registry.initialize(1).await?;
//! if let Some(challenge) = registry.challenge(1) {
//!     println!("scan: {}", challenge.to_data_url()?);
//! }
//! # Ok(())
//! # }
//! ```

mod challenge;
mod config;
mod error;
mod media;
mod message_store;
mod registry;
mod state;
mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use challenge::Challenge;
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use media::{InMemoryMediaStorage, MediaStorage, UploadedMedia, upload as upload_media};
pub use message_store::{InMemoryMessageStore, MessageStore};
pub use registry::{MEDIA_UNAVAILABLE, OutboundMessage, SessionRegistry, SessionStatus};
pub use state::{Effect, LifecycleEvent, SessionState, Transition, transition};
pub use transport::{
    CredentialStore, InboundMedia, InboundMessage, MediaRef, Transport, TransportContext,
    TransportError, TransportEvent, TransportFactory,
};
