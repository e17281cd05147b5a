//! Traits for messaging transport implementations.
//!
//! A transport is one authenticated connection to the external messaging
//! network on behalf of one user. The registry constructs it through a
//! [`TransportFactory`], receives its events on the channel inside the
//! [`TransportContext`] and tears it down with [`Transport::destroy`].

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use switchboard_core::{MessageType, UserId};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors reported by a transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Message could not be sent
    #[error("send failed: {0}")]
    Send(String),

    /// The operation was cancelled by a disconnect
    #[error("operation cancelled")]
    Cancelled,

    /// The transport is already closed
    #[error("transport closed")]
    Closed,
}

/// Media received from the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMedia {
    pub mime_type: String,
    pub data: Bytes,
    pub filename: Option<String>,
}

/// A message received from the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender address or phone number
    pub from: String,
    /// Text body or media caption
    pub body: String,
    pub media: Option<InboundMedia>,
}

/// Media attached to an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub url: String,
    pub message_type: MessageType,
}

/// Events a transport reports to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A scannable challenge payload is ready
    Challenge(String),
    Authenticated,
    Ready,
    AuthFailed(String),
    Disconnected(String),
    MessageReceived(InboundMessage),
}

/// Where a transport keeps the credentials of one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStore {
    pub client_id: String,
    pub data_path: PathBuf,
}

impl CredentialStore {
    /// Credentials of `user_id` below `dir`
    pub fn for_user(dir: &Path, user_id: UserId) -> Self {
        Self {
            client_id: format!("user_{user_id}"),
            data_path: dir.join(format!("session_{user_id}")),
        }
    }
}

/// Handles given to a transport at construction time
#[derive(Debug, Clone)]
pub struct TransportContext {
    events: mpsc::UnboundedSender<TransportEvent>,
    cancel: CancellationToken,
}

impl TransportContext {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// Report an event. Returns `false` once the session is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        !self.cancel.is_cancelled() && self.events.send(event).is_ok()
    }

    /// Cancelled when the session is disconnected
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// One live connection for one user.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bootstrap the connection. Events may be emitted while this runs.
    async fn start(&self) -> Result<(), TransportError>;

    /// Send `content` to `address`, optionally with media.
    async fn send(
        &self,
        address: &str,
        content: &str,
        media: Option<&MediaRef>,
    ) -> Result<(), TransportError>;

    /// Tear the connection down.
    async fn destroy(&self) -> Result<(), TransportError>;
}

/// Constructs transports.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        user_id: UserId,
        credentials: CredentialStore,
        context: TransportContext,
    ) -> Result<Arc<dyn Transport>, TransportError>;
}
