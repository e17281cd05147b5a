// Switchboard - a multi-tenant messaging gateway
//
// Each user owns one session with an external messaging network. Messages
// sent and received through it are persisted and announced to the user's
// webhook subscriptions as signed HTTP deliveries.

mod gateway;

pub use gateway::{Gateway, GatewayBuilder, GatewayError, session_config, webhook_config};

// Re-export the member crates
pub use switchboard_config as config;
pub use switchboard_core as domain;
pub use switchboard_session as session;
pub use switchboard_webhooks as webhooks;

#[cfg(feature = "log")]
pub use switchboard_log as log;

// Prelude for common imports
pub mod prelude {
    pub use crate::{Gateway, GatewayBuilder, GatewayError};
    pub use switchboard_config::GatewayConfig;
    pub use switchboard_core::{
        Direction, EventKind, MediaType, Message, MessageStatus, MessageType, UserId,
        WebhookEvent,
    };
    pub use switchboard_session::{
        Challenge, MessageStore, OutboundMessage, SessionError, SessionRegistry, SessionState,
        SessionStatus, Transport, TransportEvent, TransportFactory,
    };
    pub use switchboard_webhooks::{
        DeliveryAttempt, EventSink, NewSubscription, WebhookDispatcher, WebhookSignature,
    };
}
