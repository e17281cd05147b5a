//! Error types for webhook operations

use switchboard_core::{SubscriptionId, ValidationError};
use thiserror::Error;

/// Errors that can occur during webhook operations
#[derive(Error, Debug)]
pub enum WebhookError {
    /// HTTP client could not be built or a request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Caller input rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Payload serialization failed
    #[error("Payload error: {0}")]
    PayloadError(String),

    /// Subscription not found
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    /// Subscription store failed
    #[error("Store error: {0}")]
    Store(String),

    /// A single delivery attempt failed
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// Timeout error
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::PayloadError(err.to_string())
    }
}
