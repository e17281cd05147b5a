//! Error types shared across the gateway crates

use thiserror::Error;

/// Malformed caller input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Phone number is empty, too long, or has no digits
    #[error("Invalid phone number: {0}")]
    PhoneNumber(String),

    /// Webhook target URL is not an absolute http(s) URL
    #[error("Invalid URL: {0}")]
    Url(String),

    /// Subscription must name at least one event
    #[error("Event set cannot be empty")]
    EmptyEventSet,

    /// Unknown event name
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// Message content is required but missing
    #[error("Message content cannot be empty")]
    EmptyContent,
}

/// Media rejected by the shared acceptance rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// MIME type is outside the allow-list
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Payload exceeds the maximum accepted size
    #[error("File too large: {size} bytes exceeds maximum of {max} bytes")]
    FileTooLarge {
        /// Actual size
        size: u64,
        /// Maximum size
        max: u64,
    },
}
