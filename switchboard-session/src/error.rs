//! Error types for session operations.

use crate::transport::TransportError;
use switchboard_core::{MediaError, UserId, ValidationError};
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session exists for the user
    #[error("Session not initialized for user {0}")]
    NotInitialized(UserId),

    /// Session exists but is not connected
    #[error("Session not ready for user {0}")]
    NotReady(UserId),

    /// Transport construction, bootstrap or send failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Media rejected by the acceptance rule
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Malformed caller input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Message persistence failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Object storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Challenge could not be rendered
    #[error("Challenge rendering failed: {0}")]
    Challenge(String),
}

impl SessionError {
    /// HTTP status code an outer surface should map this error to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotInitialized(_) => 404,
            Self::NotReady(_) => 409,
            Self::Media(MediaError::FileTooLarge { .. }) => 413,
            Self::Media(MediaError::UnsupportedMediaType(_)) => 415,
            Self::Transport(_) => 502,
            _ => 500,
        }
    }

    /// Check if repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::NotReady(_)
                | SessionError::Transport(_)
                | SessionError::Persistence(_)
                | SessionError::Storage(_)
        )
    }
}
