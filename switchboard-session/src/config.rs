//! Session configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;
use switchboard_core::MAX_MEDIA_SIZE;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory holding per-user transport credentials
    pub credentials_dir: PathBuf,
    /// Domain suffix of transport addresses
    pub address_domain: String,
    /// Delay before an outbound message is marked delivered
    pub delivery_status_delay: Duration,
    /// Largest accepted media payload in bytes
    pub max_media_size: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials_dir: PathBuf::from(".sessions"),
            address_domain: "c.us".to_string(),
            delivery_status_delay: Duration::from_millis(1000),
            max_media_size: MAX_MEDIA_SIZE,
        }
    }
}

impl SessionConfig {
    /// Set the credentials directory.
    pub fn with_credentials_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.credentials_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the address domain.
    ///
    /// # Examples
    ///
    /// ```
    /// use switchboard_session::SessionConfig;
    ///
    /// let config = SessionConfig::default().with_address_domain("s.whatsapp.net");
    /// assert_eq!(config.address_domain, "s.whatsapp.net");
    /// ```
    pub fn with_address_domain(mut self, domain: impl Into<String>) -> Self {
        self.address_domain = domain.into();
        self
    }

    /// Set the delivered-status delay.
    pub fn with_delivery_status_delay(mut self, delay: Duration) -> Self {
        self.delivery_status_delay = delay;
        self
    }

    /// Set the maximum media size.
    pub fn with_max_media_size(mut self, bytes: u64) -> Self {
        self.max_media_size = bytes;
        self
    }
}
