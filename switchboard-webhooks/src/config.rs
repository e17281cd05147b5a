//! Configuration for webhook delivery

use std::time::Duration;

/// Default number of deliveries allowed in flight at once
pub const DEFAULT_MAX_CONCURRENT_DELIVERIES: usize = 64;

/// Default length of the stored response body
pub const DEFAULT_RESPONSE_SNIPPET_LIMIT: usize = 1000;

/// Configuration for the webhook client and dispatcher
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Timeout for a single delivery request
    pub timeout: Duration,

    /// User-Agent header for outgoing requests
    pub user_agent: String,

    /// Characters of the response body kept on the delivery attempt
    pub response_snippet_limit: usize,

    /// Upper bound on concurrent deliveries, `None` for unbounded
    pub max_concurrent_deliveries: Option<usize>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: format!("Switchboard-Webhooks/{}", env!("CARGO_PKG_VERSION")),
            response_snippet_limit: DEFAULT_RESPONSE_SNIPPET_LIMIT,
            max_concurrent_deliveries: Some(DEFAULT_MAX_CONCURRENT_DELIVERIES),
        }
    }
}

impl WebhookConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> WebhookConfigBuilder {
        WebhookConfigBuilder::new()
    }
}

/// Builder for WebhookConfig
#[derive(Debug, Clone, Default)]
pub struct WebhookConfigBuilder {
    config: WebhookConfig,
}

impl WebhookConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: WebhookConfig::default(),
        }
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout = Duration::from_secs(secs);
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set how much of the response body is kept
    pub fn response_snippet_limit(mut self, limit: usize) -> Self {
        self.config.response_snippet_limit = limit;
        self
    }

    /// Bound the number of concurrent deliveries
    pub fn max_concurrent_deliveries(mut self, limit: usize) -> Self {
        self.config.max_concurrent_deliveries = Some(limit);
        self
    }

    /// Remove the concurrency bound
    pub fn unbounded(mut self) -> Self {
        self.config.max_concurrent_deliveries = None;
        self
    }

    /// Build the configuration
    pub fn build(self) -> WebhookConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WebhookConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.response_snippet_limit, 1000);
        assert_eq!(config.max_concurrent_deliveries, Some(64));
        assert!(config.user_agent.starts_with("Switchboard-Webhooks/"));
    }

    #[test]
    fn test_builder() {
        let config = WebhookConfig::builder()
            .timeout_secs(3)
            .response_snippet_limit(20)
            .unbounded()
            .build();

        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.response_snippet_limit, 20);
        assert!(config.max_concurrent_deliveries.is_none());
    }
}
