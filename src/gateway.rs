//! Wiring of the session registry to the webhook dispatcher.

use std::sync::Arc;
use switchboard_config::{ConfigError, GatewayConfig, SessionSettings, Validate, WebhookSettings};
use switchboard_session::{
    InMemoryMediaStorage, InMemoryMessageStore, MediaStorage, MessageStore, SessionConfig,
    SessionRegistry, TransportFactory,
};
use switchboard_webhooks::{
    DeliveryLogger, InMemoryWebhookStore, SubscriptionStore, WebhookConfig, WebhookDispatcher,
    WebhookError,
};
use thiserror::Error;
use tracing::info;

/// Errors raised while assembling a [`Gateway`]
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Webhook setup failed: {0}")]
    Webhook(#[from] WebhookError),

    #[error("No transport factory configured")]
    MissingTransport,
}

/// Translate webhook settings into the dispatcher's configuration.
///
/// A concurrency limit of `0` disables the bound.
pub fn webhook_config(settings: &WebhookSettings) -> WebhookConfig {
    let builder = WebhookConfig::builder()
        .timeout(settings.timeout())
        .user_agent(settings.user_agent.clone())
        .response_snippet_limit(settings.response_snippet_limit);

    match settings.max_concurrent_deliveries {
        0 => builder.unbounded().build(),
        limit => builder.max_concurrent_deliveries(limit).build(),
    }
}

/// Translate gateway settings into the registry's configuration.
pub fn session_config(config: &GatewayConfig) -> SessionConfig {
    let SessionSettings {
        credentials_dir,
        address_domain,
        ..
    } = &config.sessions;

    SessionConfig::default()
        .with_credentials_dir(credentials_dir)
        .with_address_domain(address_domain.clone())
        .with_delivery_status_delay(config.sessions.delivery_status_delay())
        .with_max_media_size(config.media.max_size_bytes)
}

/// Builder for a [`Gateway`].
///
/// Only the transport factory is required; stores default to the in-memory
/// implementations.
pub struct GatewayBuilder {
    config: GatewayConfig,
    factory: Option<Arc<dyn TransportFactory>>,
    messages: Option<Arc<dyn MessageStore>>,
    storage: Option<Arc<dyn MediaStorage>>,
    subscriptions: Option<Arc<dyn SubscriptionStore>>,
    logger: Option<Arc<dyn DeliveryLogger>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            factory: None,
            messages: None,
            storage: None,
            subscriptions: None,
            logger: None,
        }
    }

    /// Start from [`GatewayConfig::load`] without a file.
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self::new(GatewayConfig::load(None)?))
    }

    pub fn transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn message_store(mut self, messages: Arc<dyn MessageStore>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn media_storage(mut self, storage: Arc<dyn MediaStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn subscription_store(mut self, subscriptions: Arc<dyn SubscriptionStore>) -> Self {
        self.subscriptions = Some(subscriptions);
        self
    }

    pub fn delivery_logger(mut self, logger: Arc<dyn DeliveryLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Use one in-memory store for both subscriptions and the attempt log.
    pub fn webhook_store(self, store: Arc<InMemoryWebhookStore>) -> Self {
        self.subscription_store(store.clone()).delivery_logger(store)
    }

    pub fn build(self) -> Result<Gateway, GatewayError> {
        self.config.validate()?;
        let factory = self.factory.ok_or(GatewayError::MissingTransport)?;

        let (subscriptions, logger) = match (self.subscriptions, self.logger) {
            (Some(subscriptions), Some(logger)) => (subscriptions, logger),
            (subscriptions, logger) => {
                let store = Arc::new(InMemoryWebhookStore::new());
                (
                    subscriptions.unwrap_or_else(|| store.clone()),
                    logger.unwrap_or(store),
                )
            }
        };

        let dispatcher =
            WebhookDispatcher::new(webhook_config(&self.config.webhooks), subscriptions, logger)?;

        let sessions = SessionRegistry::new(
            session_config(&self.config),
            factory,
            self.messages
                .unwrap_or_else(|| Arc::new(InMemoryMessageStore::new())),
            self.storage
                .unwrap_or_else(|| Arc::new(InMemoryMediaStorage::default())),
            Arc::new(dispatcher.clone()),
        );

        info!(
            address_domain = %self.config.sessions.address_domain,
            max_concurrent_deliveries = self.config.webhooks.max_concurrent_deliveries,
            "Gateway assembled"
        );

        Ok(Gateway {
            config: self.config,
            sessions,
            dispatcher,
        })
    }
}

/// A session registry whose events feed a webhook dispatcher.
#[derive(Debug, Clone)]
pub struct Gateway {
    config: GatewayConfig,
    sessions: SessionRegistry,
    dispatcher: WebhookDispatcher,
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn dispatcher(&self) -> &WebhookDispatcher {
        &self.dispatcher
    }

    /// Wait for pending status timers and then for in-flight deliveries.
    pub async fn settle(&self) {
        self.sessions.drain().await;
        self.dispatcher.drain().await;
    }

    /// Disconnect every session and finish outstanding deliveries.
    pub async fn shutdown(&self) {
        self.sessions.shutdown().await;
        self.dispatcher.drain().await;
        info!("Gateway stopped");
    }
}
