//! Subscription storage and delivery logging

use crate::{
    DeliveryAttempt, NewSubscription, Result, SubscriptionUpdate, WebhookError,
    WebhookSubscription, generate_secret,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use switchboard_core::{SubscriptionId, UserId};
use tokio::sync::RwLock;

/// Default number of delivery attempts returned by [`InMemoryWebhookStore::attempts`]
pub const DEFAULT_ATTEMPT_LIMIT: usize = 50;

/// Largest page of delivery attempts
pub const MAX_ATTEMPT_LIMIT: usize = 200;

/// Read side of subscription persistence used by the dispatcher
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Active subscriptions owned by `user_id`
    async fn active_subscriptions(&self, user_id: UserId) -> Result<Vec<WebhookSubscription>>;
}

/// Sink for delivery attempts
#[async_trait]
pub trait DeliveryLogger: Send + Sync {
    /// Persist one attempt
    async fn record(&self, attempt: DeliveryAttempt) -> Result<()>;
}

#[derive(Debug, Default)]
struct StoreInner {
    subscriptions: HashMap<SubscriptionId, WebhookSubscription>,
    attempts: Vec<DeliveryAttempt>,
}

/// In-process subscription store and delivery log
#[derive(Debug)]
pub struct InMemoryWebhookStore {
    inner: RwLock<StoreInner>,
    next_id: AtomicI64,
}

impl Default for InMemoryWebhookStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWebhookStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Create a subscription, generating a secret when none is given
    pub async fn create(
        &self,
        user_id: UserId,
        request: NewSubscription,
    ) -> Result<WebhookSubscription> {
        request.validate()?;

        let now = Utc::now();
        let subscription = WebhookSubscription {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            user_id,
            url: request.url,
            events: request.events,
            secret: Some(request.secret.unwrap_or_else(generate_secret)),
            active: true,
            created_at: now,
            updated_at: now,
        };

        self.inner
            .write()
            .await
            .subscriptions
            .insert(subscription.id, subscription.clone());

        tracing::debug!(
            user_id,
            subscription_id = subscription.id,
            url = %subscription.url,
            "Webhook subscription created"
        );
        Ok(subscription)
    }

    /// Update a subscription owned by `user_id`
    pub async fn update(
        &self,
        user_id: UserId,
        id: SubscriptionId,
        update: SubscriptionUpdate,
    ) -> Result<WebhookSubscription> {
        update.validate()?;

        let mut inner = self.inner.write().await;
        let subscription = inner
            .subscriptions
            .get_mut(&id)
            .filter(|s| s.user_id == user_id)
            .ok_or(WebhookError::SubscriptionNotFound(id))?;
        update.apply(subscription);
        Ok(subscription.clone())
    }

    /// Delete a subscription owned by `user_id`
    pub async fn delete(&self, user_id: UserId, id: SubscriptionId) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.subscriptions.get(&id) {
            Some(s) if s.user_id == user_id => {
                inner.subscriptions.remove(&id);
                Ok(())
            }
            _ => Err(WebhookError::SubscriptionNotFound(id)),
        }
    }

    /// Get a subscription owned by `user_id`
    pub async fn get(&self, user_id: UserId, id: SubscriptionId) -> Result<WebhookSubscription> {
        self.inner
            .read()
            .await
            .subscriptions
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .cloned()
            .ok_or(WebhookError::SubscriptionNotFound(id))
    }

    /// All subscriptions owned by `user_id`, oldest first
    pub async fn list(&self, user_id: UserId) -> Vec<WebhookSubscription> {
        let inner = self.inner.read().await;
        let mut subscriptions: Vec<_> = inner
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subscriptions.sort_by_key(|s| s.id);
        subscriptions
    }

    /// Delivery attempts of one subscription, most recent first
    ///
    /// `limit` defaults to [`DEFAULT_ATTEMPT_LIMIT`] and is clamped to
    /// `1..=MAX_ATTEMPT_LIMIT`.
    pub async fn attempts(
        &self,
        user_id: UserId,
        id: SubscriptionId,
        limit: Option<usize>,
    ) -> Result<Vec<DeliveryAttempt>> {
        let limit = limit
            .unwrap_or(DEFAULT_ATTEMPT_LIMIT)
            .clamp(1, MAX_ATTEMPT_LIMIT);

        let inner = self.inner.read().await;
        if !inner
            .subscriptions
            .get(&id)
            .is_some_and(|s| s.user_id == user_id)
        {
            return Err(WebhookError::SubscriptionNotFound(id));
        }

        Ok(inner
            .attempts
            .iter()
            .rev()
            .filter(|a| a.subscription_id == id)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Every recorded attempt in insertion order
    pub async fn all_attempts(&self) -> Vec<DeliveryAttempt> {
        self.inner.read().await.attempts.clone()
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryWebhookStore {
    async fn active_subscriptions(&self, user_id: UserId) -> Result<Vec<WebhookSubscription>> {
        Ok(self
            .list(user_id)
            .await
            .into_iter()
            .filter(|s| s.active)
            .collect())
    }
}

#[async_trait]
impl DeliveryLogger for InMemoryWebhookStore {
    async fn record(&self, attempt: DeliveryAttempt) -> Result<()> {
        self.inner.write().await.attempts.push(attempt);
        Ok(())
    }
}
