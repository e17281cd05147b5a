//! Event fan-out to matching subscriptions

use crate::{
    DeliveryLogger, Result, SubscriptionStore, WebhookClient, WebhookConfig, WebhookPayload,
    WebhookSubscription,
};
use std::sync::Arc;
use switchboard_core::{UserId, WebhookEvent};
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

/// Anything that accepts domain events for delivery
///
/// Implementations must return immediately; delivery happens elsewhere.
pub trait EventSink: Send + Sync {
    /// Hand `event` raised for `user_id` over for delivery
    fn trigger_event(&self, user_id: UserId, event: WebhookEvent);
}

struct DispatcherInner {
    client: WebhookClient,
    subscriptions: Arc<dyn SubscriptionStore>,
    logger: Arc<dyn DeliveryLogger>,
    tracker: TaskTracker,
    limiter: Option<Arc<Semaphore>>,
}

/// Delivers events to every active subscription that asked for them
///
/// Each delivery runs as its own task and writes exactly one
/// [`DeliveryAttempt`](crate::DeliveryAttempt). There is no retry.
#[derive(Clone)]
pub struct WebhookDispatcher {
    inner: Arc<DispatcherInner>,
}

impl WebhookDispatcher {
    /// Create a dispatcher reading subscriptions from `subscriptions` and
    /// recording attempts in `logger`
    pub fn new(
        config: WebhookConfig,
        subscriptions: Arc<dyn SubscriptionStore>,
        logger: Arc<dyn DeliveryLogger>,
    ) -> Result<Self> {
        let limiter = config
            .max_concurrent_deliveries
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        let client = WebhookClient::new(config)?;

        Ok(Self {
            inner: Arc::new(DispatcherInner {
                client,
                subscriptions,
                logger,
                tracker: TaskTracker::new(),
                limiter,
            }),
        })
    }

    /// Fan `event` out to the user's matching subscriptions.
    ///
    /// Returns immediately. Must be called from within a Tokio runtime.
    pub fn trigger_event(&self, user_id: UserId, event: WebhookEvent) {
        let dispatcher = self.clone();
        self.inner.tracker.spawn(async move {
            dispatcher.dispatch(user_id, event).await;
        });
    }

    /// Select matching subscriptions and spawn one delivery per match.
    ///
    /// Returns the number of deliveries spawned. A store failure is logged and
    /// yields zero.
    pub async fn dispatch(&self, user_id: UserId, event: WebhookEvent) -> usize {
        let kind = event.kind();

        let subscriptions = match self.inner.subscriptions.active_subscriptions(user_id).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                error!(user_id, event = %kind, error = %e, "Failed to load webhook subscriptions");
                return 0;
            }
        };

        let matching: Vec<WebhookSubscription> = subscriptions
            .into_iter()
            .filter(|s| s.active && s.is_subscribed_to(kind))
            .collect();

        debug!(
            user_id,
            event = %kind,
            matching = matching.len(),
            "Dispatching webhook event"
        );

        let count = matching.len();
        for subscription in matching {
            let payload = WebhookPayload::new(event.clone());
            let dispatcher = self.clone();
            self.inner.tracker.spawn(async move {
                dispatcher.deliver(subscription, payload).await;
            });
        }
        count
    }

    async fn deliver(&self, subscription: WebhookSubscription, payload: WebhookPayload) {
        let _permit = match &self.inner.limiter {
            Some(limiter) => limiter.clone().acquire_owned().await.ok(),
            None => None,
        };

        let attempt = self.inner.client.deliver(&subscription, &payload).await;
        let subscription_id = attempt.subscription_id;
        let status = attempt.response_status;
        let success = attempt.success;

        if let Err(e) = self.inner.logger.record(attempt).await {
            error!(
                subscription_id,
                event = %payload.event,
                error = %e,
                "Failed to record webhook delivery attempt"
            );
            return;
        }

        debug!(
            subscription_id,
            event = %payload.event,
            status,
            success,
            "Webhook delivery attempt recorded"
        );
    }

    /// Wait until every dispatched delivery has finished
    pub async fn drain(&self) {
        let tracker = &self.inner.tracker;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
    }

    /// Number of dispatch and delivery tasks still running
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }
}

impl EventSink for WebhookDispatcher {
    fn trigger_event(&self, user_id: UserId, event: WebhookEvent) {
        WebhookDispatcher::trigger_event(self, user_id, event);
    }
}

impl std::fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}
