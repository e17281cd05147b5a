//! HTTP client performing a single signed delivery

use crate::signature::headers;
use crate::{
    DeliveryAttempt, Result, WebhookConfig, WebhookPayload, WebhookSignature, WebhookSubscription,
};
use reqwest::{Client, Response};
use tracing::{debug, warn};

/// Client for sending webhook deliveries
#[derive(Debug, Clone)]
pub struct WebhookClient {
    config: WebhookConfig,
    http_client: Client,
}

impl WebhookClient {
    /// Create a new webhook client
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// POST `payload` to the subscription's URL.
    ///
    /// Never fails: transport errors and timeouts are folded into an attempt
    /// with `response_status == 0`.
    pub async fn deliver(
        &self,
        subscription: &WebhookSubscription,
        payload: &WebhookPayload,
    ) -> DeliveryAttempt {
        let limit = self.config.response_snippet_limit;

        let body = match payload.to_bytes() {
            Ok(body) => body,
            Err(e) => {
                return DeliveryAttempt::failed(
                    subscription.id,
                    payload.event,
                    String::new(),
                    &e.to_string(),
                    limit,
                );
            }
        };
        let body_text = String::from_utf8_lossy(&body).into_owned();

        let mut request = self
            .http_client
            .post(&subscription.url)
            .header("Content-Type", "application/json");

        if let Some(secret) = subscription.secret.as_deref() {
            let signature = WebhookSignature::new(secret).sign(&body);
            request = request.header(headers::SIGNATURE, signature);
        }

        match request.body(body).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let text = match read_snippet(response, limit).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(
                            subscription_id = subscription.id,
                            event = %payload.event,
                            status,
                            timeout = e.is_timeout(),
                            error = %e,
                            "Webhook response body error"
                        );
                        return DeliveryAttempt::failed(
                            subscription.id,
                            payload.event,
                            body_text,
                            &e.to_string(),
                            limit,
                        );
                    }
                };
                debug!(
                    subscription_id = subscription.id,
                    event = %payload.event,
                    status,
                    "Webhook delivered"
                );
                DeliveryAttempt::responded(
                    subscription.id,
                    payload.event,
                    body_text,
                    status,
                    &text,
                    limit,
                )
            }
            Err(e) => {
                warn!(
                    subscription_id = subscription.id,
                    event = %payload.event,
                    timeout = e.is_timeout(),
                    error = %e,
                    "Webhook delivery error"
                );
                DeliveryAttempt::failed(
                    subscription.id,
                    payload.event,
                    body_text,
                    &e.to_string(),
                    limit,
                )
            }
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }
}

/// Buffer the head of the response body, enough to fill `limit` characters.
///
/// The rest of the body is never read; dropping the response closes the
/// connection.
async fn read_snippet(mut response: Response, limit: usize) -> reqwest::Result<String> {
    // UTF-8 needs at most 4 bytes per char, plus 3 for a split trailing char.
    let max_bytes = limit.saturating_mul(4).saturating_add(3);
    let mut buf = Vec::new();

    while buf.len() < max_bytes {
        match response.chunk().await? {
            Some(chunk) => buf.extend_from_slice(&chunk),
            None => break,
        }
    }

    buf.truncate(max_bytes);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
