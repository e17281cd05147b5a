//! Webhook subscriptions

use crate::Result;
use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use switchboard_core::{EventKind, SubscriptionId, UserId, ValidationError};
use url::Url;

/// Length of generated signing secrets
pub const SECRET_LEN: usize = 32;

/// A user's registration of an HTTP target for a set of events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSubscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub url: String,
    pub events: BTreeSet<EventKind>,
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookSubscription {
    /// Check if this subscription wants the given event
    pub fn is_subscribed_to(&self, event: EventKind) -> bool {
        self.events.contains(&event)
    }
}

/// Request to create a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub url: String,
    pub events: BTreeSet<EventKind>,
    pub secret: Option<String>,
}

impl NewSubscription {
    /// Create a request for `url` with the given events
    pub fn new(url: impl Into<String>, events: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            url: url.into(),
            events: events.into_iter().collect(),
            secret: None,
        }
    }

    /// Set the signing secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Validate the target URL and event set
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.url)?;
        validate_events(&self.events)?;
        Ok(())
    }
}

/// Partial update of a subscription
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub url: Option<String>,
    pub events: Option<BTreeSet<EventKind>>,
    pub active: Option<bool>,
}

impl SubscriptionUpdate {
    /// Validate the fields that are being changed
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.url {
            validate_url(url)?;
        }
        if let Some(events) = &self.events {
            validate_events(events)?;
        }
        Ok(())
    }

    /// Apply the update in place
    pub fn apply(self, subscription: &mut WebhookSubscription) {
        if let Some(url) = self.url {
            subscription.url = url;
        }
        if let Some(events) = self.events {
            subscription.events = events;
        }
        if let Some(active) = self.active {
            subscription.active = active;
        }
        subscription.updated_at = Utc::now();
    }
}

/// Target must be an absolute http(s) URL with a host
fn validate_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return Err(ValidationError::Url(raw.to_string()).into());
    }
    Ok(())
}

fn validate_events(events: &BTreeSet<EventKind>) -> Result<()> {
    if events.is_empty() {
        return Err(ValidationError::EmptyEventSet.into());
    }
    Ok(())
}

/// Generate a signing secret of [`SECRET_LEN`] alphanumeric characters
pub fn generate_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WebhookError;

    #[test]
    fn test_generate_secret() {
        let a = generate_secret();
        let b = generate_secret();

        assert_eq!(a.len(), SECRET_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_new_subscription() {
        let ok = NewSubscription::new("https://example.com/hook", [EventKind::MessageSent]);
        assert!(ok.validate().is_ok());

        let no_events = NewSubscription::new("https://example.com/hook", []);
        assert!(matches!(
            no_events.validate(),
            Err(WebhookError::Validation(ValidationError::EmptyEventSet))
        ));

        let relative = NewSubscription::new("/hook", [EventKind::MessageSent]);
        assert!(matches!(relative.validate(), Err(WebhookError::InvalidUrl(_))));

        let ftp = NewSubscription::new("ftp://example.com/hook", [EventKind::MessageSent]);
        assert!(matches!(
            ftp.validate(),
            Err(WebhookError::Validation(ValidationError::Url(_)))
        ));
    }

    #[test]
    fn test_update_validates_only_changed_fields() {
        let update = SubscriptionUpdate {
            active: Some(false),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let update = SubscriptionUpdate {
            events: Some(BTreeSet::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
