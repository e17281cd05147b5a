// Gateway configuration model

use crate::env::EnvLoader;
use crate::loader::{ConfigLoader, FileFormat};
use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use switchboard_core::MAX_MEDIA_SIZE;

/// Webhook delivery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookSettings {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Characters of a response body kept in the delivery log
    pub response_snippet_limit: usize,
    /// Deliveries in flight at once; `0` means unbounded
    pub max_concurrent_deliveries: usize,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: format!("Switchboard-Webhooks/{}", env!("CARGO_PKG_VERSION")),
            response_snippet_limit: 1000,
            max_concurrent_deliveries: 64,
        }
    }
}

impl WebhookSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Transport session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSettings {
    pub credentials_dir: PathBuf,
    pub address_domain: String,
    pub delivery_status_delay_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            credentials_dir: PathBuf::from(".sessions"),
            address_domain: "c.us".to_string(),
            delivery_status_delay_ms: 1000,
        }
    }
}

impl SessionSettings {
    pub fn delivery_status_delay(&self) -> Duration {
        Duration::from_millis(self.delivery_status_delay_ms)
    }
}

/// Media upload settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaSettings {
    pub max_size_bytes: u64,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            max_size_bytes: MAX_MEDIA_SIZE,
        }
    }
}

/// Complete gateway configuration.
///
/// Sources are layered: defaults, then an optional file, then
/// `SWITCHBOARD_*` environment variables, then validation.
///
/// ```
/// use switchboard_config::{FileFormat, GatewayConfig};
///
/// let config = GatewayConfig::parse(
///     "[webhooks]\ntimeout_secs = 5\n",
///     FileFormat::Toml,
/// ).unwrap();
/// assert_eq!(config.webhooks.timeout_secs, 5);
/// assert_eq!(config.sessions.address_domain, "c.us");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub webhooks: WebhookSettings,
    pub sessions: SessionSettings,
    pub media: MediaSettings,
}

impl GatewayConfig {
    /// Defaults, then `path` when given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(&EnvLoader::default().load())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON, TOML or `.env` file on top of the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let loader = ConfigLoader::auto(path.as_ref())?;
        let value = loader.load_file(path.as_ref())?;
        Self::from_loaded(value, loader.format())
    }

    /// Parse configuration content of a known format.
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        let value = ConfigLoader::new(format).parse(content)?;
        Self::from_loaded(value, format)
    }

    fn from_loaded(value: Value, format: FileFormat) -> Result<Self> {
        match format {
            FileFormat::Json | FileFormat::Toml => serde_json::from_value(value)
                .map_err(|e| ConfigError::DeserializationError(e.to_string())),
            FileFormat::Env => {
                let Value::Object(map) = value else {
                    return Err(ConfigError::ParseError("expected key/value pairs".to_string()));
                };
                let pairs = map.into_iter().filter_map(|(key, value)| match value {
                    Value::String(value) => Some((key, value)),
                    _ => None,
                });

                let mut config = Self::default();
                config.apply_overrides(&EnvLoader::default().collect(pairs))?;
                Ok(config)
            }
        }
    }

    /// Apply normalized overrides such as `webhooks_timeout_secs`.
    ///
    /// Keys that name no setting are ignored.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Result<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "webhooks_timeout_secs" => self.webhooks.timeout_secs = parse_value(key, value)?,
                "webhooks_user_agent" => self.webhooks.user_agent = value.clone(),
                "webhooks_response_snippet_limit" => {
                    self.webhooks.response_snippet_limit = parse_value(key, value)?
                }
                "webhooks_max_concurrent_deliveries" => {
                    self.webhooks.max_concurrent_deliveries = parse_value(key, value)?
                }
                "sessions_credentials_dir" => {
                    self.sessions.credentials_dir = PathBuf::from(value)
                }
                "sessions_address_domain" => self.sessions.address_domain = value.clone(),
                "sessions_delivery_status_delay_ms" => {
                    self.sessions.delivery_status_delay_ms = parse_value(key, value)?
                }
                "media_max_size_bytes" => self.media.max_size_bytes = parse_value(key, value)?,
                _ => {}
            }
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::in_range(self.webhooks.timeout_secs, 1, 300, "webhooks.timeout_secs")?;
        ConfigValidator::not_empty(&self.webhooks.user_agent, "webhooks.user_agent")?;
        ConfigValidator::in_range(
            self.webhooks.response_snippet_limit,
            1,
            1_000_000,
            "webhooks.response_snippet_limit",
        )?;
        ConfigValidator::in_range(
            self.webhooks.max_concurrent_deliveries,
            0,
            10_000,
            "webhooks.max_concurrent_deliveries",
        )?;

        let credentials_dir = self.sessions.credentials_dir.to_string_lossy();
        ConfigValidator::not_empty(&credentials_dir, "sessions.credentials_dir")?;
        ConfigValidator::not_empty(&self.sessions.address_domain, "sessions.address_domain")?;
        ConfigValidator::in_range(
            self.sessions.delivery_status_delay_ms,
            0,
            3_600_000,
            "sessions.delivery_status_delay_ms",
        )?;

        ConfigValidator::in_range(
            self.media.max_size_bytes,
            1,
            MAX_MEDIA_SIZE,
            "media.max_size_bytes",
        )
    }
}
