// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Prefix of every environment variable the gateway reads
pub const ENV_PREFIX: &str = "SWITCHBOARD";

/// Environment variable loader
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all environment variables under the prefix
    pub fn load(&self) -> HashMap<String, String> {
        self.collect(env::vars())
    }

    /// Filter `vars` by the prefix and normalize keys to lower case without it.
    ///
    /// `SWITCHBOARD_WEBHOOKS_TIMEOUT_SECS` becomes `webhooks_timeout_secs`.
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            let key = match self.prefix.as_deref() {
                Some(prefix) => match key
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('_'))
                {
                    Some(rest) => rest.to_string(),
                    None => continue,
                },
                None => key,
            };
            config.insert(key.to_lowercase(), value);
        }

        config
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = if let Some(ref prefix) = self.prefix {
            format!("{}_{}", prefix, key.to_uppercase())
        } else {
            key.to_uppercase()
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(Some(ENV_PREFIX.to_string()))
    }
}

/// Load a `.env` file into the process environment.
///
/// Without a path a missing `./.env` is ignored.
pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
    } else {
        dotenvy::dotenv().ok();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_collect_strips_prefix() {
        let loader = EnvLoader::default();
        let config = loader.collect(vars(&[
            ("SWITCHBOARD_WEBHOOKS_TIMEOUT_SECS", "30"),
            ("SWITCHBOARD_SESSIONS_ADDRESS_DOMAIN", "s.whatsapp.net"),
            ("SWITCHBOARDX_IGNORED", "1"),
            ("PATH", "/usr/bin"),
        ]));

        assert_eq!(config.len(), 2);
        assert_eq!(config["webhooks_timeout_secs"], "30");
        assert_eq!(config["sessions_address_domain"], "s.whatsapp.net");
    }

    #[test]
    fn test_collect_without_prefix() {
        let loader = EnvLoader::new(None);
        let config = loader.collect(vars(&[("HOME", "/root")]));
        assert_eq!(config["home"], "/root");
    }

    #[test]
    fn test_env_loader_with_default() {
        let loader = EnvLoader::new(None);
        let value = loader.load_var_or("NONEXISTENT_VAR_12345", "default");

        assert_eq!(value, "default");
    }

    #[test]
    fn test_env_loader_missing_var() {
        let loader = EnvLoader::default();
        let result = loader.load_var("MISSING_VAR_67890");

        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    }

    #[test]
    fn test_missing_dotenv_file() {
        let result = load_dotenv(Some(Path::new("/nonexistent/switchboard/.env")));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
