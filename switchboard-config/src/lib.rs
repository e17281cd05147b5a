// Configuration management for the Switchboard gateway

pub mod env;
pub mod error;
pub mod gateway;
pub mod loader;
pub mod validation;

pub use env::{ENV_PREFIX, EnvLoader, load_dotenv};
pub use error::{ConfigError, Result};
pub use gateway::{GatewayConfig, MediaSettings, SessionSettings, WebhookSettings};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};
