//! Switchboard logging setup
//!
//! The gateway crates log through `tracing` macros with structured fields.
//! This crate installs the process-wide subscriber that renders them.
//!
//! # Usage
//!
//! ```rust
//! // Reads SWITCHBOARD_* variables; a second call is a no-op
//! switchboard_log::init();
//! tracing::info!(user_id = 7, "Session initializing");
//! ```
//!
//! # Environment Variables
//!
//! - `SWITCHBOARD_DEBUG=1` - Enable debug logging
//! - `SWITCHBOARD_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `SWITCHBOARD_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `SWITCHBOARD_LOG_COLOR=1|0` - Enable/disable colors
//! - `SWITCHBOARD_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `SWITCHBOARD_LOG_MODULE=1|0` - Include the event target
//!
//! `RUST_LOG`, when set, replaces the level filter entirely.

use std::env;
use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    Debug,
    Info,
    Warn,
    /// Error level (least verbose)
    Error,
    /// Off (no logging)
    Off,
}

impl Level {
    /// Get level from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Directive understood by [`EnvFilter`].
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the event target
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false, // JSON output doesn't use colors
            timestamps: true,
            module_path: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let debug = flag("SWITCHBOARD_DEBUG").unwrap_or(false);

        let level = lookup("SWITCHBOARD_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("SWITCHBOARD_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let color = flag("SWITCHBOARD_LOG_COLOR").unwrap_or_else(|| {
            format != Format::Json
                && lookup("NO_COLOR").is_none()
                && std::io::stderr().is_terminal()
        });

        Self {
            debug,
            level,
            format,
            color,
            timestamps: flag("SWITCHBOARD_LOG_TIMESTAMPS").unwrap_or(true),
            module_path: flag("SWITCHBOARD_LOG_MODULE").unwrap_or(true),
        }
    }

    /// Level filter used when `RUST_LOG` is absent.
    pub fn directive(&self) -> &'static str {
        if self.debug && self.level > Level::Debug {
            Level::Debug.as_directive()
        } else {
            self.level.as_directive()
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(self.module_path)
            .with_ansi(self.color);

        match (self.format, self.timestamps) {
            (Format::Json, true) => layer.json().boxed(),
            (Format::Json, false) => layer.json().without_time().boxed(),
            (Format::Compact, true) => layer.compact().boxed(),
            (Format::Compact, false) => layer.compact().without_time().boxed(),
            (Format::Pretty, true) => layer.pretty().boxed(),
            (Format::Pretty, false) => layer.pretty().without_time().boxed(),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Install the global subscriber configured from the environment.
///
/// Returns `false` when a subscriber was already installed.
pub fn init() -> bool {
    init_with(&LogConfig::from_env())
}

/// Install the global subscriber for `config`.
pub fn init_with(config: &LogConfig) -> bool {
    tracing_subscriber::registry()
        .with(config.layer())
        .with(config.filter())
        .try_init()
        .is_ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> LogConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("debug"), Some(Level::Debug));
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("invalid"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("pretty"), Some(Format::Pretty));
        assert_eq!(Format::parse("Compact"), Some(Format::Compact));
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(&[]);
        assert!(!config.debug);
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.format, Format::Json);
        assert!(!config.color);
        assert!(config.timestamps);
        assert_eq!(config.directive(), "info");
    }

    #[test]
    fn test_debug_flag_lowers_level() {
        let config = config_from(&[("SWITCHBOARD_DEBUG", "true")]);
        assert!(config.debug);
        assert_eq!(config.level, Level::Debug);

        // An explicit level wins, but debug still lifts the filter
        let config = config_from(&[("SWITCHBOARD_DEBUG", "1"), ("SWITCHBOARD_LOG_LEVEL", "warn")]);
        assert_eq!(config.level, Level::Warn);
        assert_eq!(config.directive(), "debug");

        let config = config_from(&[("SWITCHBOARD_LOG_LEVEL", "trace")]);
        assert_eq!(config.directive(), "trace");
    }

    #[test]
    fn test_config_overrides() {
        let config = config_from(&[
            ("SWITCHBOARD_LOG_FORMAT", "compact"),
            ("SWITCHBOARD_LOG_COLOR", "0"),
            ("SWITCHBOARD_LOG_TIMESTAMPS", "0"),
            ("SWITCHBOARD_LOG_MODULE", "false"),
            ("SWITCHBOARD_LOG_LEVEL", "bogus"),
        ]);
        assert_eq!(config.format, Format::Compact);
        assert!(!config.color);
        assert!(!config.timestamps);
        assert!(!config.module_path);
        assert_eq!(config.level, Level::Info);
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LogConfig {
            level: Level::Off,
            ..LogConfig::default()
        };
        init_with(&config);
        assert!(!init_with(&config));
    }
}
