//! Serial gateway configuration.
//!
//! Provides a TOML-based configuration with validation. All sections use
//! defaults so partial configs work out of the box, and the resulting value
//! is immutable once handed to the server.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gateway_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    GatewayConfig, LoggingConfig, SerialConfig, ServerConfig, SessionConfig,
    CONFIG_SCHEMA_VERSION, LAST_PORT,
};
pub use validation::validate;

use gateway_common::ConfigError;
use std::path::Path;

/// Load config from `path`, or from the platform default path when `None`.
///
/// An explicit path must exist; the default path is created with commented
/// defaults on first run.
/// The result is not range-checked; call [`validate`] once any overrides
/// have been applied.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    match path {
        Some(path) => toml_loader::load_from_path(path),
        None => toml_loader::load_default(),
    }
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &GatewayConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
