//! TOML config file loading and creation.

use crate::schema::GatewayConfig;
use gateway_common::ConfigError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Load config from a specific TOML file path.
///
/// Deserializes the file using serde defaults for any missing fields. Range
/// checks are left to the caller so command-line overrides can be applied
/// first.
pub fn load_from_path(path: &Path) -> Result<GatewayConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
    })?;

    let config: GatewayConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/serial-gateway/config.toml`
/// On Linux: `~/.config/serial-gateway/config.toml`
///
/// If the file does not exist, creates a default config file and returns defaults.
pub fn load_default() -> Result<GatewayConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!("no config found at {}, creating default", path.display());
        create_default_config(&path)?;
        return Ok(GatewayConfig::default());
    }

    load_from_path(&path)
}

/// Get the platform-specific default config file path.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::ParseError("could not determine config directory".into())
    })?;
    Ok(config_dir.join("serial-gateway").join("config.toml"))
}

/// Create a default TOML config file with documentation comments.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}

/// Generate the default TOML config content with comments.
fn default_config_toml() -> &'static str {
    r#"# Serial Gateway Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.
#
# Clients pick the device per connection through the URL path:
#   ws://host:port/                      default device and baud rate
#   ws://host:port/list                  list available ports
#   ws://host:port/@9600                 default device at 9600 baud
#   ws://host:port//dev/ttyUSB0@57600    explicit device and baud rate

[serial]
# device = "last"          # device path, or "last" for the newest port
# baud_rate = 115200
# read_buffer_size = 4096  # 64-65536

[server]
# host = "localhost"
# port = 8765
# handshake_timeout = 10   # seconds, 1-300

[session]
# retry_delay_ms = 2000    # 10-60000

[logging]
# level = "info"           # trace, debug, info, warn, error
"#
}
