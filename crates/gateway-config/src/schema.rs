//! Configuration schema types for the gateway.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults the gateway has always shipped
//! with: newest serial port at 115200 baud, served on `localhost:8765`.

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Device name that resolves to the last port the host enumerates.
pub const LAST_PORT: &str = "last";

// =============================================================================
// Serial Config
// =============================================================================

/// Defaults for the serial side of every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path used when the client does not name one, or `"last"`.
    pub device: String,
    /// Baud rate used when the client does not give one.
    pub baud_rate: u32,
    /// Largest chunk read from the device per outgoing message.
    pub read_buffer_size: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: LAST_PORT.into(),
            baud_rate: 115_200,
            read_buffer_size: 4096,
        }
    }
}

// =============================================================================
// Server Config
// =============================================================================

/// WebSocket listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds a client gets to finish the WebSocket upgrade.
    pub handshake_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8765,
            handshake_timeout: 10,
        }
    }
}

// =============================================================================
// Session Config
// =============================================================================

/// Per-session timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay between failed serial open attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 2000,
        }
    }
}

// =============================================================================
// Logging Config
// =============================================================================

/// Logging configuration. `RUST_LOG` takes precedence when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// =============================================================================
// Root
// =============================================================================

/// Root gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub serial: SerialConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// `host:port` the listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
