//! Turns the path a client connected with into a serial target.
//!
//! Grammar: `"" | "list" | "<device>" | "@<baud>" | "<device>@<baud>"`.
//! Missing parts fall back to the configured defaults, and the device name
//! `last` is replaced by the final entry of a fresh port snapshot.

use std::fmt;

use gateway_common::ResolutionError;
use gateway_config::{GatewayConfig, LAST_PORT};
use percent_encoding::percent_decode_str;

use crate::registry::PortRegistry;

/// Path that asks for the port list instead of a session.
pub const LIST_COMMAND: &str = "list";

/// Device and baud rate applied when the client leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDefaults {
    pub device: String,
    pub baud_rate: u32,
}

impl SessionDefaults {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            device: config.serial.device.clone(),
            baud_rate: config.serial.baud_rate,
        }
    }
}

/// A concrete serial target. `device_path` is never `"last"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpec {
    pub device_path: String,
    pub baud_rate: u32,
}

impl fmt::Display for AddressSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.device_path, self.baud_rate)
    }
}

/// What a connection asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    List,
    Address(AddressSpec),
}

/// Resolve a request path against `defaults`.
///
/// The registry is only consulted when the device resolves to `last`.
pub fn resolve(
    path: &str,
    defaults: &SessionDefaults,
    registry: &dyn PortRegistry,
) -> Result<Resolved, ResolutionError> {
    if path == LIST_COMMAND {
        return Ok(Resolved::List);
    }

    let (device, baud) = path.rsplit_once('@').unwrap_or((path, ""));

    let device = if device.is_empty() {
        defaults.device.as_str()
    } else {
        device
    };
    let baud_rate = if baud.is_empty() {
        defaults.baud_rate
    } else {
        parse_baud(baud)?
    };

    let device_path = if device == LAST_PORT {
        registry
            .list_ports()
            .pop()
            .map(|port| port.device_path)
            .ok_or(ResolutionError::NoPortsAvailable)?
    } else {
        device.to_string()
    };

    Ok(Resolved::Address(AddressSpec {
        device_path,
        baud_rate,
    }))
}

fn parse_baud(raw: &str) -> Result<u32, ResolutionError> {
    match raw.parse::<u32>() {
        Ok(baud) if baud > 0 => Ok(baud),
        _ => Err(ResolutionError::InvalidBaudRate(raw.to_string())),
    }
}

/// Extract the resolver input from a WebSocket request URI path.
///
/// Drops exactly one leading `/` and percent-decodes the rest, so both
/// `//dev/ttyUSB0` and `/%2Fdev%2FttyUSB0` name `/dev/ttyUSB0`.
pub fn request_path(uri_path: &str) -> String {
    let trimmed = uri_path.strip_prefix('/').unwrap_or(uri_path);
    percent_decode_str(trimmed).decode_utf8_lossy().into_owned()
}
