use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// The path a client asked for cannot be turned into a serial target.
///
/// Terminal for the connection: the session is closed without retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("invalid baud rate: {0:?}")]
    InvalidBaudRate(String),

    #[error("no serial ports available to resolve \"last\"")]
    NoPortsAvailable,
}

/// A serial device could not be opened (missing, busy, permission denied).
///
/// Recoverable: the session waits and retries while the client stays connected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot open {device} at {baud_rate} baud: {reason}")]
pub struct OpenError {
    pub device: String,
    pub baud_rate: u32,
    pub reason: String,
}

impl OpenError {
    pub fn new(device: impl Into<String>, baud_rate: u32, reason: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            reason: reason.into(),
        }
    }
}

/// The serial side failed while forwarding.
#[derive(Debug, thiserror::Error)]
pub enum ForwardingError {
    #[error("serial read failed: {0}")]
    Read(std::io::Error),

    #[error("serial write failed: {0}")]
    Write(std::io::Error),

    #[error("serial device closed")]
    Eof,

    #[error("no serial device bound")]
    NotBound,
}

/// Every way a session phase can end, short of finishing normally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Forwarding(#[from] ForwardingError),

    #[error("client channel closed")]
    ChannelClosed,
}

impl SessionError {
    /// Whether the session must end instead of retrying the serial side.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolution(_) | Self::ChannelClosed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
