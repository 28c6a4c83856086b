//! gateway-bridge: WebSocket ↔ serial port bridge.
//!
//! Each WebSocket client gets its own session. The request path picks the
//! serial device and baud rate; bytes are then passed through untouched in
//! both directions until the client leaves. Serial failures never drop the
//! client: the port is closed and reopened until it comes back.

pub mod binding;
pub mod channel;
pub mod connection;
pub mod forwarder;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod session;
pub mod utf8;

#[cfg(test)]
pub(crate) mod testing;

pub use binding::{SerialBinding, SerialIo, SerialOpener, SystemSerial};
pub use registry::{PortDescriptor, PortKind, PortRegistry, SystemPorts};
pub use resolver::{resolve, AddressSpec, Resolved, SessionDefaults};
pub use server::Server;
pub use session::{GatewayContext, Session, SessionState};
