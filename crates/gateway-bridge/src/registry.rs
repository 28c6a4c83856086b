//! Serial port enumeration.

use std::fmt;

use tokio_serial::SerialPortType;

/// Rough classification of a port, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Usb,
    Bluetooth,
    Pci,
    Unknown,
}

impl From<&SerialPortType> for PortKind {
    fn from(port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(_) => Self::Usb,
            SerialPortType::BluetoothPort => Self::Bluetooth,
            SerialPortType::PciPort => Self::Pci,
            SerialPortType::Unknown => Self::Unknown,
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Usb => "usb",
            Self::Bluetooth => "bluetooth",
            Self::Pci => "pci",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One entry of a port snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub device_path: String,
    pub kind: PortKind,
}

impl PortDescriptor {
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
            kind: PortKind::Unknown,
        }
    }
}

/// Source of serial port snapshots.
///
/// Every call re-enumerates; an empty list means no devices are present and
/// is not an error.
pub trait PortRegistry: Send + Sync {
    fn list_ports(&self) -> Vec<PortDescriptor>;
}

/// Enumerates the ports the host operating system reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortRegistry for SystemPorts {
    fn list_ports(&self) -> Vec<PortDescriptor> {
        match tokio_serial::available_ports() {
            Ok(ports) => ports
                .into_iter()
                .map(|info| PortDescriptor {
                    kind: PortKind::from(&info.port_type),
                    device_path: info.port_name,
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Serial port enumeration failed");
                Vec::new()
            }
        }
    }
}
