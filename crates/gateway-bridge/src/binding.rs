//! Ownership of one open serial device.

use std::fmt;

use gateway_common::OpenError;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};

use crate::resolver::AddressSpec;

/// Byte stream to a serial device.
pub trait SerialIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialIo for T {}

/// Opens serial devices.
///
/// Opening must fail when the device is missing, inaccessible, or already
/// held by another session.
pub trait SerialOpener: Send + Sync {
    fn open(&self, spec: &AddressSpec) -> Result<Box<dyn SerialIo>, OpenError>;
}

/// Opens real devices through `tokio-serial`, 8N1 without flow control.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerial;

impl SerialOpener for SystemSerial {
    fn open(&self, spec: &AddressSpec) -> Result<Box<dyn SerialIo>, OpenError> {
        let stream = tokio_serial::new(&spec.device_path, spec.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| OpenError::new(&spec.device_path, spec.baud_rate, e.to_string()))?;
        Ok(Box::new(stream))
    }
}

/// An open serial device owned by exactly one session.
///
/// The handle is released by [`SerialBinding::close`] or on drop, whichever
/// comes first.
pub struct SerialBinding {
    spec: AddressSpec,
    handle: Option<Box<dyn SerialIo>>,
}

impl SerialBinding {
    pub fn open(opener: &dyn SerialOpener, spec: &AddressSpec) -> Result<Self, OpenError> {
        let handle = opener.open(spec)?;
        Ok(Self {
            spec: spec.clone(),
            handle: Some(handle),
        })
    }

    pub fn spec(&self) -> &AddressSpec {
        &self.spec
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn io_mut(&mut self) -> Option<&mut (dyn SerialIo + 'static)> {
        self.handle.as_deref_mut()
    }

    /// Release the device. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            tracing::debug!(device = %self.spec.device_path, "Serial port closed");
        }
    }
}

impl Drop for SerialBinding {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SerialBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialBinding")
            .field("device_path", &self.spec.device_path)
            .field("baud_rate", &self.spec.baud_rate)
            .field("open", &self.is_open())
            .finish()
    }
}
