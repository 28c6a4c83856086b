//! In-memory serial devices, port lists and WebSocket clients for tests.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::StreamExt;
use gateway_common::OpenError;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::binding::{SerialIo, SerialOpener};
use crate::registry::{PortDescriptor, PortRegistry};
use crate::resolver::AddressSpec;

pub(crate) type ClientWs = WebSocketStream<DuplexStream>;

/// A fixed port snapshot that counts how often it is enumerated.
pub(crate) struct StaticPorts {
    ports: Vec<PortDescriptor>,
    calls: AtomicUsize,
}

impl StaticPorts {
    pub(crate) fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            ports: paths.into_iter().map(PortDescriptor::new).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PortRegistry for StaticPorts {
    fn list_ports(&self) -> Vec<PortDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ports.clone()
    }
}

/// Opens in-memory devices after failing a set number of times.
///
/// The device end of every successful open is handed to the test through the
/// receiver returned by [`MockOpener::new`].
pub(crate) struct MockOpener {
    failures: AtomicUsize,
    attempts: AtomicUsize,
    last_spec: Mutex<Option<AddressSpec>>,
    devices: mpsc::UnboundedSender<DuplexStream>,
}

impl MockOpener {
    pub(crate) fn new(failures: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<DuplexStream>) {
        let (devices, rx) = mpsc::unbounded_channel();
        let opener = Self {
            failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            last_spec: Mutex::new(None),
            devices,
        };
        (Arc::new(opener), rx)
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn last_spec(&self) -> Option<AddressSpec> {
        self.last_spec.lock().ok().and_then(|spec| spec.clone())
    }
}

impl SerialOpener for MockOpener {
    fn open(&self, spec: &AddressSpec) -> Result<Box<dyn SerialIo>, OpenError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_spec.lock() {
            *last = Some(spec.clone());
        }

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(OpenError::new(&spec.device_path, spec.baud_rate, "device busy"));
        }

        let (gateway_end, device_end) = tokio::io::duplex(1024);
        let _ = self.devices.send(device_end);
        Ok(Box::new(gateway_end))
    }
}

/// A device that never produces data and rejects every write.
pub(crate) struct BrokenPipeDevice;

impl AsyncRead for BrokenPipeDevice {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for BrokenPipeDevice {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Always opens a [`BrokenPipeDevice`].
#[derive(Default)]
pub(crate) struct BrokenPipeOpener {
    attempts: AtomicUsize,
}

impl BrokenPipeOpener {
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl SerialOpener for BrokenPipeOpener {
    fn open(&self, _spec: &AddressSpec) -> Result<Box<dyn SerialIo>, OpenError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(BrokenPipeDevice))
    }
}

/// A connected WebSocket pair over an in-memory pipe: `(client, server)`.
pub(crate) async fn ws_pair() -> (ClientWs, WebSocketStream<DuplexStream>) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    tokio::join!(
        WebSocketStream::from_raw_socket(client_io, Role::Client, None),
        WebSocketStream::from_raw_socket(server_io, Role::Server, None),
    )
}

/// Collect text messages until at least `len` bytes have arrived.
pub(crate) async fn read_text<S>(client: &mut WebSocketStream<S>, len: usize) -> String
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut out = String::new();
    while out.len() < len {
        let next = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for text");
        match next {
            Some(Ok(Message::Text(text))) => out.push_str(text.as_str()),
            other => panic!("expected text, got {other:?}"),
        }
    }
    out
}
