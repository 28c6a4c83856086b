//! Per-connection state machine.
//!
//! ```text
//! Resolving ──list──▶ ListServed ──▶ Closed
//!     │  └──error──────────────────▶ Closed
//!     ▼
//! Opening ◀──backoff── (open failed)
//!     │ ▲
//!     ▼ └──backoff──┐
//!  Active ──────────┘ serial fault
//!     │ client closed
//!     ▼
//! Closing ──▶ Closed
//! ```
//!
//! Each state's entry and exit in [`Session::run`] is the only place the
//! serial binding is acquired or released.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use gateway_common::{ForwardingError, SessionError, SessionId};
use gateway_config::GatewayConfig;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::binding::{SerialBinding, SerialOpener};
use crate::channel::{self, ClientSink, ClientStream};
use crate::forwarder;
use crate::registry::PortRegistry;
use crate::resolver::{self, AddressSpec, Resolved, SessionDefaults};

/// Immutable settings and capabilities shared by every session.
pub struct GatewayContext {
    pub defaults: SessionDefaults,
    pub retry_delay: Duration,
    pub read_buffer_size: usize,
    pub registry: Arc<dyn PortRegistry>,
    pub opener: Arc<dyn SerialOpener>,
}

impl GatewayContext {
    pub fn from_config(
        config: &GatewayConfig,
        registry: Arc<dyn PortRegistry>,
        opener: Arc<dyn SerialOpener>,
    ) -> Self {
        Self {
            defaults: SessionDefaults::from_config(config),
            retry_delay: Duration::from_millis(config.session.retry_delay_ms),
            read_buffer_size: config.serial.read_buffer_size,
            registry,
            opener,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Resolving,
    ListServed,
    Opening,
    Active,
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::ListServed => "list_served",
            Self::Opening => "opening",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One client connection, from path resolution to teardown.
pub struct Session<S, R> {
    id: SessionId,
    ctx: Arc<GatewayContext>,
    path: String,
    sink: S,
    stream: R,
    binding: Option<SerialBinding>,
    state: SessionState,
}

impl<S: ClientSink, R: ClientStream> Session<S, R> {
    pub fn new(ctx: Arc<GatewayContext>, path: impl Into<String>, sink: S, stream: R) -> Self {
        Self {
            id: SessionId::new(),
            ctx,
            path: path.into(),
            sink,
            stream,
            binding: None,
            state: SessionState::Resolving,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to `Closed`.
    ///
    /// Returns `Ok` when the session ended because the client left or a list
    /// was served, and the resolution error when the requested path was
    /// rejected.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let spec = match resolver::resolve(&self.path, &self.ctx.defaults, self.ctx.registry.as_ref()) {
            Ok(Resolved::List) => {
                self.serve_list().await;
                self.transition(SessionState::ListServed);
                self.transition(SessionState::Closed);
                return Ok(());
            }
            Ok(Resolved::Address(spec)) => spec,
            Err(e) => {
                tracing::warn!(session = %self.id, path = %self.path, error = %e, "Rejecting request");
                channel::close(&mut self.sink, &mut self.stream, CloseCode::Policy, &e.to_string()).await;
                self.transition(SessionState::Closed);
                return Err(e.into());
            }
        };

        let exit = self.bridge(&spec).await;

        self.transition(SessionState::Closing);
        self.release_binding();
        self.transition(SessionState::Closed);

        match exit {
            SessionError::ChannelClosed => Ok(()),
            other => Err(other),
        }
    }

    /// Alternate between `Opening` and `Active` until a terminal error.
    async fn bridge(&mut self, spec: &AddressSpec) -> SessionError {
        loop {
            self.transition(SessionState::Opening);

            match SerialBinding::open(self.ctx.opener.as_ref(), spec) {
                Ok(binding) => self.binding = Some(binding),
                Err(e) => {
                    tracing::warn!(
                        session = %self.id,
                        error = %e,
                        "Serial open failed, retrying in {:?}", self.ctx.retry_delay
                    );
                    if let Err(e) = self.backoff().await {
                        return e;
                    }
                    continue;
                }
            }

            self.transition(SessionState::Active);
            tracing::info!(session = %self.id, device = %spec, "Serial port open, forwarding");

            let exit = match self.binding.as_mut() {
                Some(binding) => {
                    forwarder::forward(
                        &self.id,
                        binding,
                        &mut self.sink,
                        &mut self.stream,
                        self.ctx.read_buffer_size,
                    )
                    .await
                }
                None => ForwardingError::NotBound.into(),
            };
            self.release_binding();

            if exit.is_terminal() {
                tracing::info!(session = %self.id, device = %spec, "Client left, forwarding stopped");
                return exit;
            }
            tracing::warn!(
                session = %self.id,
                device = %spec,
                error = %exit,
                "Serial fault, reopening in {:?}", self.ctx.retry_delay
            );
            if let Err(e) = self.backoff().await {
                return e;
            }
        }
    }

    /// Sleep for the retry delay, ending early if the client disconnects.
    ///
    /// Messages received meanwhile have nowhere to go and are dropped.
    async fn backoff(&mut self) -> Result<(), SessionError> {
        let sleep = tokio::time::sleep(self.ctx.retry_delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                incoming = channel::next_payload(&mut self.stream) => {
                    let payload = incoming?;
                    tracing::debug!(
                        session = %self.id,
                        bytes = payload.len(),
                        "No serial port bound, dropping client message"
                    );
                }
            }
        }
    }

    async fn serve_list(&mut self) {
        let ports = self.ctx.registry.list_ports();
        tracing::info!(session = %self.id, count = ports.len(), "Serving port list");

        for port in ports {
            if channel::send_text(&mut self.sink, port.device_path).await.is_err() {
                return;
            }
        }
        channel::close(&mut self.sink, &mut self.stream, CloseCode::Normal, "").await;
    }

    fn release_binding(&mut self) {
        if let Some(mut binding) = self.binding.take() {
            binding.close();
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(session = %self.id, from = %self.state, to = %next, "Session state change");
        self.state = next;
    }
}
