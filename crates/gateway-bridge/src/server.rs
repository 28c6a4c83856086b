//! TCP accept loop. Each connection gets its own task and session.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gateway_common::GatewayError;
use tokio::net::TcpListener;

use crate::connection::handle_connection;
use crate::session::GatewayContext;

pub struct Server {
    listener: TcpListener,
    ctx: Arc<GatewayContext>,
    handshake_timeout: Duration,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the listener. `addr` is anything `TcpListener::bind` accepts,
    /// e.g. `"localhost:8765"`.
    pub async fn bind(
        addr: &str,
        ctx: Arc<GatewayContext>,
        handshake_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            ctx,
            handshake_timeout,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, GatewayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of sessions currently running.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Accept connections forever. Accept errors are logged and skipped.
    pub async fn run(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let ctx = Arc::clone(&self.ctx);
                    let active = Arc::clone(&self.active);
                    let handshake_timeout = self.handshake_timeout;
                    tokio::spawn(async move {
                        handle_connection(stream, addr, ctx, handshake_timeout, active).await;
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            }
        }
    }
}
