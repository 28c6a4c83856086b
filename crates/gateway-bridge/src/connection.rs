//! Per-connection handler: upgrade, capture the request path, run a session.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

use crate::resolver::request_path;
use crate::session::{GatewayContext, Session};

/// Handle a single TCP connection until its session ends.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    ctx: Arc<GatewayContext>,
    handshake_timeout: Duration,
    active: Arc<AtomicUsize>,
) {
    // 1. WebSocket upgrade; the URI path selects the serial target.
    let mut path = String::new();
    let handshake = accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            path = request_path(request.uri().path());
            Ok(response)
        },
    );

    let ws = match tokio::time::timeout(handshake_timeout, handshake).await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
            return;
        }
        Err(_) => {
            tracing::warn!(peer = %addr, "WS handshake timeout ({:?})", handshake_timeout);
            return;
        }
    };

    // 2. One session per connection.
    let (sink, stream) = ws.split();
    let session = Session::new(ctx, path.clone(), sink, stream);
    let session_id = session.id().clone();

    let count = active.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::info!(
        peer = %addr,
        session = %session_id,
        path = %path,
        sessions = count,
        "Client connected"
    );

    // 3. Run to completion; failures stay inside this task.
    let result = session.run().await;

    let count = active.fetch_sub(1, Ordering::SeqCst) - 1;
    match result {
        Ok(()) => tracing::info!(
            peer = %addr,
            session = %session_id,
            sessions = count,
            "Client disconnected"
        ),
        Err(e) => tracing::warn!(
            peer = %addr,
            session = %session_id,
            sessions = count,
            error = %e,
            "Session ended with error"
        ),
    }
}
