//! The client side of a session: a WebSocket split into sink and stream.

use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use gateway_common::SessionError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// How long to wait for the client to acknowledge a close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Longest close reason a control frame can carry.
const MAX_CLOSE_REASON: usize = 123;

/// Outgoing half of a client connection.
pub trait ClientSink: Sink<Message, Error = WsError> + Unpin + Send {}

impl<T> ClientSink for T where T: Sink<Message, Error = WsError> + Unpin + Send {}

/// Incoming half of a client connection.
pub trait ClientStream: Stream<Item = Result<Message, WsError>> + Unpin + Send {}

impl<T> ClientStream for T where T: Stream<Item = Result<Message, WsError>> + Unpin + Send {}

/// Wait for the next data message and return its bytes.
///
/// Text is returned as its UTF-8 encoding and binary verbatim; control frames
/// are skipped. A close frame, end of stream or transport error all mean the
/// client is gone.
pub(crate) async fn next_payload<R: ClientStream>(stream: &mut R) -> Result<Vec<u8>, SessionError> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text.as_str().as_bytes().to_vec()),
            Some(Ok(Message::Binary(data))) => return Ok(data.to_vec()),
            Some(Ok(Message::Close(_))) | None => return Err(SessionError::ChannelClosed),
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!(error = %e, "WS error");
                return Err(SessionError::ChannelClosed);
            }
        }
    }
}

/// Send one text message.
pub(crate) async fn send_text<S: ClientSink>(sink: &mut S, text: String) -> Result<(), SessionError> {
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|_| SessionError::ChannelClosed)
}

/// Close the connection with `code`, then wait briefly for the client's reply.
pub(crate) async fn close<S: ClientSink, R: ClientStream>(
    sink: &mut S,
    stream: &mut R,
    code: CloseCode,
    reason: &str,
) {
    let frame = CloseFrame {
        code,
        reason: truncate_reason(reason).to_string().into(),
    };
    if sink.send(Message::Close(Some(frame))).await.is_err() {
        return;
    }
    let drain = async { while let Some(Ok(_)) = stream.next().await {} };
    let _ = tokio::time::timeout(CLOSE_TIMEOUT, drain).await;
}

fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}
