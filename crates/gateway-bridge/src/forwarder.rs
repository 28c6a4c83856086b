//! Bidirectional forwarding between a serial binding and a client.
//!
//! Two flows run concurrently in the session task, each owning one direction:
//! serial reads become text messages, client messages become serial writes.
//! Whichever flow stops first decides the outcome and the other one is
//! dropped on the spot.

use gateway_common::{ForwardingError, SessionError, SessionId};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::binding::SerialBinding;
use crate::channel::{self, ClientSink, ClientStream};
use crate::utf8::Utf8Decoder;

/// Forward until one side fails.
///
/// Always ends in an error: [`SessionError::ChannelClosed`] when the client
/// went away, [`SessionError::Forwarding`] when the serial side did. The
/// binding is left open; closing it is the caller's job.
pub async fn forward<S, R>(
    session: &SessionId,
    binding: &mut SerialBinding,
    sink: &mut S,
    stream: &mut R,
    read_buffer_size: usize,
) -> SessionError
where
    S: ClientSink,
    R: ClientStream,
{
    let device = binding.spec().device_path.clone();
    let Some(io) = binding.io_mut() else {
        return ForwardingError::NotBound.into();
    };
    let (reader, writer) = tokio::io::split(io);

    tokio::select! {
        exit = serial_to_client(session, &device, reader, sink, read_buffer_size) => exit,
        exit = client_to_serial(session, &device, stream, writer) => exit,
    }
}

async fn serial_to_client<S, Rd>(
    session: &SessionId,
    device: &str,
    mut reader: Rd,
    sink: &mut S,
    read_buffer_size: usize,
) -> SessionError
where
    S: ClientSink,
    Rd: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; read_buffer_size];
    let mut decoder = Utf8Decoder::default();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return ForwardingError::Eof.into(),
            Ok(n) => n,
            Err(e) => return ForwardingError::Read(e).into(),
        };

        let text = decoder.decode(&buf[..n]);
        if text.is_empty() {
            continue;
        }
        tracing::trace!(session = %session, device, bytes = n, data = ?text, "serial -> client");

        if let Err(e) = channel::send_text(sink, text).await {
            return e;
        }
    }
}

async fn client_to_serial<R, W>(
    session: &SessionId,
    device: &str,
    stream: &mut R,
    mut writer: W,
) -> SessionError
where
    R: ClientStream,
    W: AsyncWrite + Unpin,
{
    loop {
        let payload = match channel::next_payload(stream).await {
            Ok(payload) => payload,
            Err(e) => return e,
        };
        tracing::trace!(session = %session, device, bytes = payload.len(), "client -> serial");

        let written = async {
            writer.write_all(&payload).await?;
            writer.flush().await
        };
        if let Err(e) = written.await {
            return ForwardingError::Write(e).into();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_tungstenite::tungstenite::Message;

    use super::*;
    use crate::resolver::AddressSpec;
    use crate::testing::{read_text, ws_pair, MockOpener};

    fn spec() -> AddressSpec {
        AddressSpec {
            device_path: "/dev/ttyMock".into(),
            baud_rate: 9600,
        }
    }

    #[tokio::test]
    async fn serial_bytes_reach_client_in_order() {
        let (opener, mut devices) = MockOpener::new(0);
        let mut binding = SerialBinding::open(opener.as_ref(), &spec()).unwrap();
        let mut device = devices.recv().await.unwrap();
        let (mut client, server) = ws_pair().await;

        let task = tokio::spawn(async move {
            let (mut sink, mut stream) = server.split();
            forward(&SessionId::new(), &mut binding, &mut sink, &mut stream, 64).await
        });

        let parts: [&[u8]; 4] = [b"temp=21.5\r\n", b"hum", b"=40 caf\xc3", b"\xa9\r\n"];
        for part in parts {
            device.write_all(part).await.unwrap();
        }

        let expected = "temp=21.5\r\nhum=40 café\r\n";
        assert_eq!(read_text(&mut client, expected.len()).await, expected);

        client.close(None).await.unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert!(matches!(exit, SessionError::ChannelClosed));
    }

    #[tokio::test]
    async fn client_messages_reach_serial_in_order() {
        let (opener, mut devices) = MockOpener::new(0);
        let mut binding = SerialBinding::open(opener.as_ref(), &spec()).unwrap();
        let mut device = devices.recv().await.unwrap();
        let (mut client, server) = ws_pair().await;

        tokio::spawn(async move {
            let (mut sink, mut stream) = server.split();
            forward(&SessionId::new(), &mut binding, &mut sink, &mut stream, 64).await
        });

        client.send(Message::Text("LED ON\n".into())).await.unwrap();
        client.send(Message::Text("héllo".into())).await.unwrap();
        client.send(Message::Binary(vec![0x00, 0xff].into())).await.unwrap();

        let mut expected = b"LED ON\n".to_vec();
        expected.extend_from_slice("héllo".as_bytes());
        expected.extend_from_slice(&[0x00, 0xff]);

        let mut received = vec![0u8; expected.len()];
        tokio::time::timeout(Duration::from_secs(2), device.read_exact(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn serial_eof_is_forwarding_error() {
        let (opener, mut devices) = MockOpener::new(0);
        let mut binding = SerialBinding::open(opener.as_ref(), &spec()).unwrap();
        let device = devices.recv().await.unwrap();
        let (_client, server) = ws_pair().await;

        drop(device);
        let (mut sink, mut stream) = server.split();
        let exit = forward(&SessionId::new(), &mut binding, &mut sink, &mut stream, 64).await;
        assert!(matches!(exit, SessionError::Forwarding(ForwardingError::Eof)));
        // The caller still owns the binding.
        assert!(binding.is_open());
    }

    #[tokio::test]
    async fn client_close_stops_serial_flow() {
        let (opener, mut devices) = MockOpener::new(0);
        let mut binding = SerialBinding::open(opener.as_ref(), &spec()).unwrap();
        let _device = devices.recv().await.unwrap();
        let (client, server) = ws_pair().await;

        drop(client);
        let (mut sink, mut stream) = server.split();
        let exit = tokio::time::timeout(
            Duration::from_secs(2),
            forward(&SessionId::new(), &mut binding, &mut sink, &mut stream, 64),
        )
        .await
        .unwrap();
        assert!(matches!(exit, SessionError::ChannelClosed));
    }

    #[tokio::test]
    async fn closed_binding_is_not_forwarded() {
        let (opener, _devices) = MockOpener::new(0);
        let mut binding = SerialBinding::open(opener.as_ref(), &spec()).unwrap();
        binding.close();
        let (_client, server) = ws_pair().await;

        let (mut sink, mut stream) = server.split();
        let exit = forward(&SessionId::new(), &mut binding, &mut sink, &mut stream, 64).await;
        assert!(matches!(exit, SessionError::Forwarding(ForwardingError::NotBound)));
    }
}
