//! Bridge transport over WebSocket.
//!
//! Talks to a local sidecar process that speaks the chat network's wire
//! protocol. Frames are JSON objects tagged by `type`:
//!
//! - client → bridge: `hello`, `send_text`, `logout`
//! - bridge → client: `qr`, `ready`, `credentials`, `disconnected`, `send_result`
//!
//! Sends are correlated with their results by `request_id`. When the socket
//! drops, every pending send fails and the session sees a lost connection.

#![cfg(feature = "bridge")]

use crate::error::ChannelError;
use crate::traits::{
    Credentials, DisconnectReason, EventSender, SendReceipt, Transport, TransportEvent,
};
use crate::Result;
use async_trait::async_trait;
use base64::Engine;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use url::Url;

/// Frames sent to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Open the session, resuming with base64 credentials when present.
    Hello {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        credentials: Option<String>,
    },
    /// Send a text message.
    SendText {
        request_id: String,
        to: String,
        body: String,
    },
    /// Revoke this device.
    Logout,
}

/// Frames received from the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Pairing code to show the operator.
    Qr { code: String },
    /// Session authenticated.
    Ready,
    /// Updated key material, base64-encoded.
    Credentials { data: String },
    /// Session closed by the network.
    Disconnected {
        #[serde(default)]
        reason: String,
        #[serde(default)]
        logged_out: bool,
    },
    /// Outcome of a `send_text`.
    SendResult {
        request_id: String,
        ok: bool,
        #[serde(default)]
        message_id: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
}

type PendingSends = HashMap<String, oneshot::Sender<Result<SendReceipt>>>;

#[derive(Default)]
struct Connection {
    outgoing: Option<mpsc::UnboundedSender<ClientFrame>>,
    tasks: Vec<JoinHandle<()>>,
}

/// WebSocket client for the chat-network bridge.
pub struct BridgeTransport {
    url: Url,
    connection: Mutex<Connection>,
    pending: Arc<Mutex<PendingSends>>,
    next_request: AtomicU64,
}

impl std::fmt::Debug for BridgeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeTransport")
            .field("url", &self.url.as_str())
            .field("connected", &self.connection.lock().outgoing.is_some())
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

impl BridgeTransport {
    /// Create a transport for a `ws://` or `wss://` bridge URL.
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| ChannelError::Config(format!("invalid bridge URL '{url}': {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ChannelError::Config(format!(
                "bridge URL must use ws:// or wss://, got '{}'",
                url
            )));
        }

        Ok(Self {
            url,
            connection: Mutex::new(Connection::default()),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_request: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn queue(&self, frame: ClientFrame) -> Result<()> {
        let connection = self.connection.lock();
        let outgoing = connection
            .outgoing
            .as_ref()
            .ok_or_else(|| ChannelError::transport("bridge not connected"))?;
        outgoing
            .send(frame)
            .map_err(|_| ChannelError::transport("bridge connection closed"))
    }

    fn teardown(&self) {
        let connection = std::mem::take(&mut *self.connection.lock());
        for task in connection.tasks {
            task.abort();
        }
        fail_pending(&self.pending, "bridge connection closed");
    }
}

fn fail_pending(pending: &Mutex<PendingSends>, reason: &str) {
    let drained: Vec<_> = pending.lock().drain().collect();
    if !drained.is_empty() {
        warn!(count = drained.len(), reason, "failing pending sends");
    }
    for (_, tx) in drained {
        let _ = tx.send(Err(ChannelError::transport(reason)));
    }
}

/// Removes a send from the pending map when its future completes or is dropped.
struct PendingGuard<'a> {
    pending: &'a Mutex<PendingSends>,
    request_id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(self.request_id);
    }
}

/// Translate one bridge frame. Returns `true` when the frame ended the session.
async fn handle_frame(
    frame: ServerFrame,
    events: &EventSender,
    pending: &Mutex<PendingSends>,
) -> bool {
    let event = match frame {
        ServerFrame::Qr { code } => TransportEvent::PairingCode(code),
        ServerFrame::Ready => TransportEvent::Connected,
        ServerFrame::Credentials { data } => {
            match base64::engine::general_purpose::STANDARD.decode(data.as_bytes()) {
                Ok(bytes) => TransportEvent::CredentialsUpdated(Credentials::new(bytes)),
                Err(e) => {
                    warn!(error = %e, "bridge sent undecodable credentials");
                    return false;
                }
            }
        }
        ServerFrame::Disconnected { reason, logged_out } => {
            let reason = if logged_out {
                DisconnectReason::LoggedOut
            } else {
                DisconnectReason::ConnectionLost(reason)
            };
            let _ = events.send(TransportEvent::Disconnected(reason)).await;
            return true;
        }
        ServerFrame::SendResult {
            request_id,
            ok,
            message_id,
            error,
        } => {
            let Some(tx) = pending.lock().remove(&request_id) else {
                debug!(%request_id, "send result for unknown request");
                return false;
            };
            let result = if ok {
                Ok(SendReceipt::new(message_id))
            } else {
                Err(ChannelError::Transport(
                    error.unwrap_or_else(|| "bridge rejected message".to_string()),
                ))
            };
            let _ = tx.send(result);
            return false;
        }
    };

    if events.send(event).await.is_err() {
        debug!("session stopped listening to bridge events");
    }
    false
}

#[async_trait]
impl Transport for BridgeTransport {
    fn name(&self) -> &str {
        "bridge"
    }

    async fn connect(&self, credentials: Option<Credentials>, events: EventSender) -> Result<()> {
        self.teardown();

        let (socket, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::transport(format!("bridge connect failed: {e}")))?;
        info!(url = %self.url, "connected to bridge");

        let (mut sink, mut stream) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientFrame>();

        out_tx
            .send(ClientFrame::Hello {
                credentials: credentials
                    .map(|c| base64::engine::general_purpose::STANDARD.encode(c.as_bytes())),
            })
            .map_err(|_| ChannelError::transport("bridge writer closed"))?;

        let writer = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode bridge frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    warn!(error = %e, "bridge write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let pending = Arc::clone(&self.pending);
        let reader = tokio::spawn(async move {
            let mut reported = false;
            while let Some(message) = stream.next().await {
                let text = match message {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "bridge read failed");
                        break;
                    }
                };

                match serde_json::from_str::<ServerFrame>(&text) {
                    Ok(frame) => {
                        if handle_frame(frame, &events, &pending).await {
                            reported = true;
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "ignoring malformed bridge frame"),
                }
            }

            fail_pending(&pending, "bridge connection closed");
            if !reported {
                let reason = DisconnectReason::ConnectionLost("bridge socket closed".to_string());
                let _ = events.send(TransportEvent::Disconnected(reason)).await;
            }
        });

        let mut connection = self.connection.lock();
        connection.outgoing = Some(out_tx);
        connection.tasks = vec![writer, reader];
        Ok(())
    }

    async fn send_text(&self, recipient: &str, body: &str) -> Result<SendReceipt> {
        let request_id = format!("req-{}", self.next_request.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id.clone(), tx);
        let _guard = PendingGuard {
            pending: self.pending.as_ref(),
            request_id: &request_id,
        };

        self.queue(ClientFrame::SendText {
            request_id: request_id.clone(),
            to: recipient.to_string(),
            body: body.to_string(),
        })?;

        rx.await
            .unwrap_or_else(|_| Err(ChannelError::transport("bridge connection closed")))
    }

    async fn logout(&self) -> Result<()> {
        self.queue(ClientFrame::Logout)
    }

    async fn close(&self) -> Result<()> {
        self.teardown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::EVENT_CHANNEL_CAPACITY;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[test]
    fn test_frame_wire_format() {
        let frame = ClientFrame::SendText {
            request_id: "req-1".into(),
            to: "962791234567@c.us".into(),
            body: "hi".into(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "send_text");
        assert_eq!(json["to"], "962791234567@c.us");

        let hello = serde_json::to_string(&ClientFrame::Hello { credentials: None }).unwrap();
        assert_eq!(hello, r#"{"type":"hello"}"#);

        let frame: ServerFrame =
            serde_json::from_str(r#"{"type":"disconnected","logged_out":true}"#).unwrap();
        assert!(matches!(frame, ServerFrame::Disconnected { logged_out: true, .. }));
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        assert!(matches!(
            BridgeTransport::new("http://127.0.0.1:3002"),
            Err(ChannelError::Config(_))
        ));
        assert!(BridgeTransport::new("ws://127.0.0.1:3002/session").is_ok());
    }

    #[tokio::test]
    async fn test_send_not_connected() {
        let transport = BridgeTransport::new("ws://127.0.0.1:1/session").unwrap();
        let err = transport.send_text("a@c.us", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Transport error: bridge not connected");
        assert!(transport.pending.lock().is_empty());
    }

    async fn read_frame<S>(ws: &mut S) -> ClientFrame
    where
        S: futures::Stream<Item = std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        loop {
            match ws.next().await.unwrap().unwrap() {
                WsMessage::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    fn server_text(frame: &ServerFrame) -> WsMessage {
        WsMessage::Text(serde_json::to_string(frame).unwrap())
    }

    #[tokio::test]
    async fn test_session_against_fake_bridge() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            let hello = read_frame(&mut ws).await;
            assert!(matches!(hello, ClientFrame::Hello { credentials: Some(_) }));
            ws.send(server_text(&ServerFrame::Ready)).await.unwrap();

            let ClientFrame::SendText { request_id, to, .. } = read_frame(&mut ws).await else {
                panic!("expected send_text");
            };
            assert_eq!(to, "962791234567@c.us");
            ws.send(server_text(&ServerFrame::SendResult {
                request_id,
                ok: true,
                message_id: Some("wamid-1".into()),
                error: None,
            }))
            .await
            .unwrap();

            // Next send is left unanswered; the socket drops instead.
            let _ = read_frame(&mut ws).await;
        });

        let transport = BridgeTransport::new(&format!("ws://{addr}/session")).unwrap();
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        transport
            .connect(Some(Credentials::new(b"stored".to_vec())), tx)
            .await
            .unwrap();
        assert!(matches!(rx.recv().await, Some(TransportEvent::Connected)));

        let receipt = transport.send_text("962791234567@c.us", "hello").await.unwrap();
        assert_eq!(receipt.message_id.as_deref(), Some("wamid-1"));

        let err = transport.send_text("962791234567@c.us", "again").await.unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
        assert!(matches!(
            rx.recv().await,
            Some(TransportEvent::Disconnected(DisconnectReason::ConnectionLost(_)))
        ));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_abandoned_send_leaves_nothing_pending() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            let _hello = read_frame(&mut ws).await;
            ws.send(server_text(&ServerFrame::Ready)).await.unwrap();

            // Never answer the send; hold the socket until the client goes away.
            let frame = read_frame(&mut ws).await;
            assert!(matches!(frame, ClientFrame::SendText { .. }));
            while let Some(Ok(_)) = ws.next().await {}
        });

        let transport = BridgeTransport::new(&format!("ws://{addr}/session")).unwrap();
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        transport.connect(None, tx).await.unwrap();
        assert!(matches!(rx.recv().await, Some(TransportEvent::Connected)));

        let timed_out = tokio::time::timeout(
            Duration::from_millis(200),
            transport.send_text("962791234567@c.us", "hello"),
        )
        .await;
        assert!(timed_out.is_err());
        assert!(transport.pending.lock().is_empty());

        transport.close().await.unwrap();
        server.await.unwrap();
    }
}
