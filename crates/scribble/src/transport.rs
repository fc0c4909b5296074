//! WebSocket transport using `tokio-tungstenite`.
//!
//! The listener hands out [`PendingConnection`]s so the WebSocket
//! handshake runs in the connection's own task, never in the accept loop.
//! An upgraded connection is split into a [`MessageSink`] and a
//! [`MessageStream`] so room events can be pushed while the reader waits.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The peer did not complete the WebSocket upgrade.
    #[error("handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    #[error("send failed: {0}")]
    Send(#[source] tungstenite::Error),

    #[error("receive failed: {0}")]
    Receive(#[source] tungstenite::Error),
}

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Listens for incoming TCP connections that will be upgraded to
/// WebSockets.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::Bind)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP connection. The upgrade is left to the
    /// caller.
    pub async fn accept(&self) -> Result<PendingConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted TCP connection");
        Ok(PendingConnection { id, stream, peer })
    }
}

/// A TCP connection that has not finished the WebSocket handshake yet.
pub struct PendingConnection {
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
}

impl PendingConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Runs the WebSocket handshake.
    pub async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let ws = tokio_tungstenite::accept_async(self.stream)
            .await
            .map_err(TransportError::Handshake)?;
        Ok(WebSocketConnection { id: self.id, ws })
    }
}

/// An open WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    ws: WsStream,
}

impl WebSocketConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Splits into independently owned write and read halves.
    pub fn split(self) -> (MessageSink, MessageStream) {
        let (sink, stream) = self.ws.split();
        (MessageSink { sink }, MessageStream { stream })
    }
}

/// The write half of a connection.
pub struct MessageSink {
    sink: SplitSink<WsStream, Message>,
}

impl MessageSink {
    /// Sends one message. UTF-8 payloads go out as text frames, anything
    /// else as binary.
    pub async fn send(&mut self, data: Vec<u8>) -> Result<(), TransportError> {
        let msg = match String::from_utf8(data) {
            Ok(text) => Message::Text(text.into()),
            Err(err) => Message::Binary(err.into_bytes().into()),
        };
        self.sink.send(msg).await.map_err(TransportError::Send)
    }

    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await.map_err(TransportError::Send)
    }
}

/// The read half of a connection.
pub struct MessageStream {
    stream: SplitStream<WsStream>,
}

impl MessageStream {
    /// Receives the next text or binary payload.
    ///
    /// Returns `Ok(None)` when the peer closes the connection.
    pub async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/frame
                Some(Err(err)) => return Err(TransportError::Receive(err)),
            }
        }
    }
}
