//! `ScribbleServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → room registry.

use std::collections::HashMap;
use std::sync::Arc;

use scribble_protocol::{Codec, JsonCodec, PlayerId};
use scribble_room::{AlphanumericIds, Collaborators, PlayerSender, RoomConfig, RoomRegistry};
use tokio::sync::Mutex;

use crate::gateway::handle_connection;
use crate::{ScribbleError, WebSocketTransport};

/// Default listen address for the binary.
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomRegistry>,
    /// Every open connection, in a room or not. Its size is the online
    /// player count.
    pub(crate) online: Mutex<HashMap<PlayerId, PlayerSender>>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Scribble server.
///
/// ```rust,no_run
/// # async fn start() -> Result<(), scribble::ScribbleError> {
/// let server = scribble::ScribbleServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ScribbleServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    collaborators: Collaborators,
}

impl ScribbleServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            room_config: RoomConfig::default(),
            collaborators: Collaborators::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Pacing and gameplay constants shared by every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Word source and hint picker handed to every room.
    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Binds the listener. Clients speak JSON.
    pub async fn build(self) -> Result<ScribbleServer, ScribbleError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let registry = RoomRegistry::with_collaborators(
            self.room_config,
            self.collaborators,
            Arc::new(AlphanumericIds),
        );

        let state = Arc::new(ServerState {
            rooms: Mutex::new(registry),
            online: Mutex::new(HashMap::new()),
            codec: JsonCodec,
        });
        Ok(ScribbleServer { transport, state })
    }
}

impl Default for ScribbleServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Scribble server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ScribbleServer {
    transport: WebSocketTransport,
    state: Arc<ServerState<JsonCodec>>,
}

impl ScribbleServer {
    pub fn builder() -> ScribbleServerBuilder {
        ScribbleServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Every connection is upgraded and served on its own task.
    pub async fn run(self) -> Result<(), ScribbleError> {
        tracing::info!("Scribble server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let conn_id = pending.id();
                        if let Err(e) = handle_connection(pending, state).await {
                            tracing::debug!(%conn_id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
