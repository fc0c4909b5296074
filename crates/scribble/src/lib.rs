//! # Scribble
//!
//! Server for a multiplayer drawing-and-guessing game. Players gather in
//! rooms, take turns drawing a secret word, and score by guessing it in
//! chat before time runs out.
//!
//! This crate is the gateway: it accepts WebSocket connections, decodes
//! JSON [`ClientAction`](scribble_protocol::ClientAction)s, and routes them
//! to the room actors in `scribble-room`. Each connection is one player.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scribble::ScribbleServer;
//!
//! # async fn start() -> Result<(), scribble::ScribbleError> {
//! let server = ScribbleServer::builder().bind("127.0.0.1:3000").build().await?;
//! if let Ok(addr) = server.local_addr() {
//!     println!("listening on {addr}");
//! }
//! server.run().await
//! # }
//! ```

mod error;
mod gateway;
mod server;
mod transport;

pub use error::ScribbleError;
pub use server::{DEFAULT_ADDR, ScribbleServer, ScribbleServerBuilder};
pub use transport::{
    ConnectionId, MessageSink, MessageStream, PendingConnection, TransportError,
    WebSocketConnection, WebSocketTransport,
};

/// Everything needed to run or embed a server.
pub mod prelude {
    pub use crate::{ScribbleError, ScribbleServer, ScribbleServerBuilder};
    pub use scribble_protocol::{
        ClientAction, Codec, ErrorCode, JsonCodec, PlayerId, RoomId, ServerEvent, Settings,
    };
    pub use scribble_room::{Collaborators, IndexPicker, RoomConfig, WordList, WordSource};
}
