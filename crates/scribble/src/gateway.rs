//! Per-connection handler: decode, validate, and route client actions.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Upgrade to WebSocket; the connection id becomes the `PlayerId`
//!   2. Spawn a writer that drains the player's event channel
//!   3. Count the player as online and tell every connection the new total
//!   4. Loop: receive frames → decode `ClientAction` → registry or room
//!
//! Rejections of any kind go back to this connection only, as
//! `ServerEvent::Error`.

use std::collections::HashMap;
use std::sync::Arc;

use scribble_protocol::{ClientAction, Codec, ErrorCode, PlayerId, ServerEvent, Visibility};
use scribble_room::{PlayerSender, RoomAction, RoomError};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::{MessageSink, PendingConnection, ScribbleError};

/// Drop guard that takes a player out of their room and off the online
/// list when the handler exits, including by panic. `Drop` is
/// synchronous, so the cleanup runs on a spawned task.
struct MembershipGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for MembershipGuard<C> {
    fn drop(&mut self) {
        let player_id = self.player_id.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            {
                let mut rooms = state.rooms.lock().await;
                match rooms.leave_room(&player_id).await {
                    Ok(room_id) => {
                        tracing::debug!(%player_id, %room_id, "left room on disconnect")
                    }
                    Err(RoomError::NotInRoom(_)) => {}
                    Err(e) => tracing::debug!(%player_id, error = %e, "leave on disconnect failed"),
                }
            }
            let mut online = state.online.lock().await;
            online.remove(&player_id);
            broadcast_online(&online);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    pending: PendingConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ScribbleError> {
    let conn = pending.upgrade().await?;
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.to_string());
    tracing::debug!(%conn_id, %player_id, "connection open");

    let (sink, mut stream) = conn.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(sink, rx, Arc::clone(&state), player_id.clone()));

    let _guard = MembershipGuard {
        player_id: player_id.clone(),
        state: Arc::clone(&state),
    };
    {
        let mut online = state.online.lock().await;
        online.insert(player_id.clone(), tx.clone());
        broadcast_online(&online);
    }

    loop {
        let data = match stream.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
        };

        let action = match state
            .codec
            .decode::<ClientAction>(&data)
            .and_then(ClientAction::validated)
        {
            Ok(action) => action,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "bad request");
                reject(&tx, ErrorCode::BadRequest, e.to_string());
                continue;
            }
        };

        if let Err(e) = handle_action(&state, &player_id, action, &tx).await {
            tracing::debug!(%player_id, error = %e, "action rejected");
            reject(&tx, e.code(), e.to_string());
        }
    }

    writer.abort();
    // _guard drops here → leave fires.
    Ok(())
}

/// Applies one validated action. Lobby actions go through the registry,
/// gameplay actions are forwarded to the player's room.
async fn handle_action<C: Codec>(
    state: &ServerState<C>,
    player_id: &PlayerId,
    action: ClientAction,
    tx: &PlayerSender,
) -> Result<(), RoomError> {
    // PERF: the registry lock is held while a join waits for the room's
    // reply. Rooms never touch the registry, so this cannot deadlock.
    let mut rooms = state.rooms.lock().await;

    let room_action = match action {
        ClientAction::Create { name } => {
            rooms.create_room(player_id.clone(), name, Visibility::Private, tx.clone())?;
            return Ok(());
        }
        ClientAction::Join { room_id, name } => {
            rooms
                .join_room(player_id.clone(), &room_id, name, tx.clone())
                .await?;
            return Ok(());
        }
        ClientAction::QuickJoin { name } => {
            rooms.quick_join(player_id.clone(), name, tx.clone()).await?;
            return Ok(());
        }
        ClientAction::Leave => {
            rooms.leave_room(player_id).await?;
            return Ok(());
        }
        ClientAction::UpdateSetting { update } => RoomAction::UpdateSetting(update),
        ClientAction::StartGame { settings } => RoomAction::StartGame(settings),
        ClientAction::ChooseWord { word } => RoomAction::ChooseWord(word),
        ClientAction::Chat { text } => RoomAction::Chat(text),
        ClientAction::Drawing { data } => RoomAction::Drawing(data),
    };
    rooms.route(player_id, room_action).await
}

/// Drains the player's event channel onto the socket.
async fn write_events<C: Codec>(
    mut sink: MessageSink,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<C>>,
    player_id: PlayerId,
) {
    while let Some(event) = rx.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%player_id, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = sink.send(bytes).await {
            tracing::debug!(%player_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
    let _ = sink.close().await;
}

/// Sends the current online count to every open connection.
fn broadcast_online(online: &HashMap<PlayerId, PlayerSender>) {
    let count = online.len();
    tracing::debug!(count, "online players changed");
    for tx in online.values() {
        let _ = tx.send(ServerEvent::OnlinePlayers { count });
    }
}

fn reject(tx: &PlayerSender, code: ErrorCode, message: String) {
    let _ = tx.send(ServerEvent::Error { code, message });
}
