//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Each room runs in its own task and talks to the outside world through
//! a bounded command channel. Timer alarms arrive on a second channel
//! owned by the same task, so commands and alarms never interleave
//! partway through a reaction.

use std::collections::HashMap;

use scribble_protocol::{
    ChatMode, PlayerId, Recipient, RoomId, RoomSnapshot, ServerEvent, SettingUpdate, Settings,
    Visibility,
};
use tokio::sync::{mpsc, oneshot};

use crate::room::{AlarmFired, Outbound};
use crate::{Collaborators, Room, RoomConfig, RoomError, RoomStatus};

/// Channel sender for delivering events to a player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// A gameplay request from a seated player.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomAction {
    UpdateSetting(SettingUpdate),
    StartGame(Settings),
    ChooseWord(String),
    Chat(String),
    Drawing(serde_json::Value),
}

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the response on it.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },

    /// Replies with the number of players left.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },

    /// Fire-and-forget. Failures go back to the player as an error event.
    Action {
        player_id: PlayerId,
        action: RoomAction,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    Shutdown,
}

/// A snapshot of room metadata (not the game itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub visibility: Visibility,
    pub status: RoomStatus,
    pub player_count: usize,
    pub max_players: usize,
}

impl RoomInfo {
    pub fn has_free_seat(&self) -> bool {
        self.player_count < self.max_players
    }
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }

    /// Seats a player. The joiner receives `RoomJoined` on `sender` before
    /// anyone else hears about them.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                player_id,
                name,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a player and returns how many are left.
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                player_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Delivers a gameplay action (fire-and-forget).
    pub async fn act(&self, player_id: PlayerId, action: RoomAction) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Action { player_id, action })
            .await
            .map_err(|_| self.unavailable())
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    /// Per-player outbound channels.
    senders: HashMap<PlayerId, PlayerSender>,
    commands: mpsc::Receiver<RoomCommand>,
    alarms: mpsc::UnboundedReceiver<AlarmFired>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.id(), "room actor started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Some(fired) = self.alarms.recv() => {
                    let events = self.room.handle_alarm(fired);
                    self.dispatch(events);
                }
            }
        }

        tracing::info!(room_id = %self.room.id(), "room actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_id, name, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.handle_leave(&player_id);
                let _ = reply.send(result);
            }
            RoomCommand::Action { player_id, action } => {
                self.handle_action(player_id, action);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.room.id(), "room shutting down");
                return false;
            }
        }
        true
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let snapshot = self.room.add_player(player_id.clone(), name.clone())?;
        let _ = sender.send(ServerEvent::RoomJoined {
            snapshot: snapshot.clone(),
        });
        self.senders.insert(player_id.clone(), sender);

        self.dispatch(vec![
            (
                Recipient::all_but(&player_id),
                ServerEvent::Chat {
                    name: name.clone(),
                    text: format!("{name} joined the room"),
                    mode: ChatMode::SystemInfo,
                },
            ),
            self.members_event(),
        ]);
        Ok(snapshot)
    }

    fn handle_leave(&mut self, player_id: &PlayerId) -> Result<usize, RoomError> {
        let name = self.room.name_of(player_id).map(str::to_owned);
        let events = self.room.remove_player(player_id)?;
        self.senders.remove(player_id);

        if let Some(name) = name.filter(|_| !self.room.is_empty()) {
            self.dispatch(vec![
                (
                    Recipient::All,
                    ServerEvent::Chat {
                        name: name.clone(),
                        text: format!("{name} left the room"),
                        mode: ChatMode::SystemInfo,
                    },
                ),
                self.members_event(),
            ]);
        }
        self.dispatch(events);
        Ok(self.room.player_count())
    }

    fn handle_action(&mut self, player_id: PlayerId, action: RoomAction) {
        if !self.room.has_player(&player_id) {
            tracing::warn!(
                room_id = %self.room.id(),
                %player_id,
                "action from non-member, ignoring"
            );
            return;
        }

        let result = match action {
            RoomAction::UpdateSetting(update) => self.room.update_setting(&player_id, update),
            RoomAction::StartGame(settings) => self.room.start_game(&player_id, settings),
            RoomAction::ChooseWord(word) => self.room.start_match(&player_id, &word),
            RoomAction::Chat(text) => self.room.validate_guess(&player_id, &text),
            RoomAction::Drawing(data) => self.room.relay_drawing(&player_id, data),
        };

        match result {
            Ok(events) => self.dispatch(events),
            Err(err) => {
                tracing::debug!(
                    room_id = %self.room.id(),
                    %player_id,
                    error = %err,
                    "action rejected"
                );
                self.send_to(
                    &player_id,
                    ServerEvent::Error {
                        code: err.code(),
                        message: err.to_string(),
                    },
                );
            }
        }
    }

    fn members_event(&self) -> Outbound {
        (
            Recipient::All,
            ServerEvent::RoomMembers {
                players: self.room.members(),
            },
        )
    }

    /// Delivers events to the addressed players.
    fn dispatch(&self, events: Vec<Outbound>) {
        for (recipient, event) in events {
            match recipient {
                Recipient::Player(pid) => self.send_to(&pid, event),
                other => {
                    for (pid, sender) in &self.senders {
                        if other.includes(pid) {
                            let _ = sender.send(event.clone());
                        }
                    }
                }
            }
        }
    }

    /// Sends to one player. Silently drops if their connection is gone.
    fn send_to(&self, player_id: &PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(player_id) {
            let _ = sender.send(event);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room.id().clone(),
            visibility: self.room.visibility(),
            status: self.room.status(),
            player_count: self.room.player_count(),
            max_players: self.room.settings().total_players,
        }
    }
}

/// Spawns a room with its creator seated as host. The creator receives
/// `RoomCreated` before any other event.
pub(crate) fn spawn_room(
    room_id: RoomId,
    visibility: Visibility,
    host: (PlayerId, String, PlayerSender),
    config: RoomConfig,
    collaborators: Collaborators,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);
    let (alarm_tx, alarm_rx) = mpsc::unbounded_channel();
    let (host_id, host_name, host_sender) = host;

    let room = Room::new(
        room_id.clone(),
        visibility,
        (host_id.clone(), host_name),
        config,
        collaborators,
        alarm_tx,
    );
    let _ = host_sender.send(ServerEvent::RoomCreated {
        snapshot: room.snapshot(),
    });

    let mut senders = HashMap::new();
    senders.insert(host_id, host_sender);

    let actor = RoomActor {
        room,
        senders,
        commands: rx,
        alarms: alarm_rx,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
