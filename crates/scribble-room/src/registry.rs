//! Room registry: creates, tracks, and routes players to rooms.

use std::collections::HashMap;
use std::sync::Arc;

use scribble_protocol::{PlayerId, RoomId, RoomSnapshot, Visibility};

use crate::actor::spawn_room;
use crate::{
    AlphanumericIds, Collaborators, PlayerSender, RoomAction, RoomConfig, RoomError, RoomHandle,
    RoomIdGenerator, RoomInfo,
};

/// Attempts at drawing an unused room id before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Owns every live room and the player-to-room index.
///
/// This is the entry point for room operations from the gateway. It is
/// created once per server and shared by connection tasks.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomHandle>,

    /// A player is in at most one room at a time.
    members: HashMap<PlayerId, RoomId>,

    config: RoomConfig,
    collaborators: Collaborators,
    ids: Arc<dyn RoomIdGenerator>,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self::with_collaborators(config, Collaborators::default(), Arc::new(AlphanumericIds))
    }

    /// A registry whose rooms draw words, hint positions, and ids from the
    /// given sources.
    pub fn with_collaborators(
        config: RoomConfig,
        collaborators: Collaborators,
        ids: Arc<dyn RoomIdGenerator>,
    ) -> Self {
        Self {
            rooms: HashMap::new(),
            members: HashMap::new(),
            config,
            collaborators,
            ids,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a room with `player_id` as host. The host receives
    /// `RoomCreated` on `sender`.
    pub fn create_room(
        &mut self,
        player_id: PlayerId,
        name: String,
        visibility: Visibility,
        sender: PlayerSender,
    ) -> Result<RoomId, RoomError> {
        self.ensure_roomless(&player_id)?;

        let room_id = self.fresh_id()?;
        let handle = spawn_room(
            room_id.clone(),
            visibility,
            (player_id.clone(), name, sender),
            self.config.clone(),
            self.collaborators.clone(),
        );
        self.rooms.insert(room_id.clone(), handle);
        self.members.insert(player_id.clone(), room_id.clone());
        tracing::info!(%room_id, host = %player_id, ?visibility, "room created");
        Ok(room_id)
    }

    /// Seats a player in an existing room.
    pub async fn join_room(
        &mut self,
        player_id: PlayerId,
        room_id: &RoomId,
        name: String,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        self.ensure_roomless(&player_id)?;

        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let snapshot = handle.join(player_id.clone(), name, sender).await?;
        self.members.insert(player_id, room_id.clone());
        Ok(snapshot)
    }

    /// Seats a player in any public room with a free seat, or opens a new
    /// public room with them as host.
    pub async fn quick_join(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<RoomId, RoomError> {
        self.ensure_roomless(&player_id)?;

        // A room may fill between get_info and join; keep searching.
        for info in self.list_public_rooms().await {
            let Some(handle) = self.rooms.get(&info.room_id) else {
                continue;
            };
            if handle
                .join(player_id.clone(), name.clone(), sender.clone())
                .await
                .is_ok()
            {
                self.members.insert(player_id, info.room_id.clone());
                return Ok(info.room_id);
            }
        }

        self.create_room(player_id, name, Visibility::Public, sender)
    }

    /// Removes a player from their room. The room is destroyed once empty.
    pub async fn leave_room(&mut self, player_id: &PlayerId) -> Result<RoomId, RoomError> {
        let room_id = self
            .members
            .remove(player_id)
            .ok_or_else(|| RoomError::NotInRoom(player_id.clone()))?;

        let left = match self.rooms.get(&room_id) {
            Some(handle) => handle.leave(player_id.clone()).await,
            None => return Ok(room_id),
        };

        match left {
            Ok(0) | Err(RoomError::Unavailable(_)) => {
                self.destroy_room(&room_id).await?;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(%room_id, %player_id, error = %err, "leave rejected by room");
            }
        }
        Ok(room_id)
    }

    /// Routes a gameplay action to the player's room.
    pub async fn route(&self, player_id: &PlayerId, action: RoomAction) -> Result<(), RoomError> {
        let room_id = self
            .members
            .get(player_id)
            .ok_or_else(|| RoomError::NotInRoom(player_id.clone()))?;
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        handle.act(player_id.clone(), action).await
    }

    pub async fn room_info(&self, room_id: &RoomId) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        handle.get_info().await
    }

    /// Public rooms with a free seat. Rooms that fail to respond are
    /// skipped.
    pub async fn list_public_rooms(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::new();
        for handle in self.rooms.values() {
            if let Ok(info) = handle.get_info().await {
                if info.visibility == Visibility::Public && info.has_free_seat() {
                    infos.push(info);
                }
            }
        }
        infos.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        infos
    }

    /// Shuts a room down and drops every membership pointing at it.
    pub async fn destroy_room(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let _ = handle.shutdown().await;
        self.members.retain(|_, rid| rid != room_id);

        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    pub fn player_room(&self, player_id: &PlayerId) -> Option<&RoomId> {
        self.members.get(player_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn ensure_roomless(&self, player_id: &PlayerId) -> Result<(), RoomError> {
        match self.members.get(player_id) {
            Some(current) => Err(RoomError::AlreadyInRoom(
                player_id.clone(),
                current.clone(),
            )),
            None => Ok(()),
        }
    }

    fn fresh_id(&self) -> Result<RoomId, RoomError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id();
            if !self.rooms.contains_key(&id) {
                return Ok(id);
            }
        }
        Err(RoomError::InvalidState("no free room id".into()))
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
