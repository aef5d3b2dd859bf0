//! Room registry: maps room codes to running room actors.

use std::collections::HashMap;

use ridebus_game::{PlayerId, RoomCode};
use ridebus_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::room::spawn_room;
use crate::{OutboundSender, RoomError, RoomHandle, RoomSettings};

/// Attempts at drawing an unused code before `create_room` gives up.
const MAX_CODE_ATTEMPTS: usize = 16;

/// Tracks every live room by code.
///
/// The map lock only guards lookup and insertion. It is never held while
/// waiting on a room actor, so one busy room can't stall another.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomCode, RoomHandle>>,
    settings: RoomSettings,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    /// Joins `conn_id` to the room under `code`, creating it first if no
    /// live room has that code. The creating player becomes host.
    ///
    /// Two first joins racing on the same code end up in the same room:
    /// lookup and creation happen under one lock acquisition.
    pub async fn resolve_room(
        &self,
        code: RoomCode,
        player_id: PlayerId,
        player_name: String,
        conn_id: ConnectionId,
        outbound: OutboundSender,
    ) -> Result<RoomHandle, RoomError> {
        loop {
            let handle = self.get_or_spawn(&code, &player_id).await;
            match handle
                .join(
                    conn_id,
                    player_id.clone(),
                    player_name.clone(),
                    outbound.clone(),
                )
                .await
            {
                Ok(()) => return Ok(handle),
                Err(RoomError::Unavailable(_)) => {
                    // The room emptied between lookup and join.
                    tracing::debug!(
                        room_code = %code,
                        instance = handle.instance(),
                        "room stopped before join, retrying"
                    );
                    self.remove_if_current(&code, handle.instance()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Picks an unused random code, creates the room, and joins it.
    pub async fn create_room(
        &self,
        player_id: PlayerId,
        player_name: String,
        conn_id: ConnectionId,
        outbound: OutboundSender,
    ) -> Result<RoomHandle, RoomError> {
        let handle = {
            let mut rooms = self.rooms.lock().await;
            let code = (0..MAX_CODE_ATTEMPTS)
                .map(|_| RoomCode::random())
                .find(|code| {
                    rooms.get(code).is_none_or(|handle| handle.is_closed())
                })
                .ok_or(RoomError::NoFreeCode(MAX_CODE_ATTEMPTS))?;
            let handle = spawn_room(code.clone(), player_id.clone(), &self.settings);
            tracing::info!(room_code = %code, host = %player_id, "room created");
            rooms.insert(code, handle.clone());
            handle
        };

        handle.join(conn_id, player_id, player_name, outbound).await?;
        Ok(handle)
    }

    /// Detaches a connection from its room. Once the room's last
    /// connection is gone the room is discarded; the next join to its
    /// code starts a fresh match.
    pub async fn remove_connection(
        &self,
        handle: &RoomHandle,
        conn_id: ConnectionId,
    ) {
        match handle.leave(conn_id).await {
            Ok(0) | Err(RoomError::Unavailable(_)) => {
                self.remove_if_current(handle.code(), handle.instance()).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(room_code = %handle.code(), error = %e, "leave failed");
            }
        }
    }

    /// Returns the live room under `code`, if any.
    pub async fn find(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms
            .lock()
            .await
            .get(code)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Number of rooms in the registry.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Stops every room and clears the registry.
    pub async fn shutdown(&self) {
        let handles: Vec<RoomHandle> =
            self.rooms.lock().await.drain().map(|(_, h)| h).collect();
        tracing::info!(rooms = handles.len(), "shutting down all rooms");
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }

    async fn get_or_spawn(
        &self,
        code: &RoomCode,
        host_id: &PlayerId,
    ) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(code).filter(|h| !h.is_closed()) {
            return handle.clone();
        }
        let handle = spawn_room(code.clone(), host_id.clone(), &self.settings);
        tracing::info!(room_code = %code, host = %host_id, "room created");
        rooms.insert(code.clone(), handle.clone());
        handle
    }

    /// Removes `code` only if it still maps to the given room instance,
    /// so a stale handle never evicts a newer room.
    async fn remove_if_current(&self, code: &RoomCode, instance: u64) {
        let mut rooms = self.rooms.lock().await;
        if rooms
            .get(code)
            .is_some_and(|handle| handle.instance() == instance)
        {
            rooms.remove(code);
            tracing::info!(room_code = %code, instance, "room removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn code(raw: &str) -> RoomCode {
        RoomCode::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_room_picks_fresh_code_and_hosts_creator() {
        let registry = RoomRegistry::new(RoomSettings::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = registry
            .create_room(PlayerId::from("p1"), "Alice".into(), ConnectionId::new(1), tx)
            .await
            .unwrap();

        assert_eq!(handle.code().as_str().len(), ridebus_game::ROOM_CODE_LEN);
        assert!(registry.find(handle.code()).await.is_some());
        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.host_id, PlayerId::from("p1"));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_find_unknown_code_is_none() {
        let registry = RoomRegistry::new(RoomSettings::default());
        assert!(registry.find(&code("NOPE")).await.is_none());
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_clears_rooms() {
        let registry = RoomRegistry::new(RoomSettings::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = registry
            .resolve_room(
                code("ABC123"),
                PlayerId::from("p1"),
                "Alice".into(),
                ConnectionId::new(1),
                tx,
            )
            .await
            .unwrap();

        registry.shutdown().await;
        assert_eq!(registry.room_count().await, 0);
        // The actor drains the shutdown command and drops its receiver.
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while !handle.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("room actor should stop");
    }
}
