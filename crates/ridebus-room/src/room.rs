//! Room actor: an isolated Tokio task that owns one match.
//!
//! The actor is the single mutual-exclusion domain for its room. Joins,
//! plays, leaves, and the broadcasts they trigger are processed one
//! command at a time, in arrival order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ridebus_game::{MatchState, PlayerId, RoomCode};
use ridebus_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{Broadcaster, OutboundSender, RoomError, RoomSettings};

/// Counter distinguishing successive rooms that reuse one code.
static NEXT_ROOM_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Commands sent to a room actor through its channel.
///
/// Most variants carry a `oneshot` reply channel so the caller can wait
/// for the outcome.
pub(crate) enum RoomCommand {
    Join {
        conn_id: ConnectionId,
        player_id: PlayerId,
        player_name: String,
        outbound: OutboundSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    PlayCard {
        conn_id: ConnectionId,
        card_id: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    DealHands {
        conn_id: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    RevealCard {
        conn_id: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// Remove a connection. Replies with the number still connected.
    Leave {
        conn_id: ConnectionId,
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<MatchState>,
    },
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    instance: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle")
            .field("code", &self.code)
            .field("instance", &self.instance)
            .finish()
    }
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Identifies this particular room, even after its code is reused.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Binds a connection to `player_id` in this room.
    ///
    /// The joiner is sent a snapshot, then the whole room (joiner
    /// included) gets the updated snapshot.
    pub async fn join(
        &self,
        conn_id: ConnectionId,
        player_id: PlayerId,
        player_name: String,
        outbound: OutboundSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            conn_id,
            player_id,
            player_name,
            outbound,
            reply,
        })
        .await?
    }

    /// Plays a card for the player bound to `conn_id`.
    pub async fn play_card(
        &self,
        conn_id: ConnectionId,
        card_id: String,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::PlayCard {
            conn_id,
            card_id,
            reply,
        })
        .await?
    }

    pub async fn deal_hands(
        &self,
        conn_id: ConnectionId,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::DealHands { conn_id, reply })
            .await?
    }

    pub async fn reveal_card(
        &self,
        conn_id: ConnectionId,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::RevealCard { conn_id, reply })
            .await?
    }

    /// Removes a connection and returns how many remain. At zero the
    /// actor stops and the room is gone.
    pub async fn leave(
        &self,
        conn_id: ConnectionId,
    ) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Leave { conn_id, reply })
            .await
    }

    /// Returns a copy of the current match state.
    pub async fn snapshot(&self) -> Result<MatchState, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Tells the room to stop.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// A connection bound to a player in this room.
struct Member {
    player_id: PlayerId,
    outbound: OutboundSender,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    code: RoomCode,
    instance: u64,
    state: MatchState,
    settings: RoomSettings,
    connections: HashMap<ConnectionId, Member>,
    broadcaster: Broadcaster,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until the room empties or is shut down.
    async fn run(mut self) {
        tracing::info!(
            room_code = %self.code,
            instance = self.instance,
            rng_seed = %self.state.rng_seed,
            "room actor started"
        );

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    conn_id,
                    player_id,
                    player_name,
                    outbound,
                    reply,
                } => {
                    self.handle_join(conn_id, player_id, &player_name, outbound);
                    let _ = reply.send(Ok(()));
                }
                RoomCommand::PlayCard {
                    conn_id,
                    card_id,
                    reply,
                } => {
                    let result = self.member(conn_id).and_then(|player| {
                        self.state.play_card(&player, &card_id)?;
                        tracing::debug!(
                            room_code = %self.code,
                            %player,
                            card_id = %card_id,
                            "card played"
                        );
                        Ok(())
                    });
                    self.broadcast_if_ok(&result);
                    let _ = reply.send(result);
                }
                RoomCommand::DealHands { conn_id, reply } => {
                    let hand_size = self.settings.hand_size;
                    let result = self.member(conn_id).and_then(|player| {
                        let dealt = self.state.deal_hands(&player, hand_size)?;
                        tracing::info!(room_code = %self.code, dealt, "hands dealt");
                        Ok(())
                    });
                    self.broadcast_if_ok(&result);
                    let _ = reply.send(result);
                }
                RoomCommand::RevealCard { conn_id, reply } => {
                    let result = self.member(conn_id).and_then(|player| {
                        match self.state.reveal_next(&player)? {
                            Some(revealed) => tracing::debug!(
                                room_code = %self.code,
                                card = %revealed.card,
                                row = revealed.row,
                                col = revealed.col,
                                "pyramid card revealed"
                            ),
                            None => tracing::debug!(
                                room_code = %self.code,
                                "empty pyramid, moving on"
                            ),
                        }
                        Ok(())
                    });
                    self.broadcast_if_ok(&result);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { conn_id, reply } => {
                    let (removed, remaining) = self.handle_leave(conn_id);
                    let _ = reply.send(remaining);
                    if removed && remaining == 0 {
                        tracing::info!(room_code = %self.code, "room empty");
                        break;
                    }
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.state.clone());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room_code = %self.code, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(
            room_code = %self.code,
            instance = self.instance,
            "room actor stopped"
        );
    }

    fn handle_join(
        &mut self,
        conn_id: ConnectionId,
        player_id: PlayerId,
        player_name: &str,
        outbound: OutboundSender,
    ) {
        // The connection may be re-joining under a different player id.
        if let Some(previous) = self.connections.remove(&conn_id) {
            if previous.player_id != player_id {
                self.release_player(&previous.player_id);
            }
        }

        // One live connection per player id: the newest wins.
        let stale: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, m)| m.player_id == player_id)
            .map(|(id, _)| *id)
            .collect();
        for old in stale {
            self.connections.remove(&old);
            tracing::warn!(
                room_code = %self.code,
                %player_id,
                old_conn = %old,
                new_conn = %conn_id,
                "player joined from a new connection; detaching the old one"
            );
        }

        let is_new = self.state.add_player(player_id.clone(), player_name);
        tracing::info!(
            room_code = %self.code,
            %player_id,
            %conn_id,
            is_new,
            players = self.state.player_count(),
            "player joined"
        );

        if let Some(frame) = self.broadcaster.snapshot_frame(&self.state) {
            self.broadcaster.send_to(&outbound, &frame);
            self.connections.insert(conn_id, Member { player_id, outbound });
            self.broadcast_frame(&frame);
        } else {
            self.connections.insert(conn_id, Member { player_id, outbound });
        }
    }

    /// Returns `(was_member, remaining)`.
    fn handle_leave(&mut self, conn_id: ConnectionId) -> (bool, usize) {
        let Some(member) = self.connections.remove(&conn_id) else {
            return (false, self.connections.len());
        };
        self.release_player(&member.player_id);
        tracing::info!(
            room_code = %self.code,
            player_id = %member.player_id,
            %conn_id,
            remaining = self.connections.len(),
            "connection left"
        );
        if !self.connections.is_empty() {
            self.broadcast_state();
        }
        (true, self.connections.len())
    }

    /// Marks a player disconnected unless another connection still
    /// carries their id. Host and turn move on to whoever is still here.
    fn release_player(&mut self, player_id: &PlayerId) {
        let still_bound =
            self.connections.values().any(|m| m.player_id == *player_id);
        if !still_bound {
            self.state.mark_disconnected(player_id);
        }
    }

    fn member(&self, conn_id: ConnectionId) -> Result<PlayerId, RoomError> {
        self.connections
            .get(&conn_id)
            .map(|m| m.player_id.clone())
            .ok_or_else(|| RoomError::NotMember(conn_id, self.code.clone()))
    }

    fn broadcast_if_ok(&self, result: &Result<(), RoomError>) {
        match result {
            Ok(()) => self.broadcast_state(),
            Err(e) => {
                tracing::debug!(room_code = %self.code, error = %e, "action rejected");
            }
        }
    }

    fn broadcast_state(&self) {
        if let Some(frame) = self.broadcaster.snapshot_frame(&self.state) {
            self.broadcast_frame(&frame);
        }
    }

    fn broadcast_frame(&self, frame: &crate::Frame) {
        let delivered = self
            .broadcaster
            .broadcast(self.connections.values().map(|m| &m.outbound), frame);
        tracing::trace!(
            room_code = %self.code,
            delivered,
            connections = self.connections.len(),
            "snapshot broadcast"
        );
    }
}

/// Creates the match for a new room and spawns its actor task.
pub(crate) fn spawn_room(
    code: RoomCode,
    host_id: PlayerId,
    settings: &RoomSettings,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(settings.command_buffer.max(1));
    let instance = NEXT_ROOM_INSTANCE.fetch_add(1, Ordering::Relaxed);

    let state = MatchState::create(
        code.clone(),
        host_id,
        settings.pyramid_rows,
        settings.rules.clone(),
    );

    let actor = RoomActor {
        code: code.clone(),
        instance,
        state,
        settings: settings.clone(),
        connections: HashMap::new(),
        broadcaster: Broadcaster::default(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        code,
        instance,
        sender: tx,
    }
}
