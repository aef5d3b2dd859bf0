//! Per-connection handler: decode, dispatch, and push snapshots.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Spawn a writer task draining this connection's outbound channel
//!   2. Loop: receive frames → decode → dispatch to the registry or room
//!   3. On close: leave the room, stop the writer, close the socket

use std::sync::Arc;

use ridebus_game::GameError;
use ridebus_protocol::{
    ClientMessage, Codec, ProtocolError, Request, ServerMessage, error_code,
};
use ridebus_room::{Frame, OutboundSender, RoomError, RoomHandle};
use ridebus_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::RideBusError;
use crate::server::ServerState;

/// What one connection is currently bound to.
struct Session {
    conn_id: ConnectionId,
    outbound: OutboundSender,
    room: Option<RoomHandle>,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), RideBusError> {
    let conn_id = conn.id();
    let conn = Arc::new(conn);
    tracing::debug!(%conn_id, "handling new connection");

    // --- Writer: the only task that sends on this socket ---
    let (outbound, mut frames) = mpsc::unbounded_channel::<Frame>();
    let writer = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                if let Err(e) = conn.send(&frame).await {
                    tracing::debug!(%conn_id, error = %e, "send failed");
                    break;
                }
            }
        })
    };

    let mut session = Session {
        conn_id,
        outbound,
        room: None,
    };

    // --- Message loop ---
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping malformed message");
                continue;
            }
        };

        let request = match msg.into_request() {
            Ok(request) => request,
            Err(ProtocolError::UnknownMessageType) => {
                tracing::debug!(%conn_id, "ignoring unknown message type");
                continue;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping invalid message");
                continue;
            }
        };

        dispatch(&state, &mut session, request).await;
    }

    // --- Cleanup ---
    if let Some(room) = session.room.take() {
        state.registry.remove_connection(&room, conn_id).await;
    }
    drop(session);
    writer.abort();
    if conn.is_open() {
        conn.close().await?;
    }
    Ok(())
}

async fn dispatch(state: &ServerState, session: &mut Session, request: Request) {
    let conn_id = session.conn_id;
    match request {
        Request::Join {
            room_code,
            player_id,
            player_name,
        } => {
            if let Some(current) = session.room.take() {
                if current.code() != &room_code {
                    tracing::debug!(
                        %conn_id,
                        from = %current.code(),
                        to = %room_code,
                        "switching rooms"
                    );
                    state.registry.remove_connection(&current, conn_id).await;
                }
            }
            let joined = state
                .registry
                .resolve_room(
                    room_code,
                    player_id,
                    player_name,
                    conn_id,
                    session.outbound.clone(),
                )
                .await;
            match joined {
                Ok(handle) => session.room = Some(handle),
                Err(e) => reject(state, session, &e),
            }
        }

        Request::Create {
            player_id,
            player_name,
        } => {
            if let Some(current) = session.room.take() {
                state.registry.remove_connection(&current, conn_id).await;
            }
            let created = state
                .registry
                .create_room(
                    player_id,
                    player_name,
                    conn_id,
                    session.outbound.clone(),
                )
                .await;
            match created {
                Ok(handle) => session.room = Some(handle),
                Err(e) => reject(state, session, &e),
            }
        }

        Request::PlayCard { card_id } => {
            let Some(room) = joined_room(state, session) else {
                return;
            };
            if let Err(e) = room.play_card(conn_id, card_id).await {
                reject(state, session, &e);
            }
        }

        Request::DealHands => {
            let Some(room) = joined_room(state, session) else {
                return;
            };
            if let Err(e) = room.deal_hands(conn_id).await {
                reject(state, session, &e);
            }
        }

        Request::RevealCard => {
            let Some(room) = joined_room(state, session) else {
                return;
            };
            if let Err(e) = room.reveal_card(conn_id).await {
                reject(state, session, &e);
            }
        }
    }
}

/// The room this connection joined, or `None` after notifying the client.
fn joined_room(state: &ServerState, session: &Session) -> Option<RoomHandle> {
    if let Some(room) = &session.room {
        return Some(room.clone());
    }
    tracing::debug!(conn_id = %session.conn_id, "action before joining a room");
    notify(
        state,
        session,
        error_code::NOT_IN_ROOM,
        "join a room first".to_string(),
    );
    None
}

/// Logs a rejected request and, if enabled, tells the sender why.
fn reject(state: &ServerState, session: &Session, err: &RoomError) {
    tracing::debug!(conn_id = %session.conn_id, error = %err, "request rejected");
    let code = match err {
        RoomError::Rejected(GameError::NotHost(_)) => error_code::FORBIDDEN,
        RoomError::NotMember(..) | RoomError::Unavailable(_) => {
            error_code::NOT_IN_ROOM
        }
        _ => error_code::REJECTED,
    };
    notify(state, session, code, err.to_string());
}

fn notify(state: &ServerState, session: &Session, code: u16, message: String) {
    if !state.notify_rejections {
        return;
    }
    if let Some(frame) = state
        .broadcaster
        .frame(&ServerMessage::Error { code, message })
    {
        state.broadcaster.send_to(&session.outbound, &frame);
    }
}
