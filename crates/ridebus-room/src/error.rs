//! Error types for the room layer.

use ridebus_game::{GameError, RoomCode};
use ridebus_transport::ConnectionId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room's actor has stopped (its last connection left).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// The connection is not (or no longer) bound to this room.
    #[error("{0} is not in room {1}")]
    NotMember(ConnectionId, RoomCode),

    /// The match rejected the action.
    #[error(transparent)]
    Rejected(#[from] GameError),

    /// Room settings that no match could be dealt from.
    #[error("invalid room settings: {0}")]
    InvalidSettings(String),

    /// Could not find an unused room code.
    #[error("no free room code after {0} attempts")]
    NoFreeCode(usize),
}
