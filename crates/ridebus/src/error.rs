//! Unified error type for the Ride the Bus server.

use ridebus_protocol::ProtocolError;
use ridebus_room::RoomError;
use ridebus_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RideBusError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (room stopped, not a member, rejected action).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use ridebus_game::{GameError, RoomCode};

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let ridebus_err: RideBusError = err.into();
        assert!(matches!(ridebus_err, RideBusError::Transport(_)));
        assert!(ridebus_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let ridebus_err: RideBusError = err.into();
        assert!(matches!(ridebus_err, RideBusError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::Unavailable(RoomCode::new("ABC123").unwrap());
        let ridebus_err: RideBusError = err.into();
        assert!(matches!(ridebus_err, RideBusError::Room(_)));
        assert!(ridebus_err.to_string().contains("ABC123"));
    }

    #[test]
    fn test_game_rejection_message_passes_through() {
        let err: RideBusError = RoomError::from(GameError::AlreadyDealt).into();
        assert_eq!(err.to_string(), "hands have already been dealt");
    }
}
