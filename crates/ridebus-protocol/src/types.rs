//! Message types for the Ride the Bus wire format.
//!
//! Both directions use internally tagged JSON objects:
//!
//! ```text
//! {"type":"JOIN_ROOM","roomCode":"ABC123","playerId":"p1","playerName":"Alice"}
//! {"type":"MATCH_STATE","matchState":{ ... }}
//! ```

use ridebus_game::{MatchState, PlayerId, RoomCode};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// HTTP-style codes carried by [`ServerMessage::Error`].
pub mod error_code {
    /// The request was well-formed but not allowed right now.
    pub const REJECTED: u16 = 409;
    /// The action needs a room and the connection has not joined one.
    pub const NOT_IN_ROOM: u16 = 404;
    /// Only the host may do this.
    pub const FORBIDDEN: u16 = 403;
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// A message as it arrives from a client, before validation.
///
/// Frames with a `type` this server doesn't know decode to
/// [`ClientMessage::Unknown`] rather than failing, so they can be logged
/// separately from unparseable frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Create the room if needed and join it.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_code: String,
        player_id: PlayerId,
        player_name: String,
    },

    /// Let the server pick a fresh room code, then join it.
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        player_id: PlayerId,
        player_name: String,
    },

    /// Play a card from this connection's player's hand.
    #[serde(rename_all = "camelCase")]
    PlayCard { card_id: String },

    /// Host: deal everyone their starting hand.
    DealHands,

    /// Host: turn over the next pyramid card.
    RevealCard,

    #[serde(other)]
    Unknown,
}

/// A validated client request, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Join {
        room_code: RoomCode,
        player_id: PlayerId,
        player_name: String,
    },
    Create {
        player_id: PlayerId,
        player_name: String,
    },
    PlayCard {
        card_id: String,
    },
    DealHands,
    RevealCard,
}

impl ClientMessage {
    /// Checks required fields and normalizes them.
    ///
    /// Room codes are normalized by [`RoomCode::new`]; a blank player
    /// name falls back to the player id.
    pub fn into_request(self) -> Result<Request, ProtocolError> {
        match self {
            Self::JoinRoom {
                room_code,
                player_id,
                player_name,
            } => {
                let room_code = RoomCode::new(&room_code)
                    .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))?;
                let (player_id, player_name) =
                    validate_player(player_id, player_name)?;
                Ok(Request::Join {
                    room_code,
                    player_id,
                    player_name,
                })
            }
            Self::CreateRoom {
                player_id,
                player_name,
            } => {
                let (player_id, player_name) =
                    validate_player(player_id, player_name)?;
                Ok(Request::Create {
                    player_id,
                    player_name,
                })
            }
            Self::PlayCard { card_id } => {
                let card_id = card_id.trim();
                if card_id.is_empty() {
                    return Err(ProtocolError::InvalidMessage(
                        "cardId must not be empty".into(),
                    ));
                }
                Ok(Request::PlayCard {
                    card_id: card_id.to_string(),
                })
            }
            Self::DealHands => Ok(Request::DealHands),
            Self::RevealCard => Ok(Request::RevealCard),
            Self::Unknown => Err(ProtocolError::UnknownMessageType),
        }
    }
}

fn validate_player(
    player_id: PlayerId,
    player_name: String,
) -> Result<(PlayerId, String), ProtocolError> {
    let id = player_id.as_str().trim();
    if id.is_empty() {
        return Err(ProtocolError::InvalidMessage(
            "playerId must not be empty".into(),
        ));
    }
    let name = match player_name.trim() {
        "" => id.to_string(),
        name => name.to_string(),
    };
    Ok((PlayerId(id.to_string()), name))
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// A message the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Full snapshot of the room's match state. Never a diff.
    #[serde(rename_all = "camelCase")]
    MatchState { match_state: MatchState },

    /// A rejected action. Only sent when rejection notices are enabled.
    Error { code: u16, message: String },
}
