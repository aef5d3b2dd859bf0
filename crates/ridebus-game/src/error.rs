//! Error types for the game layer.

use crate::{Phase, PlayerId};

/// Reasons a match mutation was rejected.
///
/// A rejected mutation never changes the match state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The player is not part of this match.
    #[error("player {0} is not in this match")]
    UnknownPlayer(PlayerId),

    /// The player does not hold the named card.
    #[error("player {player} does not hold card {card_id}")]
    CardNotInHand { player: PlayerId, card_id: String },

    /// Someone other than the current player tried to take a turn.
    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    /// Only the host may perform this action.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// The action is not allowed in the current phase.
    #[error("action requires phase {expected}, match is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    /// Hands were already dealt (or play has begun).
    #[error("hands have already been dealt")]
    AlreadyDealt,

    /// The phase cannot advance yet (or has no successor).
    #[error("phase {0} cannot advance")]
    PhaseLocked(Phase),

    /// A room code was empty or contained unsupported characters.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),
}
