//! Identifier newtypes.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::GameError;

/// Player identity, chosen by the client at join time and not verified.
///
/// Serializes as a plain string so it can key the snapshot's player map.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Characters used for generated room codes (no 0/O or 1/I).
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of generated room codes.
pub const ROOM_CODE_LEN: usize = 6;

/// A short room code such as `"ABC123"`.
///
/// Codes are trimmed and upper-cased on construction, so `" abc123"`
/// and `"ABC123"` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes and validates a client-supplied code.
    pub fn new(raw: &str) -> Result<Self, GameError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty()
            || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(GameError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    /// Generates a fresh random code. Not used by dealing.
    pub fn random() -> Self {
        let mut rng = rand::rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| {
                let idx = rng.random_range(0..ROOM_CODE_ALPHABET.len());
                ROOM_CODE_ALPHABET[idx] as char
            })
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
