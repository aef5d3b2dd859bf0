//! Match phase state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The phase of a match.
///
/// Transitions are strictly ordered:
///
/// ```text
/// LOBBY → PYRAMID → BUS → RESULTS
/// ```
///
/// Matches are created directly in `PYRAMID`. Whether a phase may be
/// left is decided by [`MatchState::advance_phase`](crate::MatchState::advance_phase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Lobby,
    Pyramid,
    Bus,
    Results,
}

impl Phase {
    /// Returns the successor phase, or `None` from `Results`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Lobby => Some(Self::Pyramid),
            Self::Pyramid => Some(Self::Bus),
            Self::Bus => Some(Self::Results),
            Self::Results => None,
        }
    }

    /// Returns `true` if moving to `target` is a valid single step.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "LOBBY"),
            Self::Pyramid => write!(f, "PYRAMID"),
            Self::Bus => write!(f, "BUS"),
            Self::Results => write!(f, "RESULTS"),
        }
    }
}
