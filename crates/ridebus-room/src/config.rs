//! Room configuration.

use ridebus_game::{DECK_SIZE, Rules, pyramid_size};
use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Settings applied to every room the registry creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Rows in the pyramid. The pyramid takes `rows * (rows + 1) / 2` cards.
    pub pyramid_rows: usize,

    /// Cards per player when the host deals hands.
    pub hand_size: usize,

    /// House rules copied into each new match.
    pub rules: Rules,

    /// Capacity of each room actor's command queue.
    pub command_buffer: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            pyramid_rows: 5,
            hand_size: 4,
            rules: Rules::default(),
            command_buffer: 64,
        }
    }
}

impl RoomSettings {
    /// Checks that a room built from these settings can be dealt.
    ///
    /// The pyramid must fit in one deck.
    pub fn validate(&self) -> Result<(), RoomError> {
        let cells = pyramid_size(self.pyramid_rows);
        if cells > DECK_SIZE {
            return Err(RoomError::InvalidSettings(format!(
                "a {}-row pyramid needs {cells} cards but the deck has {DECK_SIZE}",
                self.pyramid_rows
            )));
        }
        Ok(())
    }
}
