//! Game model for Ride the Bus.
//!
//! Everything in this crate is plain data plus pure (or purely
//! in-memory) operations. There is no I/O and no locking here: the room
//! layer owns one [`MatchState`] per room and serializes all access to it.
//!
//! # Key types
//!
//! - [`Card`], [`Rank`], [`Suit`] — immutable card values
//! - [`create_deck`], [`shuffle`], [`deal_pyramid`] — deck handling
//! - [`Pyramid`] — the triangular layout and its reveal cursor
//! - [`MatchState`] — the aggregate root for one room
//! - [`Phase`] — `LOBBY → PYRAMID → BUS → RESULTS`

mod card;
mod deck;
mod error;
mod ids;
mod phase;
mod pyramid;
mod state;

pub use card::{Card, Rank, Suit, compare_rank, rank_value};
pub use deck::{DECK_SIZE, create_deck, derive_seed, shuffle};
pub use error::GameError;
pub use ids::{PlayerId, ROOM_CODE_LEN, RoomCode};
pub use phase::Phase;
pub use pyramid::{Pyramid, PyramidCard, deal_pyramid, pyramid_size};
pub use state::{BusRow, BusState, MatchState, Player, Rules};
