//! Room lifecycle management for Ride the Bus.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! room's [`MatchState`](ridebus_game::MatchState) and its set of
//! connections. Every mutation and every broadcast for a room goes
//! through that one task, so they never interleave.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — maps room codes to rooms; creates and removes them
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`Broadcaster`] — serializes snapshots and fans them out
//! - [`RoomSettings`] — pyramid size, hand size, house rules

mod broadcast;
mod config;
mod error;
mod registry;
mod room;

pub use broadcast::{Broadcaster, Frame, OutboundSender};
pub use config::RoomSettings;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::RoomHandle;
