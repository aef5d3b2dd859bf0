//! # Ride the Bus
//!
//! Authoritative real-time server for the Ride the Bus drinking card game.
//!
//! Clients connect over WebSocket, join a room by code, and receive the
//! room's full match state after every change. All game rules run on the
//! server; clients only render snapshots.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ridebus::prelude::*;
//!
//! # async fn start() -> Result<(), RideBusError> {
//! let server = RideBusServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::RideBusError;
pub use server::{RideBusServer, RideBusServerBuilder};

pub use ridebus_game as game;
pub use ridebus_protocol as protocol;
pub use ridebus_room as room;
pub use ridebus_transport as transport;

/// Common imports for running a server.
pub mod prelude {
    pub use crate::{RideBusError, RideBusServer, RideBusServerBuilder};
    pub use ridebus_game::{MatchState, Phase, PlayerId, RoomCode, Rules};
    pub use ridebus_protocol::{ClientMessage, ServerMessage};
    pub use ridebus_room::RoomSettings;
}
