//! Wire protocol for Ride the Bus.
//!
//! Every frame is a JSON object whose `type` field names the message:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`]) — what travels on
//!   the wire, plus [`Request`], the validated form of a client message.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how messages become
//!   text frames and back.
//! - **Errors** ([`ProtocolError`]) — malformed, unknown, or invalid input.
//!
//! ```text
//! Transport (frames) → Protocol (ClientMessage → Request) → Room
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, Request, ServerMessage, error_code};
