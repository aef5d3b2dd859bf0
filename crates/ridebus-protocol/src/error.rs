//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// None of these are fatal to a connection: the handler logs them and
/// drops the offending frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame was not parseable as any known message shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but its `type` is not one we handle.
    #[error("unrecognized message type")]
    UnknownMessageType,

    /// The message parsed but a field failed validation
    /// (empty player id, bad room code, ...).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
