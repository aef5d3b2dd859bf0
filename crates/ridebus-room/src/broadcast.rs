//! Snapshot serialization and best-effort delivery.

use std::sync::Arc;

use ridebus_game::MatchState;
use ridebus_protocol::{Codec, JsonCodec, ServerMessage};
use tokio::sync::mpsc;

/// An encoded text frame, shared by every recipient of one broadcast.
pub type Frame = Arc<str>;

/// Channel to one connection's writer task.
///
/// The connection handler owns the receiving end; once the socket is
/// gone the receiver is dropped and the sender reports closed.
pub type OutboundSender = mpsc::UnboundedSender<Frame>;

/// Serializes server messages once and hands the frame to each
/// connection's writer.
///
/// Delivery is best-effort per connection: a closed connection is skipped
/// and never blocks the others.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    codec: JsonCodec,
}

impl Broadcaster {
    pub fn new(codec: JsonCodec) -> Self {
        Self { codec }
    }

    /// Encodes a full `MATCH_STATE` snapshot.
    pub fn snapshot_frame(&self, state: &MatchState) -> Option<Frame> {
        self.frame(&ServerMessage::MatchState {
            match_state: state.clone(),
        })
    }

    /// Encodes any server message.
    pub fn frame(&self, msg: &ServerMessage) -> Option<Frame> {
        match self.codec.encode(msg) {
            Ok(text) => Some(Arc::from(text)),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode server message");
                None
            }
        }
    }

    /// Sends `frame` to one connection. Returns `false` if it was closed.
    pub fn send_to(&self, outbound: &OutboundSender, frame: &Frame) -> bool {
        if outbound.is_closed() {
            return false;
        }
        outbound.send(Arc::clone(frame)).is_ok()
    }

    /// Sends `frame` to every connection. Returns how many accepted it.
    pub fn broadcast<'a>(
        &self,
        recipients: impl IntoIterator<Item = &'a OutboundSender>,
        frame: &Frame,
    ) -> usize {
        recipients
            .into_iter()
            .filter(|outbound| self.send_to(outbound, frame))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use ridebus_game::{PlayerId, RoomCode, Rules};

    use super::*;

    fn state() -> MatchState {
        MatchState::with_seed(
            RoomCode::new("ABC123").unwrap(),
            PlayerId::from("p1"),
            "seedA".into(),
            5,
            Rules::default(),
        )
    }

    #[test]
    fn test_snapshot_frame_is_match_state_json() {
        let frame = Broadcaster::default().snapshot_frame(&state()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "MATCH_STATE");
        assert_eq!(json["matchState"]["roomCode"], "ABC123");
        assert_eq!(json["matchState"]["deck"].as_array().unwrap().len(), 37);
    }

    #[test]
    fn test_broadcast_skips_closed_connections() {
        let broadcaster = Broadcaster::default();
        let (open_tx, mut open_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = mpsc::unbounded_channel::<Frame>();
        drop(closed_rx);
        let (other_tx, mut other_rx) = mpsc::unbounded_channel();

        let frame = broadcaster.snapshot_frame(&state()).unwrap();
        let delivered =
            broadcaster.broadcast([&open_tx, &closed_tx, &other_tx], &frame);

        assert_eq!(delivered, 2);
        assert_eq!(open_rx.try_recv().unwrap(), frame);
        assert_eq!(other_rx.try_recv().unwrap(), frame);
    }
}
