//! The authoritative match state for one room.

use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    Card, GameError, Phase, PlayerId, Pyramid, PyramidCard, RoomCode,
    create_deck, deal_pyramid, derive_seed, shuffle,
};

/// House rules carried with every match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    pub stacking: bool,
    pub bus_penalty: u32,
    pub ace_high: bool,
    /// Reject card plays from anyone but the player whose turn it is.
    pub enforce_turn_order: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            stacking: true,
            bus_penalty: 1,
            ace_high: true,
            enforce_turn_order: true,
        }
    }
}

/// A participant in a match.
///
/// Disconnecting only clears `connected`; the record (hand, counters)
/// lives as long as the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub connected: bool,
    pub hand: Vec<Card>,
    pub sips_given: u32,
    pub sips_received: u32,
}

impl Player {
    fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            connected: true,
            hand: Vec::new(),
            sips_given: 0,
            sips_received: 0,
        }
    }
}

/// One row of the bus: four face-up cards and a hidden fifth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusRow {
    pub visible: Vec<Card>,
    pub hidden: Card,
}

/// Bus-phase bookkeeping. Only the rider queue is filled in so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusState {
    /// Players who must ride, in turn order.
    pub queue: Vec<PlayerId>,
    pub current_rider: Option<PlayerId>,
    pub row: Option<BusRow>,
    /// Index of the next guess within `row`.
    pub position: usize,
}

/// Everything needed to render and continue one room's game.
///
/// This is also the snapshot type: it is serialized whole and pushed to
/// every connection in the room after each change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    pub room_code: RoomCode,
    pub host_id: PlayerId,
    pub rules: Rules,
    /// Serialized in join order.
    pub players: IndexMap<PlayerId, Player>,
    /// Player ids in join order. `current_turn` indexes into this.
    pub turn_order: Vec<PlayerId>,
    pub deck: Vec<Card>,
    pub discard: Vec<Card>,
    pub phase: Phase,
    pub pyramid: Pyramid,
    pub bus: Option<BusState>,
    pub current_turn: usize,
    pub rng_seed: String,
}

impl MatchState {
    /// Creates a match whose seed is derived from the room code and the
    /// current wall-clock time.
    pub fn create(
        room_code: RoomCode,
        host_id: PlayerId,
        pyramid_rows: usize,
        rules: Rules,
    ) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seed = derive_seed(room_code.as_str(), millis);
        Self::with_seed(room_code, host_id, seed, pyramid_rows, rules)
    }

    /// Creates a match from an explicit seed. The whole deal is a pure
    /// function of `seed` and `pyramid_rows`.
    pub fn with_seed(
        room_code: RoomCode,
        host_id: PlayerId,
        seed: String,
        pyramid_rows: usize,
        rules: Rules,
    ) -> Self {
        let shuffled = shuffle(&create_deck(), &seed);
        let (deck, pyramid) = deal_pyramid(shuffled, pyramid_rows);

        tracing::debug!(
            %room_code,
            %host_id,
            rng_seed = %seed,
            "match created"
        );

        Self {
            room_code,
            host_id,
            rules,
            players: IndexMap::new(),
            turn_order: Vec::new(),
            deck,
            discard: Vec::new(),
            phase: Phase::Pyramid,
            pyramid,
            bus: None,
            current_turn: 0,
            rng_seed: seed,
        }
    }

    /// Adds a player, or marks an existing one connected again.
    ///
    /// Returns `true` if the player is new. Turn order is join order and
    /// never changes afterwards.
    pub fn add_player(&mut self, player_id: PlayerId, name: &str) -> bool {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.connected = true;
            return false;
        }
        self.turn_order.push(player_id.clone());
        self.players
            .insert(player_id.clone(), Player::new(player_id, name.to_string()));
        true
    }

    /// Marks a player as having no live connection. Unknown ids are ignored.
    ///
    /// A departing host hands the role to the next connected player in
    /// turn order, and a departing current player passes the turn the
    /// same way. With nobody left connected both stay put.
    pub fn mark_disconnected(&mut self, player_id: &PlayerId) {
        let Some(player) = self.players.get_mut(player_id) else {
            return;
        };
        player.connected = false;
        let Some(seat) = self.seat_of(player_id) else {
            return;
        };

        if self.host_id == *player_id {
            if let Some(next) = self.next_connected_seat(seat) {
                self.host_id = self.turn_order[next].clone();
                tracing::debug!(
                    room_code = %self.room_code,
                    from = %player_id,
                    to = %self.host_id,
                    "host handed over"
                );
            }
        }
        if self.current_turn == seat {
            if let Some(next) = self.next_connected_seat(seat) {
                self.current_turn = next;
            }
        }
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.turn_order.len()
    }

    /// The player whose turn it is, if anyone has joined.
    pub fn current_player(&self) -> Option<&PlayerId> {
        self.turn_order.get(self.current_turn)
    }

    /// Plays `card_id` from `player_id`'s hand onto the discard pile and
    /// passes the turn to the next connected player in join order.
    ///
    /// On any error the state is left exactly as it was.
    pub fn play_card(
        &mut self,
        player_id: &PlayerId,
        card_id: &str,
    ) -> Result<(), GameError> {
        self.expect_phase(Phase::Pyramid)?;

        let seat = self
            .seat_of(player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;

        if self.rules.enforce_turn_order && seat != self.current_turn {
            return Err(GameError::NotYourTurn(player_id.clone()));
        }

        let player = self
            .players
            .get_mut(player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;
        let slot = player
            .hand
            .iter()
            .position(|c| c.id() == card_id)
            .ok_or_else(|| GameError::CardNotInHand {
                player: player_id.clone(),
                card_id: card_id.to_string(),
            })?;

        let card = player.hand.remove(slot);
        self.discard.push(card);
        self.current_turn = self
            .next_connected_seat(seat)
            .unwrap_or((seat + 1) % self.turn_order.len());
        Ok(())
    }

    /// Deals `hand_size` cards to each player, one at a time in turn
    /// order, from the front of the deck. Host only, once per match.
    ///
    /// Stops early if the deck runs out. Returns the number of cards dealt.
    pub fn deal_hands(
        &mut self,
        requester: &PlayerId,
        hand_size: usize,
    ) -> Result<usize, GameError> {
        self.expect_host(requester)?;
        self.expect_phase(Phase::Pyramid)?;
        let dealt_before = self.players.values().any(|p| !p.hand.is_empty());
        if dealt_before || !self.discard.is_empty() {
            return Err(GameError::AlreadyDealt);
        }

        let wanted = hand_size * self.turn_order.len();
        let count = wanted.min(self.deck.len());
        let cards: Vec<Card> = self.deck.drain(..count).collect();
        for (i, card) in cards.into_iter().enumerate() {
            let seat = &self.turn_order[i % self.turn_order.len()];
            if let Some(player) = self.players.get_mut(seat) {
                player.hand.push(card);
            }
        }
        Ok(count)
    }

    /// Turns over the next pyramid card. Host only.
    ///
    /// Revealing the last card advances the match to `BUS`. A pyramid
    /// with nothing left face down (zero rows) advances straight away and
    /// yields `None`.
    pub fn reveal_next(
        &mut self,
        requester: &PlayerId,
    ) -> Result<Option<PyramidCard>, GameError> {
        self.expect_host(requester)?;
        self.expect_phase(Phase::Pyramid)?;
        let card = self.pyramid.reveal_next();
        if self.pyramid.is_fully_revealed() {
            self.advance_phase()?;
        }
        Ok(card)
    }

    /// Moves to the next phase if the current one is complete.
    ///
    /// The `PYRAMID → BUS` gate opens once every pyramid card is face up.
    /// `BUS` has no completion rule yet, so it stays locked.
    pub fn advance_phase(&mut self) -> Result<Phase, GameError> {
        let complete = match self.phase {
            Phase::Lobby => !self.turn_order.is_empty(),
            Phase::Pyramid => self.pyramid.is_fully_revealed(),
            Phase::Bus | Phase::Results => false,
        };
        let next = match self.phase.next() {
            Some(next) if complete => next,
            _ => return Err(GameError::PhaseLocked(self.phase)),
        };

        if next == Phase::Bus {
            self.bus = Some(self.bus_riders());
        }
        tracing::debug!(
            room_code = %self.room_code,
            from = %self.phase,
            to = %next,
            "phase advanced"
        );
        self.phase = next;
        Ok(next)
    }

    /// Whoever holds the most cards rides the bus; ties all ride.
    fn bus_riders(&self) -> BusState {
        let most = self
            .players
            .values()
            .map(|p| p.hand.len())
            .max()
            .unwrap_or(0);
        let queue: Vec<PlayerId> = self
            .turn_order
            .iter()
            .filter(|id| {
                self.players.get(*id).map(|p| p.hand.len()) == Some(most)
            })
            .cloned()
            .collect();
        BusState {
            current_rider: queue.first().cloned(),
            queue,
            row: None,
            position: 0,
        }
    }

    fn seat_of(&self, player_id: &PlayerId) -> Option<usize> {
        self.turn_order.iter().position(|id| id == player_id)
    }

    /// First connected seat after `seat`, wrapping round. Never `seat`.
    fn next_connected_seat(&self, seat: usize) -> Option<usize> {
        let n = self.turn_order.len();
        (1..n).map(|step| (seat + step) % n).find(|&i| {
            self.players
                .get(&self.turn_order[i])
                .is_some_and(|p| p.connected)
        })
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), GameError> {
        if self.phase != expected {
            return Err(GameError::WrongPhase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    fn expect_host(&self, requester: &PlayerId) -> Result<(), GameError> {
        if *requester != self.host_id {
            return Err(GameError::NotHost(requester.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Rank, Suit};

    fn pid(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    fn new_match() -> MatchState {
        MatchState::with_seed(
            RoomCode::new("ABC123").unwrap(),
            pid("p1"),
            "seedA".into(),
            5,
            Rules::default(),
        )
    }

    fn give(state: &mut MatchState, player: &str, cards: &[Card]) {
        let p = state.players.get_mut(&pid(player)).unwrap();
        p.hand.extend_from_slice(cards);
    }

    #[test]
    fn test_with_seed_is_reproducible() {
        let a = new_match();
        let b = new_match();
        assert_eq!(a.deck, b.deck);
        assert_eq!(a.pyramid, b.pyramid);
        assert_eq!(a.rng_seed, "seedA");
    }

    #[test]
    fn test_new_match_initial_fields() {
        let state = new_match();
        assert_eq!(state.phase, Phase::Pyramid);
        assert_eq!(state.current_turn, 0);
        assert!(state.players.is_empty());
        assert!(state.discard.is_empty());
        assert_eq!(state.deck.len(), 37);
        assert_eq!(state.pyramid.filled_count(), 15);
        assert!(state.bus.is_none());
    }

    #[test]
    fn test_create_records_seed_that_reproduces_deal() {
        let state = MatchState::create(
            RoomCode::new("XYZ").unwrap(),
            pid("host"),
            5,
            Rules::default(),
        );
        assert!(state.rng_seed.starts_with("XYZ:"));

        let replay = MatchState::with_seed(
            state.room_code.clone(),
            state.host_id.clone(),
            state.rng_seed.clone(),
            5,
            Rules::default(),
        );
        assert_eq!(replay.deck, state.deck);
        assert_eq!(replay.pyramid, state.pyramid);
    }

    #[test]
    fn test_add_player_is_idempotent_and_reconnects() {
        let mut state = new_match();
        assert!(state.add_player(pid("p1"), "Alice"));
        assert!(state.add_player(pid("p2"), "Bob"));

        state.mark_disconnected(&pid("p1"));
        assert!(!state.player(&pid("p1")).unwrap().connected);
        assert!(!state.add_player(pid("p1"), "Alice again"));

        let alice = state.player(&pid("p1")).unwrap();
        assert!(alice.connected);
        assert_eq!(alice.name, "Alice");
        assert_eq!(state.turn_order, vec![pid("p1"), pid("p2")]);
    }

    #[test]
    fn test_play_card_moves_card_and_advances_turn() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");
        let card = Card::new(Rank::Seven, Suit::Hearts);
        give(&mut state, "p1", &[card.clone()]);

        state.play_card(&pid("p1"), "7H").unwrap();

        assert!(state.player(&pid("p1")).unwrap().hand.is_empty());
        assert_eq!(state.discard.last(), Some(&card));
        assert_eq!(state.current_turn, 1);
        assert_eq!(state.current_player(), Some(&pid("p2")));
    }

    #[test]
    fn test_play_card_wraps_turn_to_first_player() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");
        give(&mut state, "p2", &[Card::new(Rank::Two, Suit::Clubs)]);
        state.current_turn = 1;

        state.play_card(&pid("p2"), "2C").unwrap();
        assert_eq!(state.current_turn, 0);
    }

    #[test]
    fn test_play_card_not_in_hand_changes_nothing() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        give(&mut state, "p1", &[Card::new(Rank::Ace, Suit::Spades)]);
        let before = state.clone();

        let err = state.play_card(&pid("p1"), "KD").unwrap_err();
        assert!(matches!(err, GameError::CardNotInHand { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_play_card_unknown_player_changes_nothing() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        let before = state.clone();

        let err = state.play_card(&pid("ghost"), "AS").unwrap_err();
        assert_eq!(err, GameError::UnknownPlayer(pid("ghost")));
        assert_eq!(state, before);
    }

    #[test]
    fn test_play_card_out_of_turn_is_rejected() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");
        give(&mut state, "p2", &[Card::new(Rank::Ace, Suit::Spades)]);
        let before = state.clone();

        let err = state.play_card(&pid("p2"), "AS").unwrap_err();
        assert_eq!(err, GameError::NotYourTurn(pid("p2")));
        assert_eq!(state, before);
    }

    #[test]
    fn test_play_card_out_of_turn_allowed_when_not_enforced() {
        let mut state = new_match();
        state.rules.enforce_turn_order = false;
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");
        state.add_player(pid("p3"), "Cara");
        give(&mut state, "p2", &[Card::new(Rank::Ace, Suit::Spades)]);

        state.play_card(&pid("p2"), "AS").unwrap();
        // Advances from the actor's seat, not from current_turn.
        assert_eq!(state.current_turn, 2);
    }

    #[test]
    fn test_deal_hands_round_robin_from_deck_front() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");
        let front: Vec<Card> = state.deck[..8].to_vec();

        assert_eq!(state.deal_hands(&pid("p1"), 4).unwrap(), 8);

        let alice = &state.player(&pid("p1")).unwrap().hand;
        let bob = &state.player(&pid("p2")).unwrap().hand;
        assert_eq!(alice[0], front[0]);
        assert_eq!(bob[0], front[1]);
        assert_eq!(alice[1], front[2]);
        assert_eq!(alice.len(), 4);
        assert_eq!(bob.len(), 4);
        assert_eq!(state.deck.len(), 37 - 8);
    }

    #[test]
    fn test_deal_hands_rules() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");

        assert_eq!(
            state.deal_hands(&pid("p2"), 4),
            Err(GameError::NotHost(pid("p2")))
        );
        state.deal_hands(&pid("p1"), 4).unwrap();
        assert_eq!(state.deal_hands(&pid("p1"), 4), Err(GameError::AlreadyDealt));
    }

    #[test]
    fn test_deal_hands_stops_when_deck_runs_out() {
        let mut state = new_match();
        for i in 0..10 {
            state.add_player(pid(&format!("p{i}")), "x");
        }
        state.host_id = pid("p0");
        assert_eq!(state.deal_hands(&pid("p0"), 4).unwrap(), 37);
        assert!(state.deck.is_empty());
    }

    #[test]
    fn test_revealing_every_card_moves_to_bus() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");
        give(&mut state, "p2", &[Card::new(Rank::Ace, Suit::Spades)]);

        for _ in 0..14 {
            state.reveal_next(&pid("p1")).unwrap();
            assert_eq!(state.phase, Phase::Pyramid);
        }
        let last = state.reveal_next(&pid("p1")).unwrap();
        assert_eq!(last.map(|c| c.row), Some(0));

        assert_eq!(state.phase, Phase::Bus);
        let bus = state.bus.as_ref().unwrap();
        assert_eq!(bus.queue, vec![pid("p2")]);
        assert_eq!(bus.current_rider, Some(pid("p2")));

        assert!(matches!(
            state.reveal_next(&pid("p1")),
            Err(GameError::WrongPhase { .. })
        ));
        assert!(matches!(
            state.play_card(&pid("p2"), "AS"),
            Err(GameError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_reveal_is_host_only() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");
        assert_eq!(
            state.reveal_next(&pid("p2")),
            Err(GameError::NotHost(pid("p2")))
        );
    }

    #[test]
    fn test_advance_phase_gates() {
        let mut state = new_match();
        assert_eq!(
            state.advance_phase(),
            Err(GameError::PhaseLocked(Phase::Pyramid))
        );
        state.phase = Phase::Bus;
        assert_eq!(state.advance_phase(), Err(GameError::PhaseLocked(Phase::Bus)));
    }

    #[test]
    fn test_empty_pyramid_reveal_moves_to_bus() {
        let mut state = MatchState::with_seed(
            RoomCode::new("ABC123").unwrap(),
            pid("p1"),
            "seedA".into(),
            0,
            Rules::default(),
        );
        state.add_player(pid("p1"), "Alice");
        assert_eq!(state.phase, Phase::Pyramid);

        assert_eq!(state.reveal_next(&pid("p1")), Ok(None));
        assert_eq!(state.phase, Phase::Bus);
        assert_eq!(state.bus.as_ref().unwrap().queue, vec![pid("p1")]);
    }

    #[test]
    fn test_host_disconnect_hands_host_to_next_connected() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");
        state.add_player(pid("p3"), "Cara");
        state.mark_disconnected(&pid("p2"));

        state.mark_disconnected(&pid("p1"));
        assert_eq!(state.host_id, pid("p3"));
        assert_eq!(state.current_turn, 2);
        state.reveal_next(&pid("p3")).unwrap();
    }

    #[test]
    fn test_last_player_disconnecting_keeps_host_and_turn() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.mark_disconnected(&pid("p1"));
        assert_eq!(state.host_id, pid("p1"));
        assert_eq!(state.current_turn, 0);
    }

    #[test]
    fn test_current_player_disconnect_passes_turn() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");
        state.add_player(pid("p3"), "Cara");
        state.host_id = pid("p3");
        give(&mut state, "p2", &[Card::new(Rank::Ace, Suit::Spades)]);

        state.mark_disconnected(&pid("p1"));
        assert_eq!(state.current_player(), Some(&pid("p2")));
        assert_eq!(state.host_id, pid("p3"));
        state.play_card(&pid("p2"), "AS").unwrap();
        assert_eq!(state.current_player(), Some(&pid("p3")));
    }

    #[test]
    fn test_play_card_skips_disconnected_seats() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        state.add_player(pid("p2"), "Bob");
        state.add_player(pid("p3"), "Cara");
        give(&mut state, "p1", &[Card::new(Rank::Ace, Suit::Spades)]);
        state.mark_disconnected(&pid("p2"));

        state.play_card(&pid("p1"), "AS").unwrap();
        assert_eq!(state.current_player(), Some(&pid("p3")));
    }

    #[test]
    fn test_players_serialize_in_join_order() {
        let mut state = new_match();
        for id in ["zed", "amy", "mo"] {
            state.add_player(pid(id), id);
        }
        let json = serde_json::to_string(&state).unwrap();
        let at = |id: &str| json.find(&format!("\"{id}\":{{")).unwrap();
        assert!(at("zed") < at("amy"));
        assert!(at("amy") < at("mo"));
    }

    #[test]
    fn test_snapshot_has_every_field() {
        let mut state = new_match();
        state.add_player(pid("p1"), "Alice");
        let json = serde_json::to_value(&state).unwrap();

        for key in [
            "roomCode", "hostId", "rules", "players", "turnOrder", "deck",
            "discard", "phase", "pyramid", "bus", "currentTurn", "rngSeed",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json["bus"].is_null());
        assert_eq!(json["phase"], "PYRAMID");
        assert_eq!(json["players"]["p1"]["sipsGiven"], 0);
        assert_eq!(json["rules"]["busPenalty"], 1);
    }
}
