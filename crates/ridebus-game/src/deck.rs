//! Deck construction and deterministic shuffling.
//!
//! A shuffle is a pure function of `(deck, seed)`: the seed string is
//! hashed with BLAKE3 into the 256-bit key of a ChaCha8 generator, and a
//! Fisher–Yates pass runs over a copy of the deck. Same seed, same order,
//! on every platform.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{Card, Rank, Suit};

/// Number of cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// Returns a freshly ordered 52-card deck.
///
/// Suit-major (C, D, H, S), and within each suit A, K, Q, J, 10 … 2.
pub fn create_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card::new(rank, suit));
        }
    }
    deck
}

/// Generator keyed by the full 256-bit digest of `seed`.
fn seeded_rng(seed: &str) -> ChaCha8Rng {
    ChaCha8Rng::from_seed(*blake3::hash(seed.as_bytes()).as_bytes())
}

/// Builds the seed string recorded for a new match.
pub fn derive_seed(room_code: &str, created_at_millis: u128) -> String {
    format!("{room_code}:{created_at_millis}")
}

/// Returns a shuffled copy of `deck`. The input is never touched.
pub fn shuffle(deck: &[Card], seed: &str) -> Vec<Card> {
    let mut rng = seeded_rng(seed);
    let mut copy = deck.to_vec();
    for i in (1..copy.len()).rev() {
        let j = rng.random_range(0..=i);
        copy.swap(i, j);
    }
    copy
}
