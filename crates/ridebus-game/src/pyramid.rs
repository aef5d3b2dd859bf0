//! The pyramid: a triangular grid of face-down cards.
//!
//! Row `r` holds `r + 1` cells, so `rows[0]` is the single top card and
//! the last row is the widest. Dealing fills cells row-major (top row
//! first, left to right). Revealing runs the other way round the rows:
//! widest row first, left to right, ending at the top card.

use serde::{Deserialize, Serialize};

use crate::Card;

/// A dealt pyramid card together with its grid position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyramidCard {
    #[serde(flatten)]
    pub card: Card,
    pub row: usize,
    pub col: usize,
}

/// Number of cells in a pyramid with `rows` rows.
/// Saturates instead of overflowing.
pub fn pyramid_size(rows: usize) -> usize {
    rows.saturating_mul(rows.saturating_add(1)) / 2
}

/// The pyramid grid plus per-cell reveal flags and the reveal cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pyramid {
    /// `rows[r][c]`; `None` when the deck ran out before this cell.
    pub rows: Vec<Vec<Option<PyramidCard>>>,
    /// Same shape as `rows`; `true` once a cell has been turned over.
    pub revealed: Vec<Vec<bool>>,
    /// Row of the next cell to reveal, `None` when nothing is left.
    pub current_row: Option<usize>,
    /// Column of the next cell to reveal within `current_row`.
    pub current_index: Option<usize>,
}

impl Pyramid {
    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of cells that actually hold a card.
    pub fn filled_count(&self) -> usize {
        self.rows.iter().flatten().filter(|c| c.is_some()).count()
    }

    pub fn card_at(&self, row: usize, col: usize) -> Option<&PyramidCard> {
        self.rows.get(row)?.get(col)?.as_ref()
    }

    pub fn is_revealed(&self, row: usize, col: usize) -> bool {
        self.revealed
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    /// `true` once every filled cell is face up.
    pub fn is_fully_revealed(&self) -> bool {
        self.current_row.is_none()
    }

    /// Turns over the card under the cursor and moves the cursor on.
    ///
    /// Returns `None` (and changes nothing) when every card is face up.
    pub fn reveal_next(&mut self) -> Option<PyramidCard> {
        let row = self.current_row?;
        let col = self.current_index?;
        self.revealed[row][col] = true;
        let card = self.rows[row][col].clone();
        self.set_cursor(self.next_hidden_after(Some((row, col))));
        card
    }

    /// Cell positions in reveal order: widest row first, left to right.
    fn reveal_order(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.rows.len())
            .rev()
            .flat_map(|row| (0..=row).map(move |col| (row, col)))
    }

    fn next_hidden_after(
        &self,
        after: Option<(usize, usize)>,
    ) -> Option<(usize, usize)> {
        let mut order = self.reveal_order();
        if let Some(pos) = after {
            order.by_ref().find(|p| *p == pos)?;
        }
        order.find(|&(r, c)| {
            self.rows[r][c].is_some() && !self.revealed[r][c]
        })
    }

    fn set_cursor(&mut self, pos: Option<(usize, usize)>) {
        self.current_row = pos.map(|(r, _)| r);
        self.current_index = pos.map(|(_, c)| c);
    }
}

/// Deals a `rows`-row pyramid from the front of `deck`.
///
/// Returns the remaining deck and the pyramid. A deck shorter than
/// [`pyramid_size`] is not an error: dealing stops when the deck runs out
/// and the unfilled cells stay `None`.
pub fn deal_pyramid(deck: Vec<Card>, rows: usize) -> (Vec<Card>, Pyramid) {
    let mut cards = deck.into_iter();
    let mut grid = Vec::with_capacity(rows);
    for row in 0..rows {
        let cells = (0..=row)
            .map(|col| cards.next().map(|card| PyramidCard { card, row, col }))
            .collect();
        grid.push(cells);
    }

    let mut pyramid = Pyramid {
        revealed: (0..rows).map(|row| vec![false; row + 1]).collect(),
        rows: grid,
        current_row: None,
        current_index: None,
    };
    pyramid.set_cursor(pyramid.next_hidden_after(None));

    (cards.collect(), pyramid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_deck, shuffle};

    #[test]
    fn test_deal_five_rows_from_full_deck() {
        let deck = create_deck();
        let (rest, pyramid) = deal_pyramid(deck.clone(), 5);

        let lens: Vec<usize> = pyramid.rows.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![1, 2, 3, 4, 5]);
        assert_eq!(pyramid.filled_count(), 15);
        assert_eq!(rest.len(), 37);
        assert_eq!(rest[..], deck[15..]);
    }

    #[test]
    fn test_deal_is_row_major_from_the_front() {
        let deck = shuffle(&create_deck(), "seedA");
        let (_, pyramid) = deal_pyramid(deck.clone(), 5);

        let dealt: Vec<&Card> =
            pyramid.rows.iter().flatten().flatten().map(|p| &p.card).collect();
        let expected: Vec<&Card> = deck.iter().take(15).collect();
        assert_eq!(dealt, expected);

        let cell = pyramid.card_at(2, 1).unwrap();
        assert_eq!((cell.row, cell.col), (2, 1));
        assert_eq!(cell.card, deck[4]);
    }

    #[test]
    fn test_deal_short_deck_leaves_cells_empty() {
        let deck: Vec<Card> = create_deck().into_iter().take(10).collect();
        let (rest, pyramid) = deal_pyramid(deck, 5);

        assert!(rest.is_empty());
        assert_eq!(pyramid.filled_count(), 10);
        assert_eq!(pyramid.rows[4].iter().filter(|c| c.is_none()).count(), 5);
        assert!(pyramid.rows[3].iter().all(Option::is_some));
    }

    #[test]
    fn test_pyramid_size() {
        assert_eq!(pyramid_size(5), 15);
        assert_eq!(pyramid_size(1), 1);
        assert_eq!(pyramid_size(0), 0);
        assert_eq!(pyramid_size(usize::MAX), usize::MAX / 2);
    }

    #[test]
    fn test_reveal_runs_widest_row_first() {
        let (_, mut pyramid) = deal_pyramid(create_deck(), 3);
        assert_eq!(pyramid.current_row, Some(2));
        assert_eq!(pyramid.current_index, Some(0));

        let order: Vec<(usize, usize)> =
            std::iter::from_fn(|| pyramid.reveal_next())
                .map(|p| (p.row, p.col))
                .collect();
        assert_eq!(order, vec![(2, 0), (2, 1), (2, 2), (1, 0), (1, 1), (0, 0)]);
        assert!(pyramid.is_fully_revealed());
        assert!(pyramid.revealed.iter().flatten().all(|r| *r));
        assert!(pyramid.reveal_next().is_none());
    }

    #[test]
    fn test_reveal_skips_unfilled_cells() {
        // 4 cards into 3 rows: rows 0 and 1 full, row 2 has one card.
        let deck: Vec<Card> = create_deck().into_iter().take(4).collect();
        let (_, mut pyramid) = deal_pyramid(deck, 3);

        let first = pyramid.reveal_next().unwrap();
        assert_eq!((first.row, first.col), (2, 0));
        let second = pyramid.reveal_next().unwrap();
        assert_eq!((second.row, second.col), (1, 0));
        assert!(!pyramid.is_revealed(2, 1));
    }

    #[test]
    fn test_empty_pyramid_is_fully_revealed() {
        let (rest, pyramid) = deal_pyramid(create_deck(), 0);
        assert_eq!(rest.len(), 52);
        assert!(pyramid.is_fully_revealed());
    }

    #[test]
    fn test_pyramid_json_shape() {
        let (_, pyramid) = deal_pyramid(create_deck(), 2);
        let json = serde_json::to_value(&pyramid).unwrap();
        assert_eq!(json["rows"][0][0]["id"], "AC");
        assert_eq!(json["rows"][1][1]["row"], 1);
        assert_eq!(json["rows"][1][1]["col"], 1);
        assert_eq!(json["revealed"][1][0], false);
        assert_eq!(json["currentRow"], 1);
        assert_eq!(json["currentIndex"], 0);
    }
}
