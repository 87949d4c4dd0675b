//! Move oracle: proves a board playable by finding one matching swap.

use crate::board::{Board, Cell, Gem};
use crate::matches::find_matches;
use rand::Rng;
use rand::seq::SliceRandom;

/// Axis of a candidate swap; each variant steps to its neighbour by a fixed
/// index offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Right neighbour, offset 1.
    Horizontal,
    /// Upper neighbour, offset `width`.
    Vertical,
}

impl Direction {
    pub const fn offset(self, width: usize) -> usize {
        match self {
            Self::Horizontal => 1,
            Self::Vertical => width,
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    /// Index of the neighbour of `index`, or `None` on the last column/row.
    fn neighbour(self, board: &Board, index: usize) -> Option<usize> {
        let cell = board.cell_at(index);
        let edge = match self {
            Self::Horizontal => cell.x + 1 >= board.width(),
            Self::Vertical => cell.y + 1 >= board.height(),
        };
        (!edge).then(|| index + self.offset(board.width()))
    }
}

/// Would exchanging `a` and `b` produce at least one run?
pub fn would_match(board: &Board, a: Cell, b: Cell) -> bool {
    let mut scratch = board.clone();
    scratch.swap(a, b);
    find_matches(&scratch).is_ok_and(|m| !m.is_empty())
}

/// Searches every single adjacent swap in random order and returns the first
/// one that produces a match, without touching `board`.
///
/// The first gem of the pair is the one whose token lands inside the match
/// once the swap is made; the hint animation moves it toward the second.
/// `None` means no swap on the whole board matches.
pub fn find_possible_move<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Option<(Gem, Gem)> {
    let mut order: Vec<usize> = (0..board.area()).collect();
    order.shuffle(rng);
    let primary = if rng.gen_bool(0.5) {
        Direction::Horizontal
    } else {
        Direction::Vertical
    };

    let mut scratch = board.clone();
    for direction in [primary, primary.other()] {
        for &index in &order {
            let Some(other) = direction.neighbour(board, index) else {
                continue;
            };
            let (a, b) = (board.cell_at(index), board.cell_at(other));
            scratch.swap(a, b);
            let found = find_matches(&scratch).ok().filter(|m| !m.is_empty());
            scratch.swap(a, b);
            let Some(matched) = found else {
                continue;
            };
            let (Some(gem_a), Some(gem_b)) = (board.gem(a), board.gem(b)) else {
                continue;
            };
            // The token from `a` now sits at `b`.
            return Some(if matched.contains(b) {
                (gem_a, gem_b)
            } else {
                (gem_b, gem_a)
            });
        }
    }
    None
}
