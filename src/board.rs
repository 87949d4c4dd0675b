//! Board: gem alphabet, grid storage, fall heights and gravity refill.

use crate::ConfigError;
use rand::Rng;
use thiserror::Error;

/// Tries before a clean board without a playable move is accepted anyway.
const CLEAN_FILL_ATTEMPTS: u32 = 64;

/// One symbol of the gem alphabet. Equality defines match grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u8);

impl Token {
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The fixed set of gem names used for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    names: Vec<String>,
}

impl Alphabet {
    /// Needs at least three distinct names, at most 255.
    pub fn new(names: Vec<String>) -> Result<Self, ConfigError> {
        if names.len() < 3 {
            return Err(ConfigError::TooFewGems(names.len()));
        }
        if names.len() > usize::from(u8::MAX) {
            return Err(ConfigError::TooManyGems(names.len()));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ConfigError::DuplicateGem(name.clone()));
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, token: Token) -> &str {
        self.names.get(token.index()).map_or("?", String::as_str)
    }

    pub fn tokens(&self) -> impl Iterator<Item = Token> + '_ {
        (0..self.names.len()).map(|i| Token(i as u8))
    }
}

/// Grid coordinate; `y = 0` is the bottom row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// A token at a position: hint endpoints, swap partners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gem {
    pub x: usize,
    pub y: usize,
    pub token: Token,
}

impl Gem {
    pub const fn cell(&self) -> Cell {
        Cell { x: self.x, y: self.y }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("match scan started on empty cell ({x}, {y})")]
    EmptyCell { x: usize, y: usize },
}

/// Flat `y * width + x` grid of optional tokens plus the per-cell fall heights
/// produced by the last gravity pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    kinds: u8,
    cells: Vec<Option<Token>>,
    fall_heights: Vec<u32>,
}

impl Board {
    /// Empty board. `kinds` is the alphabet size used when refilling.
    pub fn new(width: usize, height: usize, kinds: usize) -> Self {
        let area = width * height;
        Self {
            width,
            height,
            kinds: kinds.min(usize::from(u8::MAX)) as u8,
            cells: vec![None; area],
            fall_heights: vec![0; area],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    #[inline]
    pub fn cell_at(&self, index: usize) -> Cell {
        Cell::new(index % self.width, index / self.width)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Token> {
        self.index(x, y).and_then(|i| self.cells[i])
    }

    #[inline]
    pub fn token_at(&self, cell: Cell) -> Option<Token> {
        self.get(cell.x, cell.y)
    }

    /// Out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, token: Option<Token>) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = token;
        }
    }

    /// Exchanges two cells without any rule check.
    pub fn swap(&mut self, a: Cell, b: Cell) {
        if let (Some(i), Some(j)) = (self.index(a.x, a.y), self.index(b.x, b.y)) {
            self.cells.swap(i, j);
        }
    }

    pub fn gem(&self, cell: Cell) -> Option<Gem> {
        self.token_at(cell).map(|token| Gem {
            x: cell.x,
            y: cell.y,
            token,
        })
    }

    /// Rows still to travel for the token now at `(x, y)`; 0 when settled.
    #[inline]
    pub fn fall_height(&self, x: usize, y: usize) -> u32 {
        self.index(x, y)
            .and_then(|i| self.fall_heights.get(i))
            .copied()
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
        self.fall_heights.fill(0);
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// No empty cell below a filled one in any column.
    pub fn is_settled(&self) -> bool {
        (0..self.width).all(|x| {
            let filled = (0..self.height)
                .take_while(|&y| self.get(x, y).is_some())
                .count();
            (filled..self.height).all(|y| self.get(x, y).is_none())
        })
    }

    /// Populated cells in index order.
    pub fn gems(&self) -> impl Iterator<Item = Gem> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, token)| {
            token.map(|token| Gem {
                x: i % self.width,
                y: i / self.width,
                token,
            })
        })
    }

    fn random_token<R: Rng + ?Sized>(&self, rng: &mut R) -> Token {
        Token(rng.gen_range(0..self.kinds.max(1)))
    }

    /// Compacts every column downwards and refills the gaps.
    ///
    /// A second block of `width * height` random tokens is stacked above the
    /// visible grid before compaction, so every emptied cell receives a token.
    /// The distance each token travels is recorded at its destination.
    pub fn resolve_gravity<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &[u32] {
        let (w, h) = (self.width, self.height);
        let area = self.area();
        let mut buffer = Vec::with_capacity(area * 2);
        buffer.extend_from_slice(&self.cells);
        for _ in 0..area {
            buffer.push(Some(self.random_token(rng)));
        }
        self.fall_heights = vec![0; area];

        for x in 0..w {
            let mut settled = (0..h).take_while(|&y| buffer[y * w + x].is_some()).count();
            if settled == h {
                continue;
            }
            let mut distance = 1;
            while settled < h {
                let source = (settled + distance) * w + x;
                if source >= buffer.len() {
                    break;
                }
                match buffer[source].take() {
                    Some(token) => {
                        buffer[settled * w + x] = Some(token);
                        self.fall_heights[settled * w + x] = distance as u32;
                        settled += 1;
                    }
                    None => distance += 1,
                }
            }
        }

        buffer.truncate(area);
        self.cells = buffer;
        &self.fall_heights
    }

    /// Fills the whole board with no run of three and at least one playable
    /// swap; every token starts a full board height above its cell.
    ///
    /// Returns `false` if no playable layout turned up within the attempt
    /// budget; the last layout is kept regardless.
    pub fn fill_clean<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let mut playable = false;
        for _ in 0..CLEAN_FILL_ATTEMPTS {
            self.fill_without_runs(rng);
            if crate::oracle::find_possible_move(self, rng).is_some() {
                playable = true;
                break;
            }
        }
        self.fall_heights = vec![self.height as u32; self.area()];
        playable
    }

    fn fill_without_runs<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut candidates = Vec::with_capacity(usize::from(self.kinds));
        for y in 0..self.height {
            for x in 0..self.width {
                let left = (x >= 2)
                    .then(|| self.get(x - 1, y))
                    .flatten()
                    .filter(|&t| self.get(x - 2, y) == Some(t));
                let below = (y >= 2)
                    .then(|| self.get(x, y - 1))
                    .flatten()
                    .filter(|&t| self.get(x, y - 2) == Some(t));
                candidates.clear();
                candidates.extend(
                    (0..self.kinds)
                        .map(Token)
                        .filter(|&t| Some(t) != left && Some(t) != below),
                );
                let token = if candidates.is_empty() {
                    self.random_token(rng)
                } else {
                    candidates[rng.gen_range(0..candidates.len())]
                };
                self.set(x, y, Some(token));
            }
        }
    }

    /// Test helper: rows are given top first, `A`.. are tokens, `.` is empty.
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        let kinds = rows
            .iter()
            .flat_map(|r| r.bytes())
            .filter(u8::is_ascii_uppercase)
            .map(|b| usize::from(b - b'A') + 1)
            .max()
            .unwrap_or(0)
            .max(3);
        let mut board = Self::new(width, height, kinds);
        for (r, row) in rows.iter().enumerate() {
            let y = height - 1 - r;
            for (x, b) in row.bytes().enumerate() {
                let token = b.is_ascii_uppercase().then(|| Token(b - b'A'));
                board.set(x, y, token);
            }
        }
        board
    }
}
