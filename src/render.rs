//! Renderer seam: what the phase controller draws, and the display list the
//! terminal UI paints from.

use crate::anim::REST_SCALE;
use crate::board::{Board, Cell, Token};
use ratatui::layout::Rect;
use std::task::Poll;
use thiserror::Error;

/// Terminal columns per board cell.
pub const CELL_WIDTH: u16 = 6;
/// Terminal rows per board cell.
pub const CELL_HEIGHT: u16 = 3;

/// One symbol per gem kind; the alphabet may not be larger than this.
pub const GEM_SYMBOLS: [&str; 12] = [
    "◆", "●", "▲", "■", "★", "♥", "♣", "♠", "✚", "⬟", "✦", "☗",
];

#[derive(Debug, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Holds the number of gem kinds asked for.
    #[error("{0} gem kinds requested; only {max} glyphs are available", max = GEM_SYMBOLS.len())]
    MissingGlyph(usize),
}

/// Drawing surface used by the phase controller once per tick.
///
/// Coordinates are in board cells with `y = 0` at the bottom; fractional
/// values place a token between cells while it moves.
pub trait Renderer {
    fn clear(&mut self);

    fn draw_token(&mut self, x: f32, y: f32, token: Token, scale: f32);

    /// Every populated cell at rest size, except `excluding`.
    fn draw_board(&mut self, board: &Board, excluding: &[Cell]) {
        for gem in board.gems() {
            if !excluding.contains(&gem.cell()) {
                self.draw_token(gem.x as f32, gem.y as f32, gem.token, REST_SCALE);
            }
        }
    }

    /// The tutorial hand showing which way to swipe.
    fn draw_hint_glyph(&mut self, x: f32, y: f32);

    /// Board cell under a pointer position, if any.
    fn resolve_cell(&self, column: u16, row: u16) -> Option<Cell>;

    /// Polled until ready before the first drop of a session.
    fn load_assets(&mut self) -> Poll<Result<(), RenderError>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub x: f32,
    pub y: f32,
    pub token: Token,
    pub scale: f32,
}

/// Display list for one frame, plus where the board landed on screen last time
/// it was painted (for pointer lookup).
#[derive(Debug, Clone)]
pub struct Scene {
    width: usize,
    height: usize,
    kinds: usize,
    sprites: Vec<Sprite>,
    hand: Option<(f32, f32)>,
    board_area: Option<Rect>,
    loaded: bool,
}

impl Scene {
    pub fn new(width: usize, height: usize, kinds: usize) -> Self {
        Self {
            width,
            height,
            kinds,
            sprites: Vec::with_capacity(width * height),
            hand: None,
            board_area: None,
            loaded: false,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn hand(&self) -> Option<(f32, f32)> {
        self.hand
    }

    /// Size of the board in terminal cells, saturating at `u16::MAX`.
    pub fn pixel_size(&self) -> (u16, u16) {
        let span = |cells: usize, per_cell: u16| {
            u16::try_from(cells)
                .ok()
                .and_then(|n| n.checked_mul(per_cell))
                .unwrap_or(u16::MAX)
        };
        (span(self.width, CELL_WIDTH), span(self.height, CELL_HEIGHT))
    }

    /// Recorded by the UI every time the board is painted.
    pub fn set_board_area(&mut self, area: Rect) {
        self.board_area = Some(area);
    }
}

impl Renderer for Scene {
    fn clear(&mut self) {
        self.sprites.clear();
        self.hand = None;
    }

    fn draw_token(&mut self, x: f32, y: f32, token: Token, scale: f32) {
        self.sprites.push(Sprite { x, y, token, scale });
    }

    fn draw_hint_glyph(&mut self, x: f32, y: f32) {
        self.hand = Some((x, y));
    }

    fn resolve_cell(&self, column: u16, row: u16) -> Option<Cell> {
        let area = self.board_area?;
        if column < area.x || row < area.y {
            return None;
        }
        let x = usize::from((column - area.x) / CELL_WIDTH);
        let from_top = usize::from((row - area.y) / CELL_HEIGHT);
        if x >= self.width || from_top >= self.height {
            return None;
        }
        Some(Cell::new(x, self.height - 1 - from_top))
    }

    fn load_assets(&mut self) -> Poll<Result<(), RenderError>> {
        if self.loaded {
            return Poll::Ready(Ok(()));
        }
        if self.kinds > GEM_SYMBOLS.len() {
            return Poll::Ready(Err(RenderError::MissingGlyph(self.kinds)));
        }
        self.loaded = true;
        Poll::Ready(Ok(()))
    }
}
