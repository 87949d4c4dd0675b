//! Layout and drawing: board sprites, tutorial hand, sidebar, pause and stopped overlays.

use crate::board::Alphabet;
use crate::phase::{PhaseController, PhaseKind};
use crate::render::{CELL_HEIGHT, CELL_WIDTH, GEM_SYMBOLS, Scene, Sprite};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

const SIDEBAR_WIDTH: u16 = 24;

/// Score text fades from the title colour back to normal after every award.
const SCORE_FLASH_MS: u32 = 500;

const HAND_GLYPH: &str = "☝";

/// TachyonFX flash on the score panel, restarted on every score change.
#[derive(Default)]
pub struct ScoreFlash {
    effect: Option<Effect>,
    last_process: Option<Instant>,
}

impl ScoreFlash {
    pub fn trigger(&mut self, theme: &Theme) {
        self.effect = Some(fx::fade_from_fg(
            theme.title,
            (SCORE_FLASH_MS, Interpolation::Linear),
        ));
        self.last_process = None;
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, now: Instant) {
        let Some(effect) = self.effect.as_mut() else {
            return;
        };
        let delta = self
            .last_process
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default();
        let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
        self.last_process = Some(now);
        frame.render_effect(effect, area, TfxDuration::from_millis(delta_ms));
        if effect.done() {
            self.effect = None;
            self.last_process = None;
        }
    }
}

/// Largest board, in gems, whose frame and sidebar fit a `cols`x`rows`
/// terminal. Never below the minimum board side.
pub fn board_fit(cols: u16, rows: u16) -> (usize, usize) {
    let w = cols.saturating_sub(2 + SIDEBAR_WIDTH) / CELL_WIDTH;
    let h = rows.saturating_sub(2) / CELL_HEIGHT;
    (
        usize::from(w).max(crate::MIN_BOARD_SIDE),
        usize::from(h).max(crate::MIN_BOARD_SIDE),
    )
}

/// Draws one frame and records where the board landed in `scene`, so pointer
/// positions can be resolved to cells.
pub fn draw(
    frame: &mut Frame,
    game: &PhaseController,
    scene: &mut Scene,
    theme: &Theme,
    flash: &mut ScoreFlash,
    now: Instant,
) {
    let area = frame.area();
    let (bw, bh) = scene.pixel_size();
    let (board_w, board_h) = (bw.saturating_add(2), bh.saturating_add(2));

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(board_w.saturating_add(SIDEBAR_WIDTH)),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(board_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(board_w), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let (board_outer, sidebar_area) = (inner[0], inner[1]);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(Span::styled(" gemfall ", Style::default().fg(theme.title))))
        .border_style(Style::default().fg(theme.div_line))
        .style(Style::default().bg(theme.bg));
    let board_area = block.inner(board_outer);
    block.render(board_outer, frame.buffer_mut());
    scene.set_board_area(board_area);

    let rows = scene.height();
    let buf = frame.buffer_mut();
    for sprite in scene.sprites() {
        paint_sprite(buf, board_area, rows, sprite, theme);
    }
    if let Some((x, y)) = scene.hand() {
        paint_hand(buf, board_area, rows, (x, y), theme);
    }

    let score_area = draw_sidebar(frame, game, theme, sidebar_area);
    flash.render(frame, score_area, now);

    if game.is_paused() {
        draw_overlay(frame, theme, board_outer, " Paused ", " P Resume   Q Quit ");
    } else if !game.is_running() {
        draw_overlay(frame, theme, board_outer, " Game stopped ", " N New game   Q Quit ");
    }
}

/// Terminal coordinates of a board position's centre; `y = 0` is the bottom row.
fn cell_center(board: Rect, rows: usize, x: f32, y: f32) -> (f32, f32) {
    (
        f32::from(board.x) + (x + 0.5) * f32::from(CELL_WIDTH),
        f32::from(board.y) + (rows as f32 - 0.5 - y) * f32::from(CELL_HEIGHT),
    )
}

/// Fills the scaled gem rectangle, clipped to the board, and puts its glyph in
/// the middle. One column is left as a gap between neighbours at rest size.
fn paint_sprite(buf: &mut Buffer, board: Rect, rows: usize, sprite: &Sprite, theme: &Theme) {
    if sprite.scale <= 0.0 {
        return;
    }
    let color = theme.gem_color(sprite.token);
    let (cx, cy) = cell_center(board, rows, sprite.x, sprite.y);
    let half_w = sprite.scale * f32::from(CELL_WIDTH - 1) / 2.0;
    let half_h = sprite.scale * f32::from(CELL_HEIGHT) / 2.0;

    for row in board.top()..board.bottom() {
        if (f32::from(row) + 0.5 - cy).abs() > half_h {
            continue;
        }
        for col in board.left()..board.right() {
            if (f32::from(col) + 0.5 - cx).abs() <= half_w {
                buf[(col, row)].set_bg(color);
            }
        }
    }

    let (gx, gy) = (cx.floor(), cy.floor());
    if gx >= f32::from(board.left())
        && gx < f32::from(board.right())
        && gy >= f32::from(board.top())
        && gy < f32::from(board.bottom())
    {
        let symbol = GEM_SYMBOLS[sprite.token.index() % GEM_SYMBOLS.len()];
        buf[(gx as u16, gy as u16)]
            .set_symbol(symbol)
            .set_style(Style::default().fg(theme.bg).bg(color));
    }
}

/// The hand sits just under the gem it points at.
fn paint_hand(buf: &mut Buffer, board: Rect, rows: usize, (x, y): (f32, f32), theme: &Theme) {
    let (cx, cy) = cell_center(board, rows, x, y);
    let (hx, hy) = (cx.floor(), cy.floor() + 1.0);
    if hx < f32::from(board.left())
        || hx >= f32::from(board.right())
        || hy < f32::from(board.top())
        || hy >= f32::from(board.bottom())
    {
        return;
    }
    buf[(hx as u16, hy as u16)]
        .set_symbol(HAND_GLYPH)
        .set_fg(theme.title);
}

fn phase_label(game: &PhaseController) -> &'static str {
    match game.phase() {
        None => "Stopped",
        Some(PhaseKind::Loading) => "Loading",
        Some(PhaseKind::Drop) => "Gems falling",
        Some(PhaseKind::Explosion) => "Match!",
        Some(PhaseKind::Player) => "Your move",
        Some(PhaseKind::Swap) => "Swapping",
        Some(PhaseKind::Restart) => "No moves, reshuffling",
    }
}

/// Sidebar panels; returns the score panel area for the flash effect.
fn draw_sidebar(frame: &mut Frame, game: &PhaseController, theme: &Theme, area: Rect) -> Rect {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line);
    let alphabet = game.alphabet();
    let legend_rows = (alphabet.len() as u16).min(area.height.saturating_sub(12));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(legend_rows + 2),
            Constraint::Min(0),
        ])
        .split(area);

    let panel = |title: &'static str| {
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Line::from(Span::styled(title, title_style)))
    };

    Paragraph::new(Line::from(Span::styled(game.score().to_string(), fg_style.bold())))
        .alignment(Alignment::Right)
        .block(panel(" Score "))
        .render(chunks[0], frame.buffer_mut());

    let status = if game.is_paused() {
        "Paused"
    } else {
        phase_label(game)
    };
    Paragraph::new(Line::from(Span::styled(status, fg_style)))
        .block(panel(" Status "))
        .render(chunks[1], frame.buffer_mut());

    Paragraph::new(legend_lines(alphabet, theme))
        .block(panel(" Gems "))
        .render(chunks[2], frame.buffer_mut());

    let controls = vec![
        Line::from(Span::styled("Drag a gem to swap", dim_style)),
        Line::from(Span::styled("Arrows/hjkl  Cursor", dim_style)),
        Line::from(Span::styled("Space/Enter  Grab", dim_style)),
        Line::from(Span::styled("N New  P Pause  Q Quit", dim_style)),
    ];
    Paragraph::new(controls)
        .block(panel(" Controls "))
        .render(chunks[3], frame.buffer_mut());

    chunks[0]
}

fn legend_lines<'a>(alphabet: &'a Alphabet, theme: &Theme) -> Vec<Line<'a>> {
    alphabet
        .tokens()
        .map(|token| {
            let color = theme.gem_color(token);
            let symbol = GEM_SYMBOLS[token.index() % GEM_SYMBOLS.len()];
            Line::from(vec![
                Span::styled(format!(" {symbol} "), Style::default().fg(Color::Black).bg(color)),
                Span::styled(format!(" {}", alphabet.name(token)), Style::default().fg(theme.main_fg)),
            ])
        })
        .collect()
}

fn draw_overlay(frame: &mut Frame, theme: &Theme, area: Rect, title: &str, hint: &str) {
    let popup_w = 26u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title.to_string(),
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(Span::styled(hint.to_string(), Style::default().fg(theme.main_fg))),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line))
                .style(Style::default().bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Token;

    fn painted(buf: &Buffer, area: Rect, color: Color) -> usize {
        let mut n = 0;
        for row in area.top()..area.bottom() {
            for col in area.left()..area.right() {
                if buf[(col, row)].bg == color {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_board_fit_leaves_room_for_frame_and_sidebar() {
        // 80x24: (80 - 26) / 6 = 9 columns, (24 - 2) / 3 = 7 rows.
        assert_eq!(board_fit(80, 24), (9, 7));
        assert_eq!(board_fit(10, 5), (3, 3));
        let (w, h) = board_fit(u16::MAX, u16::MAX);
        assert!(w * usize::from(CELL_WIDTH) + 2 + usize::from(SIDEBAR_WIDTH) <= usize::from(u16::MAX));
        assert!(h * usize::from(CELL_HEIGHT) + 2 <= usize::from(u16::MAX));
    }

    #[test]
    fn test_sprite_at_rest_leaves_gap() {
        let theme = Theme::default();
        let board = Rect::new(0, 0, CELL_WIDTH * 2, CELL_HEIGHT * 2);
        let mut buf = Buffer::empty(board);
        let sprite = Sprite {
            x: 0.0,
            y: 1.0,
            token: Token::new(2),
            scale: 0.9,
        };
        paint_sprite(&mut buf, board, 2, &sprite, &theme);
        let color = theme.gem_color(Token::new(2));
        // Four columns by three rows, in the top-left cell.
        assert_eq!(painted(&buf, board, color), 12);
        assert_eq!(buf[(1, 0)].bg, color);
        assert_ne!(buf[(0, 0)].bg, color);
        assert_eq!(buf[(3, 1)].symbol(), GEM_SYMBOLS[2]);
    }

    #[test]
    fn test_sprite_above_board_is_clipped() {
        let theme = Theme::default();
        let board = Rect::new(0, 0, CELL_WIDTH * 2, CELL_HEIGHT * 2);
        let mut buf = Buffer::empty(board);
        let sprite = Sprite {
            x: 1.0,
            y: 3.0,
            token: Token::new(0),
            scale: 0.9,
        };
        paint_sprite(&mut buf, board, 2, &sprite, &theme);
        assert_eq!(painted(&buf, board, theme.gem_color(Token::new(0))), 0);
    }

    #[test]
    fn test_shrunk_sprite_paints_less() {
        let theme = Theme::default();
        let board = Rect::new(0, 0, CELL_WIDTH, CELL_HEIGHT);
        let color = theme.gem_color(Token::new(1));
        let paint = |scale| {
            let mut buf = Buffer::empty(board);
            let sprite = Sprite {
                x: 0.0,
                y: 0.0,
                token: Token::new(1),
                scale,
            };
            paint_sprite(&mut buf, board, 1, &sprite, &theme);
            painted(&buf, board, color)
        };
        assert!(paint(0.3) < paint(0.9));
        assert_eq!(paint(0.0), 0);
    }
}
