//! Key bindings (normal and vim-style) and the pointer state the phase
//! controller samples each tick. Mouse and keyboard both feed `PointerState`.

use crate::board::Cell;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    Grab,
    NewGame,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl, etc.).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc if no_mod => Action::Quit,
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Char('n') if no_mod => Action::NewGame,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::CursorLeft,
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::CursorRight,
        KeyCode::Up | KeyCode::Char('k') if no_mod => Action::CursorUp,
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::CursorDown,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Grab,
        _ => Action::None,
    }
}

/// What the player phase reads every tick.
pub trait InputSource {
    /// Cell under the pointer or keyboard cursor.
    fn hover(&self) -> Option<Cell>;
    /// Cell grabbed for a swap.
    fn active(&self) -> Option<Cell>;
    fn exchange_requested(&self) -> bool;
    fn reset(&mut self);
    /// Start accepting events (player phase entered).
    fn attach(&mut self);
    /// Stop accepting events; state is kept until `reset`.
    fn detach(&mut self);
}

/// Pointer state shared by the mouse and keyboard producers.
#[derive(Debug, Clone)]
pub struct PointerState {
    width: usize,
    height: usize,
    hover: Option<Cell>,
    active: Option<Cell>,
    exchange: bool,
    /// A release completed a drag before the controller sampled it; the grab
    /// is held and new events are ignored until `reset`.
    latched: bool,
    attached: bool,
    /// Keyboard cursor, remembered across resets.
    cursor: Cell,
}

impl PointerState {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            hover: None,
            active: None,
            exchange: false,
            latched: false,
            attached: false,
            cursor: Cell::new(width / 2, height / 2),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    fn accepts_events(&self) -> bool {
        self.attached && !self.latched
    }

    /// Hover lies off the grabbed cell along one axis, so a swap target exists.
    fn drag_completed(&self) -> bool {
        let (Some(active), Some(hover)) = (self.active, self.hover) else {
            return false;
        };
        self.exchange && active.x.abs_diff(hover.x) != active.y.abs_diff(hover.y)
    }

    /// Mouse moved or dragged; `None` when it left the board.
    pub fn pointer_moved(&mut self, cell: Option<Cell>) {
        if !self.accepts_events() {
            return;
        }
        self.hover = cell;
        if let Some(cell) = cell {
            self.cursor = cell;
        }
    }

    /// Button pressed: grab the cell under the pointer.
    pub fn pointer_pressed(&mut self, cell: Option<Cell>) {
        if !self.accepts_events() {
            return;
        }
        self.hover = cell;
        self.active = cell;
        self.exchange = cell.is_some();
        if let Some(cell) = cell {
            self.cursor = cell;
        }
    }

    /// Button released. A drag that already reached a neighbour stays latched
    /// for the next tick; otherwise the grab is cancelled.
    pub fn pointer_released(&mut self) {
        if !self.accepts_events() {
            return;
        }
        if self.drag_completed() {
            self.latched = true;
            return;
        }
        self.active = None;
        self.exchange = false;
    }

    /// Arrow keys: move the hover cursor, clamped to the board.
    pub fn cursor_moved(&mut self, dx: isize, dy: isize) {
        if !self.accepts_events() {
            return;
        }
        let from = self.hover.unwrap_or(self.cursor);
        let x = from.x.saturating_add_signed(dx).min(self.width.saturating_sub(1));
        let y = from.y.saturating_add_signed(dy).min(self.height.saturating_sub(1));
        self.cursor = Cell::new(x, y);
        self.hover = Some(self.cursor);
    }

    /// Space/Enter: grab the cursor cell, or let go of a grabbed one.
    pub fn cursor_grab(&mut self) {
        if !self.accepts_events() {
            return;
        }
        if self.exchange {
            self.active = None;
            self.exchange = false;
            return;
        }
        let cell = self.hover.unwrap_or(self.cursor);
        self.hover = Some(cell);
        self.active = Some(cell);
        self.exchange = true;
    }
}

impl InputSource for PointerState {
    fn hover(&self) -> Option<Cell> {
        self.hover
    }

    fn active(&self) -> Option<Cell> {
        self.active
    }

    fn exchange_requested(&self) -> bool {
        self.exchange
    }

    fn reset(&mut self) {
        self.hover = None;
        self.active = None;
        self.exchange = false;
        self.latched = false;
    }

    fn attach(&mut self) {
        self.attached = true;
    }

    fn detach(&mut self) {
        self.attached = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press)
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(key_to_action(key(KeyCode::Left)), Action::CursorLeft);
        assert_eq!(key_to_action(key(KeyCode::Char('k'))), Action::CursorUp);
        assert_eq!(key_to_action(key(KeyCode::Char(' '))), Action::Grab);
        assert_eq!(key_to_action(key(KeyCode::Char('p'))), Action::Pause);
        assert_eq!(key_to_action(key(KeyCode::Esc)), Action::Quit);
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('h'), KeyModifiers::ALT)),
            Action::None
        );
    }

    #[test]
    fn test_detached_ignores_events() {
        let mut p = PointerState::new(5, 5);
        p.pointer_pressed(Some(Cell::new(1, 1)));
        p.cursor_moved(1, 0);
        assert_eq!(p.hover(), None);
        assert!(!p.exchange_requested());
    }

    #[test]
    fn test_mouse_grab_and_drag() {
        let mut p = PointerState::new(5, 5);
        p.attach();
        p.pointer_moved(Some(Cell::new(2, 2)));
        p.pointer_pressed(Some(Cell::new(2, 2)));
        p.pointer_moved(Some(Cell::new(3, 2)));
        assert_eq!(p.active(), Some(Cell::new(2, 2)));
        assert_eq!(p.hover(), Some(Cell::new(3, 2)));
        assert!(p.exchange_requested());
        // Released short of a neighbour: the grab is cancelled.
        p.pointer_moved(Some(Cell::new(2, 2)));
        p.pointer_released();
        assert!(!p.exchange_requested());
        assert_eq!(p.active(), None);
    }

    #[test]
    fn test_release_after_drag_latches_until_reset() {
        let mut p = PointerState::new(5, 5);
        p.attach();
        p.pointer_pressed(Some(Cell::new(2, 2)));
        p.pointer_moved(Some(Cell::new(2, 3)));
        p.pointer_released();
        assert!(p.exchange_requested());
        assert_eq!(p.active(), Some(Cell::new(2, 2)));
        // Later events in the same frame cannot overwrite the finished drag.
        p.pointer_moved(Some(Cell::new(4, 4)));
        p.pointer_pressed(Some(Cell::new(0, 0)));
        p.cursor_grab();
        assert_eq!(p.hover(), Some(Cell::new(2, 3)));
        assert_eq!(p.active(), Some(Cell::new(2, 2)));
        p.reset();
        assert!(!p.exchange_requested());
        p.pointer_pressed(Some(Cell::new(0, 0)));
        assert_eq!(p.active(), Some(Cell::new(0, 0)));
    }

    #[test]
    fn test_diagonal_release_does_not_latch() {
        let mut p = PointerState::new(5, 5);
        p.attach();
        p.pointer_pressed(Some(Cell::new(1, 1)));
        p.pointer_moved(Some(Cell::new(2, 2)));
        p.pointer_released();
        assert!(!p.exchange_requested());
        p.pointer_pressed(Some(Cell::new(3, 3)));
        assert_eq!(p.active(), Some(Cell::new(3, 3)));
    }

    #[test]
    fn test_keyboard_cursor_clamps_and_grabs() {
        let mut p = PointerState::new(4, 3);
        p.attach();
        p.cursor_moved(-9, 9);
        assert_eq!(p.hover(), Some(Cell::new(0, 2)));
        p.cursor_grab();
        p.cursor_moved(1, 0);
        assert_eq!(p.active(), Some(Cell::new(0, 2)));
        assert_eq!(p.hover(), Some(Cell::new(1, 2)));
        assert!(p.exchange_requested());
        p.reset();
        assert_eq!(p.hover(), None);
        // The cursor comes back where it was left.
        p.cursor_moved(0, 0);
        assert_eq!(p.hover(), Some(Cell::new(1, 2)));
    }
}
