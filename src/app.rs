//! App: terminal init, main loop, key and mouse routing, session control.

use crate::input::{Action, PointerState, key_to_action};
use crate::phase::PhaseController;
use crate::render::{Renderer, Scene};
use crate::theme::Theme;
use crate::ui::{self, ScoreFlash};
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::DefaultTerminal;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use tracing::info;

const MIN_FRAME_RATE: f64 = 1.0;
const MAX_FRAME_RATE: f64 = 240.0;

pub struct App {
    controller: PhaseController,
    scene: Scene,
    input: PointerState,
    theme: Theme,
    flash: ScoreFlash,
    /// Totals pushed by the controller's score listener.
    scores: Receiver<u64>,
    frame_duration: Duration,
}

impl App {
    pub fn new(args: &Args, config: &GameConfig, theme: Theme) -> Result<Self> {
        let mut controller = PhaseController::new(config)?;
        let (tx, scores) = mpsc::channel();
        controller.on_score_changed(move |score| {
            // The receiver only goes away with the App itself.
            let _ = tx.send(score);
        });
        let rate = args.frame_rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE);
        Ok(Self {
            scene: Scene::new(config.width, config.height, controller.alphabet().len()),
            input: PointerState::new(config.width, config.height),
            controller,
            theme,
            flash: ScoreFlash::default(),
            scores,
            frame_duration: Duration::from_secs_f64(1.0 / rate),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        self.controller.start();
        let result = self.run_loop(&mut terminal);
        self.controller.stop(&mut self.scene, &mut self.input);

        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            self.controller.tick(now, &mut self.scene, &mut self.input);
            if self.scores.try_iter().count() > 0 {
                self.flash.trigger(&self.theme);
            }

            terminal.draw(|f| {
                ui::draw(
                    f,
                    &self.controller,
                    &mut self.scene,
                    &self.theme,
                    &mut self.flash,
                    now,
                );
            })?;

            let timeout = self.frame_duration.saturating_sub(now.elapsed());
            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.apply_action(key_to_action(key), Instant::now()) {
                            info!("quit");
                            return Ok(());
                        }
                    }
                    Event::Mouse(mouse) => self.apply_mouse(mouse),
                    _ => {}
                }
            }
        }
    }

    /// Returns `true` when the app should quit.
    fn apply_action(&mut self, action: Action, now: Instant) -> bool {
        match action {
            Action::Quit => return true,
            Action::Pause if self.controller.is_paused() => self.controller.resume(now),
            Action::Pause => self.controller.pause(now),
            Action::NewGame => {
                self.controller.stop(&mut self.scene, &mut self.input);
                self.controller.start();
            }
            // Board input waits while paused.
            _ if self.controller.is_paused() => {}
            Action::CursorLeft => self.input.cursor_moved(-1, 0),
            Action::CursorRight => self.input.cursor_moved(1, 0),
            Action::CursorUp => self.input.cursor_moved(0, 1),
            Action::CursorDown => self.input.cursor_moved(0, -1),
            Action::Grab => self.input.cursor_grab(),
            Action::None => {}
        }
        false
    }

    fn apply_mouse(&mut self, mouse: MouseEvent) {
        if self.controller.is_paused() {
            return;
        }
        let cell = self.scene.resolve_cell(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.input.pointer_pressed(cell),
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                self.input.pointer_moved(cell);
            }
            MouseEventKind::Up(MouseButton::Left) => self.input.pointer_released(),
            _ => {}
        }
    }
}
