//! Phase controller: drop, explosion, player, swap and restart phases, one
//! step per tick, with pause/resume of the pending step.

use crate::anim::{self, HOVER_SCALE, REST_SCALE};
use crate::board::{Alphabet, Board, Cell, Gem};
use crate::input::InputSource;
use crate::matches::{self, MatchSet};
use crate::oracle;
use crate::render::Renderer;
use crate::{ConfigError, GameConfig};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::task::Poll;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Score for every cell removed by an explosion.
pub const POINTS_PER_GEM: u64 = 100;

/// Delay, in drop steps, before the first token starts falling; grows with
/// every row so lower rows lead.
const DROP_STAGGER: f32 = 0.1;

/// Animation lengths and the inactivity threshold for the hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Time for a token to fall one row.
    pub drop_step: Duration,
    pub explosion: Duration,
    pub settle: Duration,
    pub reject: Duration,
    pub restart: Duration,
    /// Period of the tutorial hand gesture.
    pub hand: Duration,
    /// Period of the hint pulse.
    pub pulse: Duration,
    /// Player inactivity before the hint pulse starts.
    pub help_after: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            drop_step: Duration::from_millis(150),
            explosion: Duration::from_millis(300),
            settle: Duration::from_millis(300),
            reject: Duration::from_millis(600),
            restart: Duration::from_millis(300),
            hand: Duration::from_millis(1200),
            pulse: Duration::from_millis(600),
            help_after: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Loading,
    Drop,
    Explosion,
    Player,
    Swap,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapMode {
    /// The swap matches; tokens settle into their new cells.
    Settle,
    /// No match; tokens bump into each other and go back.
    Reject,
}

impl SwapMode {
    fn length(self, timings: &Timings) -> Duration {
        match self {
            Self::Settle => timings.settle,
            Self::Reject => timings.reject,
        }
    }

    fn curve(self, t: f32) -> (f32, f32) {
        match self {
            Self::Settle => anim::settle_curve(t),
            Self::Reject => anim::reject_curve(t),
        }
    }
}

/// The pending per-tick continuation with its phase-local timers.
/// Timers are `None` until the step's first tick.
#[derive(Debug, Clone)]
enum Step {
    Loading {
        preseeded: bool,
    },
    Drop {
        started: Option<Instant>,
    },
    Explosion {
        matches: MatchSet,
        started: Option<Instant>,
    },
    Player {
        hint: (Gem, Gem),
        entered: Option<Instant>,
        help_since: Option<Instant>,
    },
    Swap {
        active: Gem,
        target: Gem,
        mode: SwapMode,
        started: Option<Instant>,
    },
    Restart {
        started: Option<Instant>,
    },
}

impl Step {
    const fn kind(&self) -> PhaseKind {
        match self {
            Self::Loading { .. } => PhaseKind::Loading,
            Self::Drop { .. } => PhaseKind::Drop,
            Self::Explosion { .. } => PhaseKind::Explosion,
            Self::Player { .. } => PhaseKind::Player,
            Self::Swap { .. } => PhaseKind::Swap,
            Self::Restart { .. } => PhaseKind::Restart,
        }
    }

    /// Moves every started timer forward, as if the pause never happened.
    fn shift(&mut self, by: Duration) {
        let timers: [Option<&mut Instant>; 2] = match self {
            Self::Loading { .. } => [None, None],
            Self::Drop { started }
            | Self::Explosion { started, .. }
            | Self::Swap { started, .. }
            | Self::Restart { started } => [started.as_mut(), None],
            Self::Player {
                entered,
                help_since,
                ..
            } => [entered.as_mut(), help_since.as_mut()],
        };
        for timer in timers.into_iter().flatten() {
            *timer += by;
        }
    }
}

#[derive(Debug, Clone)]
enum Schedule {
    /// Stopped: no step runs.
    Idle,
    Pending(Step),
    /// Paused: the captured step runs again after `resume`.
    Suspended { step: Step, since: Instant },
}

/// Owns the board and drives it through the game phases.
pub struct PhaseController {
    board: Board,
    alphabet: Alphabet,
    timings: Timings,
    clean_start: bool,
    rng: SmallRng,
    schedule: Schedule,
    score: u64,
    /// The tutorial hand shows until the first swap attempt of a session.
    first_player_phase: bool,
    score_listener: Option<Box<dyn FnMut(u64)>>,
}

impl PhaseController {
    pub fn new(config: &GameConfig) -> Result<Self, ConfigError> {
        let alphabet = config.validate()?;
        let rng = config
            .seed
            .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        Ok(Self {
            board: Board::new(config.width, config.height, alphabet.len()),
            alphabet,
            timings: config.timings,
            clean_start: config.clean_start,
            rng,
            schedule: Schedule::Idle,
            score: 0,
            first_player_phase: true,
            score_listener: None,
        })
    }

    /// Called with the new total every time the score changes.
    pub fn on_score_changed(&mut self, listener: impl FnMut(u64) + 'static) {
        self.score_listener = Some(Box::new(listener));
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Current phase, also while paused; `None` when stopped.
    pub fn phase(&self) -> Option<PhaseKind> {
        match &self.schedule {
            Schedule::Idle => None,
            Schedule::Pending(step) | Schedule::Suspended { step, .. } => Some(step.kind()),
        }
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.schedule, Schedule::Idle)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.schedule, Schedule::Suspended { .. })
    }

    /// Begins a session. No-op while one is running or paused.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.first_player_phase = true;
        let preseeded = if self.clean_start {
            if !self.board.fill_clean(&mut self.rng) {
                warn!("no playable clean layout found; first player phase will reshuffle");
            }
            true
        } else {
            false
        };
        info!(
            width = self.board.width(),
            height = self.board.height(),
            gems = self.alphabet.len(),
            preseeded,
            "session started"
        );
        self.schedule = Schedule::Pending(Step::Loading { preseeded });
    }

    /// Ends the session: pending steps are dropped, the board and score reset.
    pub fn stop(&mut self, renderer: &mut dyn Renderer, input: &mut dyn InputSource) {
        self.schedule = Schedule::Idle;
        self.board = Board::new(self.board.width(), self.board.height(), self.alphabet.len());
        self.first_player_phase = true;
        input.reset();
        input.detach();
        renderer.clear();
        self.score = 0;
        self.notify_score();
        info!("session stopped");
    }

    /// Captures the pending step; ticks are ignored until `resume`.
    pub fn pause(&mut self, now: Instant) {
        match std::mem::replace(&mut self.schedule, Schedule::Idle) {
            Schedule::Pending(step) => {
                debug!(phase = ?step.kind(), "paused");
                self.schedule = Schedule::Suspended { step, since: now };
            }
            other => self.schedule = other,
        }
    }

    /// Reinstalls the captured step with its timers moved past the pause.
    /// No-op unless paused.
    pub fn resume(&mut self, now: Instant) {
        match std::mem::replace(&mut self.schedule, Schedule::Idle) {
            Schedule::Suspended { mut step, since } => {
                let paused_for = now.saturating_duration_since(since);
                step.shift(paused_for);
                debug!(phase = ?step.kind(), ?paused_for, "resumed");
                self.schedule = Schedule::Pending(step);
            }
            other => self.schedule = other,
        }
    }

    /// Runs exactly one step of the pending phase.
    pub fn tick(&mut self, now: Instant, renderer: &mut dyn Renderer, input: &mut dyn InputSource) {
        let step = match std::mem::replace(&mut self.schedule, Schedule::Idle) {
            Schedule::Pending(step) => step,
            other => {
                self.schedule = other;
                return;
            }
        };
        match step {
            Step::Loading { preseeded } => self.tick_loading(preseeded, renderer),
            Step::Drop { started } => {
                self.tick_drop(started.unwrap_or(now), now, renderer, input);
            }
            Step::Explosion { matches, started } => {
                self.tick_explosion(matches, started.unwrap_or(now), now, renderer);
            }
            Step::Player {
                hint,
                entered,
                help_since,
            } => self.tick_player(hint, entered.unwrap_or(now), help_since, now, renderer, input),
            Step::Swap {
                active,
                target,
                mode,
                started,
            } => self.tick_swap(
                (active, target),
                mode,
                started.unwrap_or(now),
                now,
                renderer,
                input,
            ),
            Step::Restart { started } => self.tick_restart(started.unwrap_or(now), now, renderer),
        }
    }

    fn schedule(&mut self, step: Step) {
        self.schedule = Schedule::Pending(step);
    }

    fn notify_score(&mut self) {
        let score = self.score;
        if let Some(listener) = self.score_listener.as_mut() {
            listener(score);
        }
    }

    fn add_score(&mut self, points: u64) {
        self.score += points;
        info!(points, score = self.score, "score");
        self.notify_score();
    }

    fn tick_loading(&mut self, preseeded: bool, renderer: &mut dyn Renderer) {
        match renderer.load_assets() {
            Poll::Pending => self.schedule(Step::Loading { preseeded }),
            Poll::Ready(Ok(())) => self.enter_drop(preseeded),
            Poll::Ready(Err(err)) => {
                error!(%err, "asset loading failed; session not started");
                self.schedule = Schedule::Idle;
            }
        }
    }

    fn enter_drop(&mut self, preseeded: bool) {
        if !preseeded {
            self.board.resolve_gravity(&mut self.rng);
        }
        debug_assert!(self.board.is_full() && self.board.is_settled());
        debug!(preseeded, "drop");
        self.schedule(Step::Drop { started: None });
    }

    fn tick_drop(
        &mut self,
        started: Instant,
        now: Instant,
        renderer: &mut dyn Renderer,
        input: &mut dyn InputSource,
    ) {
        let rows_elapsed = anim::progress(now.saturating_duration_since(started), self.timings.drop_step);
        let mut stagger = DROP_STAGGER;
        let mut finished = true;

        renderer.clear();
        for x in 0..self.board.width() {
            for y in 0..self.board.height() {
                let Some(token) = self.board.get(x, y) else {
                    continue;
                };
                let timeline = (rows_elapsed - stagger).max(0.0);
                let offset = (self.board.fall_height(x, y) as f32 - timeline).max(0.0);
                if offset > 0.0 {
                    finished = false;
                }
                renderer.draw_token(x as f32, y as f32 + offset, token, REST_SCALE);
                stagger += DROP_STAGGER * y as f32;
            }
        }

        if finished {
            self.enter_explosion(input);
        } else {
            self.schedule(Step::Drop {
                started: Some(started),
            });
        }
    }

    fn enter_explosion(&mut self, input: &mut dyn InputSource) {
        match matches::find_matches(&self.board) {
            Ok(found) if found.is_empty() => self.enter_player(input),
            Ok(found) => {
                debug!(cells = found.len(), "explosion");
                self.add_score(found.len() as u64 * POINTS_PER_GEM);
                self.schedule(Step::Explosion {
                    matches: found,
                    started: None,
                });
            }
            Err(err) => {
                warn!(%err, "board not settled before matching; dropping again");
                self.enter_drop(false);
            }
        }
    }

    fn tick_explosion(
        &mut self,
        matches: MatchSet,
        started: Instant,
        now: Instant,
        renderer: &mut dyn Renderer,
    ) {
        let elapsed = now.saturating_duration_since(started);
        let scale = anim::shrink_scale(elapsed, self.timings.explosion);

        renderer.clear();
        renderer.draw_board(&self.board, matches.cells());
        for &cell in matches.cells() {
            if let Some(token) = self.board.token_at(cell) {
                renderer.draw_token(cell.x as f32, cell.y as f32, token, scale);
            }
        }

        if elapsed < self.timings.explosion {
            self.schedule(Step::Explosion {
                matches,
                started: Some(started),
            });
            return;
        }
        if let Err(err) = matches::slice_matches(&mut self.board) {
            warn!(%err, "could not remove matches");
        }
        self.enter_drop(false);
    }

    fn enter_player(&mut self, input: &mut dyn InputSource) {
        match oracle::find_possible_move(&self.board, &mut self.rng) {
            Some(hint) => {
                debug!(from = ?hint.0.cell(), to = ?hint.1.cell(), "player phase");
                input.attach();
                self.schedule(Step::Player {
                    hint,
                    entered: None,
                    help_since: None,
                });
            }
            None => {
                info!("no possible move; reshuffling");
                self.enter_restart();
            }
        }
    }

    fn tick_player(
        &mut self,
        hint: (Gem, Gem),
        entered: Instant,
        help_since: Option<Instant>,
        now: Instant,
        renderer: &mut dyn Renderer,
        input: &mut dyn InputSource,
    ) {
        let idle = now.saturating_duration_since(entered);
        let help_since = help_since.or_else(|| (idle > self.timings.help_after).then_some(now));
        let hover = input
            .hover()
            .filter(|cell| self.board.index(cell.x, cell.y).is_some());

        renderer.clear();
        renderer.draw_board(&self.board, hover.as_slice());
        if let Some(since) = help_since {
            let (gem, _) = hint;
            let scale = anim::pulse_scale(now.saturating_duration_since(since), self.timings.pulse);
            renderer.draw_token(gem.x as f32, gem.y as f32, gem.token, scale);
        }
        if let Some(gem) = hover.and_then(|cell| self.board.gem(cell)) {
            renderer.draw_token(gem.x as f32, gem.y as f32, gem.token, HOVER_SCALE);
        }
        if self.first_player_phase {
            let (from, to) = hint;
            let f = anim::hand_fraction(idle, self.timings.hand);
            renderer.draw_hint_glyph(
                anim::lerp(from.x as f32, to.x as f32, f),
                anim::lerp(from.y as f32, to.y as f32, f),
            );
        }

        if input.exchange_requested() {
            let target = hover
                .zip(input.active())
                .and_then(|(hover, active)| Some((active, exchange_target(&self.board, active, hover)?)));
            if let Some((active, target)) = target {
                input.reset();
                input.detach();
                self.first_player_phase = false;
                self.enter_swap(active, target, input);
                return;
            }
        }
        self.schedule(Step::Player {
            hint,
            entered: Some(entered),
            help_since,
        });
    }

    fn enter_swap(&mut self, active: Cell, target: Cell, input: &mut dyn InputSource) {
        let (Some(first), Some(second)) = (self.board.gem(active), self.board.gem(target)) else {
            warn!(?active, ?target, "swap partner missing; back to player phase");
            self.enter_player(input);
            return;
        };
        let mode = if oracle::would_match(&self.board, active, target) {
            SwapMode::Settle
        } else {
            SwapMode::Reject
        };
        self.board.swap(active, target);
        debug!(?active, ?target, ?mode, "swap");
        self.schedule(Step::Swap {
            active: first,
            target: second,
            mode,
            started: None,
        });
    }

    /// `pair.0` is the grabbed gem, `pair.1` its partner, both with the tokens
    /// they held before the swap.
    fn tick_swap(
        &mut self,
        pair: (Gem, Gem),
        mode: SwapMode,
        started: Instant,
        now: Instant,
        renderer: &mut dyn Renderer,
        input: &mut dyn InputSource,
    ) {
        let (active, target) = pair;
        let t = anim::progress(now.saturating_duration_since(started), mode.length(&self.timings));
        let (pos, wobble) = mode.curve(t);
        let (ax, ay) = (active.x as f32, active.y as f32);
        let (tx, ty) = (target.x as f32, target.y as f32);

        renderer.clear();
        renderer.draw_board(&self.board, &[active.cell(), target.cell()]);
        renderer.draw_token(
            anim::lerp(tx, ax, pos),
            anim::lerp(ty, ay, pos),
            target.token,
            anim::incoming_scale(wobble),
        );
        renderer.draw_token(
            anim::lerp(ax, tx, pos),
            anim::lerp(ay, ty, pos),
            active.token,
            anim::outgoing_scale(wobble),
        );

        if t < 1.0 {
            self.schedule(Step::Swap {
                active,
                target,
                mode,
                started: Some(started),
            });
            return;
        }
        match mode {
            SwapMode::Settle => self.enter_explosion(input),
            SwapMode::Reject => {
                self.board.swap(active.cell(), target.cell());
                self.enter_player(input);
            }
        }
    }

    fn enter_restart(&mut self) {
        self.schedule(Step::Restart { started: None });
    }

    fn tick_restart(&mut self, started: Instant, now: Instant, renderer: &mut dyn Renderer) {
        let elapsed = now.saturating_duration_since(started);
        let scale = anim::shrink_scale(elapsed, self.timings.restart);

        renderer.clear();
        for gem in self.board.gems() {
            renderer.draw_token(gem.x as f32, gem.y as f32, gem.token, scale);
        }

        if elapsed < self.timings.restart {
            self.schedule(Step::Restart {
                started: Some(started),
            });
            return;
        }
        self.board.clear();
        self.enter_drop(false);
    }
}

/// Cell the grabbed gem moves into: one step from `active` toward `hover`
/// along the axis with the larger distance. Diagonals and the same cell give
/// `None`.
fn exchange_target(board: &Board, active: Cell, hover: Cell) -> Option<Cell> {
    let dx = hover.x as isize - active.x as isize;
    let dy = hover.y as isize - active.y as isize;
    if dx.abs() == dy.abs() {
        return None;
    }
    let target = if dx.abs() > dy.abs() {
        Cell::new(active.x.checked_add_signed(dx.signum())?, active.y)
    } else {
        Cell::new(active.x, active.y.checked_add_signed(dy.signum())?)
    };
    board.index(target.x, target.y).map(|_| target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointerState;
    use crate::render::Scene;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Exactly one playable swap: (3,2) into the A column at x=2.
    const ONE_MOVE: [&str; 5] = ["ABCDE", "BCDEA", "CDEAB", "DEABC", "EAACD"];
    /// Latin square: no swap can ever match.
    const STUCK: [&str; 5] = ["ABCDE", "BCDEA", "CDEAB", "DEABC", "EABCD"];

    fn config() -> GameConfig {
        GameConfig {
            width: 5,
            height: 5,
            gems: ["ruby", "emerald", "sapphire", "topaz", "amethyst"]
                .map(String::from)
                .to_vec(),
            seed: Some(7),
            ..GameConfig::default()
        }
    }

    fn at(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    struct Harness {
        ctl: PhaseController,
        scene: Scene,
        input: PointerState,
        scores: Rc<RefCell<Vec<u64>>>,
    }

    impl Harness {
        fn new() -> Self {
            let mut ctl = PhaseController::new(&config()).unwrap();
            let scores = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&scores);
            ctl.on_score_changed(move |s| sink.borrow_mut().push(s));
            Self {
                ctl,
                scene: Scene::new(5, 5, 5),
                input: PointerState::new(5, 5),
                scores,
            }
        }

        /// Board placed directly into the player phase.
        fn in_player(rows: &[&str]) -> Self {
            let mut h = Self::new();
            h.ctl.board = Board::from_rows(rows);
            h.ctl.enter_player(&mut h.input);
            h
        }

        fn tick(&mut self, now: Instant) {
            self.ctl.tick(now, &mut self.scene, &mut self.input);
        }
    }

    #[test]
    fn test_clean_start_drops_into_player_phase() {
        let mut h = Harness::new();
        let t0 = Instant::now();
        h.ctl.start();
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Loading));
        h.tick(t0);
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Drop));
        assert!(h.ctl.board().is_full());
        assert!(matches::find_matches(h.ctl.board()).unwrap().is_empty());

        h.tick(t0);
        assert_eq!(h.scene.sprites().len(), 25);
        // Everything starts one board height up.
        assert!(h.scene.sprites().iter().all(|s| s.y >= 5.0 - 1e-3));

        h.tick(at(t0, 3000));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Player));
        assert_eq!(h.ctl.score(), 0);
        assert!(h.input.is_attached());
        assert!(h.scores.borrow().is_empty());
    }

    #[test]
    fn test_start_is_noop_while_running() {
        let mut h = Harness::new();
        h.ctl.start();
        let board = h.ctl.board().clone();
        h.ctl.start();
        assert_eq!(h.ctl.board(), &board);
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Loading));
    }

    #[test]
    fn test_pause_mid_drop_resumes_same_interpolation() {
        let mut h = Harness::new();
        let t0 = Instant::now();
        h.ctl.start();
        h.tick(t0);
        h.tick(t0);
        // Cell (0,0) is drawn first and falls five rows.
        assert!(close(h.scene.sprites()[0].y, 5.0));

        h.tick(at(t0, 300));
        assert!(close(h.scene.sprites()[0].y, 3.1));

        h.ctl.pause(at(t0, 300));
        assert!(h.ctl.is_paused());
        h.tick(at(t0, 5000));
        assert!(close(h.scene.sprites()[0].y, 3.1));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Drop));

        h.ctl.resume(at(t0, 5000));
        assert!(!h.ctl.is_paused());
        h.tick(at(t0, 5000));
        assert!(close(h.scene.sprites()[0].y, 3.1));
        h.tick(at(t0, 5150));
        assert!(close(h.scene.sprites()[0].y, 2.1));
    }

    #[test]
    fn test_resume_and_pause_are_noops_when_not_applicable() {
        let mut h = Harness::new();
        let t0 = Instant::now();
        h.ctl.resume(t0);
        h.ctl.pause(t0);
        assert_eq!(h.ctl.phase(), None);
        h.ctl.start();
        h.ctl.resume(t0);
        assert!(!h.ctl.is_paused());
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Loading));
    }

    #[test]
    fn test_asset_failure_leaves_session_stopped() {
        let mut h = Harness::new();
        h.scene = Scene::new(5, 5, 99);
        h.ctl.start();
        h.tick(Instant::now());
        assert_eq!(h.ctl.phase(), None);
        assert!(!h.ctl.is_running());
    }

    #[test]
    fn test_diagonal_exchange_is_ignored() {
        let mut h = Harness::in_player(&ONE_MOVE);
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Player));
        let before = h.ctl.board().clone();
        let t0 = Instant::now();
        h.tick(t0);
        h.input.pointer_pressed(Some(Cell::new(0, 4)));
        h.input.pointer_moved(Some(Cell::new(1, 3)));
        h.tick(at(t0, 16));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Player));
        assert_eq!(h.ctl.board(), &before);
        assert!(h.input.exchange_requested());
        assert!(h.ctl.first_player_phase);
    }

    #[test]
    fn test_rejected_swap_restores_board() {
        let mut h = Harness::in_player(&ONE_MOVE);
        let before = h.ctl.board().clone();
        let t0 = Instant::now();
        h.tick(t0);
        assert!(h.scene.hand().is_some());

        h.input.pointer_pressed(Some(Cell::new(0, 4)));
        h.input.pointer_moved(Some(Cell::new(1, 4)));
        h.tick(at(t0, 16));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Swap));
        assert_eq!(h.ctl.board().get(0, 4), before.get(1, 4));
        assert_eq!(h.input.hover(), None);
        assert!(!h.input.is_attached());

        h.tick(at(t0, 32));
        h.tick(at(t0, 332));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Swap));
        h.tick(at(t0, 632));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Player));
        assert_eq!(h.ctl.board(), &before);
        assert_eq!(h.ctl.score(), 0);

        // The tutorial hand is gone after the first attempt.
        h.tick(at(t0, 648));
        assert_eq!(h.scene.hand(), None);
    }

    #[test]
    fn test_matching_swap_scores_and_cascades() {
        let mut h = Harness::in_player(&ONE_MOVE);
        let t0 = Instant::now();
        h.tick(t0);
        // Drag the A at (3,2) two cells left: it still only moves one step.
        h.input.pointer_pressed(Some(Cell::new(3, 2)));
        h.input.pointer_moved(Some(Cell::new(1, 2)));
        h.tick(at(t0, 16));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Swap));

        h.tick(at(t0, 32));
        h.tick(at(t0, 332));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Explosion));
        assert_eq!(h.ctl.score(), 300);
        assert_eq!(*h.scores.borrow(), vec![300]);

        h.tick(at(t0, 348));
        h.tick(at(t0, 648));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Drop));
        assert!(h.ctl.board().is_full());
        assert!(h.ctl.board().is_settled());

        // Run the cascade out; every explosion pays 100 per removed cell.
        let mut now = at(t0, 648);
        for _ in 0..2000 {
            if h.ctl.phase() == Some(PhaseKind::Player) {
                break;
            }
            now += Duration::from_millis(16);
            let before = h.ctl.score();
            h.tick(now);
            if let Schedule::Pending(Step::Explosion {
                matches,
                started: None,
            }) = &h.ctl.schedule
            {
                assert_eq!(h.ctl.score() - before, matches.len() as u64 * POINTS_PER_GEM);
            } else {
                assert_eq!(h.ctl.score(), before);
            }
        }
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Player));
        let scores = h.scores.borrow();
        assert_eq!(scores.last().copied(), Some(h.ctl.score()));
        assert!(scores.windows(2).all(|w| w[1] > w[0] && (w[1] - w[0]) % 100 == 0));
    }

    #[test]
    fn test_no_move_reshuffles_and_keeps_score() {
        let mut h = Harness::new();
        h.ctl.board = Board::from_rows(&STUCK);
        h.ctl.add_score(500);
        h.ctl.enter_player(&mut h.input);
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Restart));

        let t0 = Instant::now();
        h.tick(t0);
        assert!(h.scene.sprites().iter().all(|s| close(s.scale, REST_SCALE)));
        h.tick(at(t0, 150));
        assert!(h.scene.sprites().iter().all(|s| close(s.scale, REST_SCALE / 2.0)));
        h.tick(at(t0, 300));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Drop));
        assert!(h.ctl.board().is_full());
        assert!(h.ctl.board().fall_height(0, 0) > 0);
        assert_eq!(h.ctl.score(), 500);
    }

    #[test]
    fn test_missing_swap_partner_falls_back_to_player() {
        let mut h = Harness::in_player(&ONE_MOVE);
        let t0 = Instant::now();
        h.tick(t0);
        h.ctl.board.set(1, 4, None);
        h.input.pointer_pressed(Some(Cell::new(0, 4)));
        h.input.pointer_moved(Some(Cell::new(1, 4)));
        h.tick(at(t0, 16));
        assert_eq!(h.ctl.phase(), Some(PhaseKind::Player));
        assert_eq!(h.ctl.board().get(0, 4), Board::from_rows(&ONE_MOVE).get(0, 4));
        assert!(h.input.is_attached());
        assert!(!h.input.exchange_requested());
    }

    #[test]
    fn test_hint_pulses_after_inactivity() {
        let mut h = Harness::in_player(&ONE_MOVE);
        let t0 = Instant::now();
        h.tick(t0);
        assert_eq!(h.scene.sprites().len(), 25);
        h.tick(at(t0, 4000));
        assert_eq!(h.scene.sprites().len(), 25);
        h.tick(at(t0, 5001));
        assert_eq!(h.scene.sprites().len(), 26);
        assert!(close(h.scene.sprites()[25].scale, REST_SCALE));
        h.tick(at(t0, 5301));
        assert!(close(h.scene.sprites()[25].scale, 1.0));
        // The pulsing gem is the one that has to move: the A at (3,2).
        let pulse = h.scene.sprites()[25];
        assert!(close(pulse.x, 3.0) && close(pulse.y, 2.0));
    }

    #[test]
    fn test_hover_is_drawn_on_top_at_full_size() {
        let mut h = Harness::in_player(&ONE_MOVE);
        h.input.pointer_moved(Some(Cell::new(4, 0)));
        h.tick(Instant::now());
        let sprites = h.scene.sprites();
        assert_eq!(sprites.len(), 25);
        let last = sprites[24];
        assert!(close(last.x, 4.0) && close(last.y, 0.0) && close(last.scale, HOVER_SCALE));
    }

    #[test]
    fn test_stop_resets_session() {
        let mut h = Harness::in_player(&ONE_MOVE);
        h.ctl.add_score(700);
        h.ctl.stop(&mut h.scene, &mut h.input);
        assert_eq!(h.ctl.phase(), None);
        assert_eq!(h.ctl.score(), 0);
        assert_eq!(*h.scores.borrow(), vec![700, 0]);
        assert_eq!(h.ctl.board().gems().count(), 0);
        assert!(!h.input.is_attached());
        h.tick(Instant::now());
        assert_eq!(h.ctl.phase(), None);
    }

    #[test]
    fn test_exchange_target_steps_along_dominant_axis() {
        let board = Board::from_rows(&STUCK);
        let c = Cell::new;
        assert_eq!(exchange_target(&board, c(2, 2), c(4, 3)), Some(c(3, 2)));
        assert_eq!(exchange_target(&board, c(2, 2), c(2, 0)), Some(c(2, 1)));
        assert_eq!(exchange_target(&board, c(2, 2), c(3, 3)), None);
        assert_eq!(exchange_target(&board, c(2, 2), c(2, 2)), None);
        assert_eq!(exchange_target(&board, c(0, 0), c(0, 1)), Some(c(0, 1)));
    }
}
