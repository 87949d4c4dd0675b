//! gemfall: match-three gem swapping puzzle in the terminal.

mod anim;
mod app;
mod board;
mod input;
mod matches;
mod oracle;
mod phase;
mod render;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use board::Alphabet;
use clap::{Parser, ValueEnum};
use phase::Timings;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Smallest board on which a run of three fits in both directions.
const MIN_BOARD_SIDE: usize = 3;

/// Largest board side; the drawn board (six columns by three rows per gem)
/// stays well inside terminal coordinates.
const MAX_BOARD_SIDE: usize = 64;

const DEFAULT_GEMS: [&str; 6] = ["ruby", "emerald", "sapphire", "topaz", "amethyst", "pearl"];

/// Session settings derived from the CLI.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: usize,
    pub height: usize,
    /// Gem names; their order fixes the token indices.
    pub gems: Vec<String>,
    /// First board of a session comes without runs (and with a move).
    pub clean_start: bool,
    pub seed: Option<u64>,
    pub timings: Timings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            gems: DEFAULT_GEMS.iter().map(ToString::to_string).collect(),
            clean_start: true,
            seed: None,
            timings: Timings::default(),
        }
    }
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            width: args.width,
            height: args.height,
            gems: args.gems.clone(),
            clean_start: !args.no_clean_start,
            seed: args.seed,
            timings: Timings {
                help_after: Duration::from_secs(args.help_after),
                ..Timings::default()
            },
        }
    }

    /// Checks the board size and builds the gem alphabet.
    pub fn validate(&self) -> Result<Alphabet, ConfigError> {
        if self.width < MIN_BOARD_SIDE || self.height < MIN_BOARD_SIDE {
            return Err(ConfigError::BoardTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > MAX_BOARD_SIDE || self.height > MAX_BOARD_SIDE {
            return Err(ConfigError::BoardTooLarge {
                width: self.width,
                height: self.height,
            });
        }
        Alphabet::new(self.gems.clone())
    }

    /// Shrinks the board to at most `(max_width, max_height)` gems.
    pub fn fit_to(&mut self, (max_width, max_height): (usize, usize)) {
        let (width, height) = (self.width.min(max_width), self.height.min(max_height));
        if (width, height) != (self.width, self.height) {
            info!(
                requested_width = self.width,
                requested_height = self.height,
                width,
                height,
                "board shrunk to fit the terminal"
            );
            self.width = width;
            self.height = height;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("board is {width}x{height}; it must be at least {MIN_BOARD_SIDE}x{MIN_BOARD_SIDE}")]
    BoardTooSmall { width: usize, height: usize },
    #[error("board is {width}x{height}; it must be at most {MAX_BOARD_SIDE}x{MAX_BOARD_SIDE}")]
    BoardTooLarge { width: usize, height: usize },
    #[error("{0} gem kinds given; at least 3 are needed")]
    TooFewGems(usize),
    #[error("{0} gem kinds given; at most 255 are supported")]
    TooManyGems(usize),
    #[error("gem {0:?} is listed twice")]
    DuplicateGem(String),
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let mut config = GameConfig::from_args(&args);
    config.validate().context("invalid game configuration")?;
    if let Ok((cols, rows)) = crossterm::terminal::size() {
        config.fit_to(ui::board_fit(cols, rows));
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let mut app = App::new(&args, &config, theme)?;
    app.run()?;
    Ok(())
}

/// Logs go to `path` only; stdout belongs to the terminal UI.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Match-three gem puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "gemfall",
    version,
    about = "Match-three gem puzzle in the terminal. Swap neighbouring gems to line up three or more.",
    long_about = "gemfall is a terminal match-three puzzle.\n\n\
        Swap two neighbouring gems to form a row or column of three or more of the same kind. \
        Matched gems burst for 100 points each; the gems above fall down and new ones drop in, \
        which can set off further matches. When no swap can match any more, the board is \
        reshuffled and play continues.\n\n\
        CONTROLS (mouse):\n  Press on a gem and drag toward a neighbour to swap.\n\n\
        CONTROLS (keyboard):\n  Arrows / hjkl  Move cursor   Space / Enter  Grab, then move to swap\n  \
        N  New game   P  Pause   Q / Esc  Quit\n\n\
        Set RUST_LOG (e.g. RUST_LOG=debug) together with --log-file to trace the game phases."
)]
pub struct Args {
    /// Board width in gems.
    #[arg(long, default_value = "8", value_name = "COLS")]
    pub width: usize,

    /// Board height in gems.
    #[arg(long, default_value = "8", value_name = "ROWS")]
    pub height: usize,

    /// Comma-separated gem names; at least three, all distinct.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "ruby,emerald,sapphire,topaz,amethyst,pearl",
        value_name = "NAMES"
    )]
    pub gems: Vec<String>,

    /// Seconds without a swap before the hint starts pulsing.
    #[arg(long, default_value = "5", value_name = "SECS")]
    pub help_after: u64,

    /// Seed for the gem generator, for reproducible games.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Let the first board contain matches (they burst and score right away).
    #[arg(long)]
    pub no_clean_start: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Write logs to this file (filtered by RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
