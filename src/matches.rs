//! Match engine: runs of three or more equal tokens along rows and columns.

use crate::board::{Board, BoardError, Cell};

/// Shortest run that counts as a match.
pub const MIN_RUN: usize = 3;

/// Cells belonging to at least one run, each listed once, in board index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    cells: Vec<Cell>,
}

impl MatchSet {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }
}

/// Scans every row left to right and every column bottom to top.
///
/// The board must be fully populated at the start of every line; an empty
/// cell there is an invariant violation reported as [`BoardError::EmptyCell`].
/// An empty cell further along a line only breaks the current run.
pub fn find_matches(board: &Board) -> Result<MatchSet, BoardError> {
    let (w, h) = (board.width(), board.height());
    let mut matched = vec![false; board.area()];
    let mut line = Vec::with_capacity(w.max(h));

    for y in 0..h {
        line.clear();
        line.extend((0..w).map(|x| Cell::new(x, y)));
        mark_runs(board, &line, &mut matched)?;
    }
    for x in 0..w {
        line.clear();
        line.extend((0..h).map(|y| Cell::new(x, y)));
        mark_runs(board, &line, &mut matched)?;
    }

    let cells = matched
        .iter()
        .enumerate()
        .filter(|&(_, &hit)| hit)
        .map(|(i, _)| board.cell_at(i))
        .collect();
    Ok(MatchSet { cells })
}

/// Like [`find_matches`], then empties every matched cell.
pub fn slice_matches(board: &mut Board) -> Result<MatchSet, BoardError> {
    let matches = find_matches(board)?;
    for cell in matches.cells() {
        board.set(cell.x, cell.y, None);
    }
    Ok(matches)
}

fn mark_runs(board: &Board, line: &[Cell], matched: &mut [bool]) -> Result<(), BoardError> {
    let Some(&first) = line.first() else {
        return Ok(());
    };
    let mut current = board.token_at(first);
    if current.is_none() {
        return Err(BoardError::EmptyCell {
            x: first.x,
            y: first.y,
        });
    }
    let mut run_start = 0;
    for i in 1..=line.len() {
        let next = line.get(i).and_then(|&c| board.token_at(c));
        if i < line.len() && next.is_some() && next == current {
            continue;
        }
        if current.is_some() && i - run_start >= MIN_RUN {
            for cell in &line[run_start..i] {
                if let Some(idx) = board.index(cell.x, cell.y) {
                    matched[idx] = true;
                }
            }
        }
        run_start = i;
        current = next;
    }
    Ok(())
}
