//! Board grid representation and collision detection

use crate::error::ConfigError;
use crate::piece::Piece;
use crate::tetromino::{PieceKind, SHAPE_SIZE};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Default board dimensions
pub const DEFAULT_WIDTH: usize = 10;
pub const DEFAULT_HEIGHT: usize = 20;

/// Upper bound on rows removed by one landing. A 4-cell piece can complete
/// at most 4 rows; the extra pass only bounds the loop.
pub const MAX_CLEAR_PASSES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Empty,
    Filled,
    Active,
}

/// A board cell. `kind` only tags the owning piece for rendering and is
/// meaningless when the cell is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub state: CellState,
    pub kind: Option<PieceKind>,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        state: CellState::Empty,
        kind: None,
    };

    pub fn filled(kind: PieceKind) -> Self {
        Self {
            state: CellState::Filled,
            kind: Some(kind),
        }
    }

    pub fn active(kind: PieceKind) -> Self {
        Self {
            state: CellState::Active,
            kind: Some(kind),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state == CellState::Empty
    }

    pub fn is_filled(&self) -> bool {
        self.state == CellState::Filled
    }

    pub fn is_active(&self) -> bool {
        self.state == CellState::Active
    }
}

/// The playing field. Row 0 is the top, row `height - 1` the floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    /// Row-major cells
    cells: Vec<Cell>,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            cells: vec![Cell::EMPTY; DEFAULT_WIDTH * DEFAULT_HEIGHT],
        }
    }
}

impl Grid {
    /// Create an empty grid. Both dimensions must fit at least one shape box.
    pub fn new(width: usize, height: usize) -> Result<Self, ConfigError> {
        if width < SHAPE_SIZE || height < SHAPE_SIZE {
            return Err(ConfigError::BoardSize { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![Cell::EMPTY; width * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(row * self.width + col)
    }

    /// Get the cell at (col, row), or None when out of bounds
    pub fn get(&self, col: i32, row: i32) -> Option<Cell> {
        self.index(col, row).map(|i| self.cells[i])
    }

    /// Set a cell. Returns false if out of bounds.
    pub fn set(&mut self, col: i32, row: i32, cell: Cell) -> bool {
        match self.index(col, row) {
            Some(i) => {
                self.cells[i] = cell;
                true
            }
            None => false,
        }
    }

    /// Iterate rows top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width)
    }

    /// Reset every cell to empty without reallocating
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Stamp `piece` as the active piece.
    ///
    /// Rejected, with the grid untouched, when any cell of the piece is out of
    /// bounds or lands on a filled cell. On success the previous active cells
    /// are cleared first, so only one piece is ever active.
    pub fn place(&mut self, piece: &Piece) -> bool {
        let mut targets = [0usize; SHAPE_SIZE];
        for (slot, (col, row)) in targets.iter_mut().zip(piece.cells()) {
            match self.index(col, row) {
                Some(i) if !self.cells[i].is_filled() => *slot = i,
                _ => return false,
            }
        }

        for cell in self.cells.iter_mut().filter(|c| c.is_active()) {
            *cell = Cell::EMPTY;
        }
        for i in targets {
            self.cells[i] = Cell::active(piece.kind);
        }
        true
    }

    /// Turn the active cells into filled ones.
    /// Returns the range of rows they covered, if any were active.
    pub fn land(&mut self) -> Option<RangeInclusive<usize>> {
        let width = self.width;
        let mut span: Option<(usize, usize)> = None;
        for (i, cell) in self.cells.iter_mut().enumerate() {
            if cell.is_active() {
                cell.state = CellState::Filled;
                let row = i / width;
                span = Some(match span {
                    Some((top, bottom)) => (top.min(row), bottom.max(row)),
                    None => (row, row),
                });
            }
        }
        span.map(|(top, bottom)| top..=bottom)
    }

    /// Remove full rows inside `rows`, shifting everything above down
    pub fn clear_full_rows(&mut self, rows: RangeInclusive<usize>) -> u32 {
        collapse_full_rows(&mut self.cells, self.width, rows, Cell::EMPTY, |c| {
            c.is_filled()
        })
    }

    /// Distinct kinds among active cells
    pub fn active_kinds(&self) -> Vec<PieceKind> {
        let mut kinds: Vec<PieceKind> = Vec::new();
        for kind in self.cells.iter().filter(|c| c.is_active()).filter_map(|c| c.kind) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    /// Whether every cell is empty
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell count matches the stated dimensions (checked on restore)
    pub fn is_consistent(&self) -> bool {
        self.width >= SHAPE_SIZE
            && self.height >= SHAPE_SIZE
            && self.width.checked_mul(self.height) == Some(self.cells.len())
    }

    /// Whether the active cells are exactly the cells of `piece`, or there
    /// are none when no piece is given
    pub fn active_matches(&self, piece: Option<&Piece>) -> bool {
        let active = self.cells.iter().filter(|c| c.is_active()).count();
        match piece {
            None => active == 0,
            Some(piece) => {
                active == SHAPE_SIZE
                    && piece
                        .cells()
                        .all(|(col, row)| self.get(col, row) == Some(Cell::active(piece.kind)))
            }
        }
    }
}

/// Remove full rows within `rows` from a row-major cell buffer.
///
/// The bottom-most full row in the window is removed, everything above it
/// moves down one row and a fresh empty row appears at the top; this repeats
/// (at most `MAX_CLEAR_PASSES` times) until no full row is left in the window.
/// Shared by the engine grid and the search's working boards.
pub(crate) fn collapse_full_rows<C: Copy>(
    cells: &mut [C],
    width: usize,
    rows: RangeInclusive<usize>,
    empty: C,
    is_solid: impl Fn(&C) -> bool,
) -> u32 {
    let height = cells.len() / width;
    if height == 0 || rows.is_empty() {
        return 0;
    }
    let mut top = *rows.start();
    let bottom = (*rows.end()).min(height - 1);
    let mut cleared = 0;

    for _ in 0..MAX_CLEAR_PASSES {
        if top > bottom {
            break;
        }
        let full = (top..=bottom)
            .rev()
            .find(|&row| cells[row * width..(row + 1) * width].iter().all(&is_solid));
        let Some(row) = full else {
            break;
        };
        cells.copy_within(0..row * width, width);
        cells[..width].fill(empty);
        cleared += 1;
        // Rows above the cleared one slid down
        top += 1;
    }
    cleared
}
