//! Placement enumeration and drop simulation
//!
//! Works on [`WorkBoard`], a scratch copy of the grid whose cells remember
//! whether they were filled before the simulation or placed by it, so the
//! evaluator can tell the new pieces apart from the existing stack.

use crate::board::{collapse_full_rows, Grid};
use crate::evaluator::{Scorer, REJECTED_SCORE};
use crate::piece::Piece;
use crate::tetromino::{PieceKind, SHAPE_SIZE};
use serde::{Deserialize, Serialize};

/// Cell of a simulation board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCell {
    Empty,
    /// Part of the stack before the simulation started
    Filled,
    /// Written by a simulated drop
    Placed,
}

impl SimCell {
    pub fn is_solid(&self) -> bool {
        !matches!(self, SimCell::Empty)
    }
}

/// A candidate (rotation, column) for a piece. The resting row is found by
/// simulation. Two placements are equal when rotation and column match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Placement {
    pub kind: PieceKind,
    pub rotation: usize,
    pub column: i32,
}

impl PartialEq for Placement {
    fn eq(&self, other: &Self) -> bool {
        self.rotation == other.rotation && self.column == other.column
    }
}

impl Eq for Placement {}

/// Every legal placement of `kind` on a board `width` columns wide.
///
/// Columns run from `-free_left` to `width - 4 + free_right`, so the shape's
/// empty margin columns may hang over the walls but no occupied cell can.
pub fn enumerate_placements(kind: PieceKind, width: usize) -> Vec<Placement> {
    let last = width as i32 - SHAPE_SIZE as i32;
    (0..kind.rotation_count())
        .flat_map(|rotation| {
            let free = kind.free_spaces(rotation);
            (-(free.left as i32)..=last + free.right as i32).map(move |column| Placement {
                kind,
                rotation,
                column,
            })
        })
        .collect()
}

/// Scratch board for simulated drops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkBoard {
    width: usize,
    height: usize,
    cells: Vec<SimCell>,
}

impl WorkBoard {
    /// Copy the settled stack of `grid`; the falling piece is left out
    pub fn from_grid(grid: &Grid) -> Self {
        let cells = grid
            .rows()
            .flatten()
            .map(|c| if c.is_filled() { SimCell::Filled } else { SimCell::Empty })
            .collect();
        Self {
            width: grid.width(),
            height: grid.height(),
            cells,
        }
    }

    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![SimCell::Empty; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, col: i32, row: i32) -> Option<SimCell> {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return None;
        }
        Some(self.cells[row as usize * self.width + col as usize])
    }

    pub fn set(&mut self, col: i32, row: i32, cell: SimCell) {
        if col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height {
            self.cells[row as usize * self.width + col as usize] = cell;
        }
    }

    fn is_solid(&self, col: i32, row: i32) -> bool {
        self.get(col, row).is_some_and(|c| c.is_solid())
    }

    /// Whether the piece could sit at `piece.y`: every cell on the board,
    /// free, and with nothing solid in the rows it swept falling from `y = 0`.
    fn can_rest(&self, piece: &Piece) -> bool {
        piece.cells().all(|(col, row)| {
            self.get(col, row).is_some_and(|c| !c.is_solid())
                && (row - piece.y..row).all(|above| !self.is_solid(col, above))
        })
    }

    /// Drop a placement straight down and clear completed rows.
    ///
    /// Candidate rows are tried from the floor upward; the first one that
    /// fits is the resting row. Returns the number of rows cleared, or
    /// `None` when the piece cannot be seated anywhere.
    pub fn drop_piece(&mut self, placement: Placement) -> Option<u32> {
        let resting = (0..self.height as i32)
            .rev()
            .map(|y| Piece::new(placement.kind, placement.rotation, placement.column, y))
            .find(|piece| self.can_rest(piece))?;

        let (mut top, mut bottom) = (usize::MAX, 0);
        for (col, row) in resting.cells() {
            self.set(col, row, SimCell::Placed);
            top = top.min(row as usize);
            bottom = bottom.max(row as usize);
        }
        Some(collapse_full_rows(
            &mut self.cells,
            self.width,
            top..=bottom,
            SimCell::Empty,
            SimCell::is_solid,
        ))
    }

    /// Iterate (col, row, cell) over the whole board
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, SimCell)> + '_ {
        self.cells.iter().enumerate().map(|(i, &cell)| {
            ((i % self.width) as i32, (i / self.width) as i32, cell)
        })
    }
}

/// Board after simulated drops, plus the rows they cleared
#[derive(Debug, Clone)]
pub struct Outcome {
    pub board: WorkBoard,
    pub lines_cleared: u32,
}

/// Drop `current` then `next` onto a copy of `board`.
/// `None` when either piece cannot be seated.
pub fn simulate_pair(board: &WorkBoard, current: Placement, next: Placement) -> Option<Outcome> {
    let mut board = board.clone();
    let first = board.drop_piece(current)?;
    let second = board.drop_piece(next)?;
    Some(Outcome {
        board,
        lines_cleared: first + second,
    })
}

/// Score of placing `current` and then `next`; the rejection sentinel when
/// either cannot fit
pub fn score_pair(
    board: &WorkBoard,
    current: Placement,
    next: Placement,
    scorer: &dyn Scorer,
) -> f64 {
    match simulate_pair(board, current, next) {
        Some(outcome) => scorer.score(&outcome),
        None => REJECTED_SCORE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Heuristic;

    fn placement(kind: PieceKind, rotation: usize, column: i32) -> Placement {
        Placement {
            kind,
            rotation,
            column,
        }
    }

    #[test]
    fn test_enumerate_bounds() {
        let placements = enumerate_placements(PieceKind::Long, 6);
        // Horizontal: columns 0..=2, vertical: -1..=4
        assert_eq!(placements.len(), 3 + 6);
        assert!(placements.contains(&placement(PieceKind::Long, 1, -1)));
        assert!(placements.contains(&placement(PieceKind::Long, 1, 4)));
        assert!(!placements.contains(&placement(PieceKind::Long, 0, -1)));
    }

    #[test]
    fn test_enumerated_placements_stay_on_board() {
        for kind in PieceKind::ALL {
            for p in enumerate_placements(kind, 10) {
                let piece = Piece::new(kind, p.rotation, p.column, 0);
                assert!(piece.cells().all(|(col, _)| (0..10).contains(&col)));
            }
        }
    }

    #[test]
    fn test_placement_equality_ignores_kind() {
        assert_eq!(placement(PieceKind::T, 1, 3), placement(PieceKind::S, 1, 3));
        assert_ne!(placement(PieceKind::T, 1, 3), placement(PieceKind::T, 0, 3));
    }

    #[test]
    fn test_vertical_bar_rests_on_floor() {
        for p in enumerate_placements(PieceKind::Long, 6)
            .into_iter()
            .filter(|p| p.rotation == 1)
        {
            let mut board = WorkBoard::empty(6, 20);
            assert_eq!(board.drop_piece(p), Some(0));
            let rows: Vec<i32> = board
                .cells()
                .filter(|(_, _, c)| *c == SimCell::Placed)
                .map(|(_, row, _)| row)
                .collect();
            assert_eq!(rows.iter().max(), Some(&19), "column {}", p.column);
            assert_eq!(rows.len(), 4);
        }
    }

    #[test]
    fn test_drop_stops_on_stack() {
        let mut board = WorkBoard::empty(6, 20);
        board.set(2, 15, SimCell::Filled);
        assert_eq!(board.drop_piece(placement(PieceKind::Box, 0, 1)), Some(0));
        assert_eq!(board.get(2, 14), Some(SimCell::Placed));
        assert_eq!(board.get(2, 13), Some(SimCell::Placed));
        assert_eq!(board.get(3, 14), Some(SimCell::Placed));
        assert_eq!(board.get(3, 15), Some(SimCell::Empty));
    }

    #[test]
    fn test_drop_does_not_tunnel_under_overhang() {
        let mut board = WorkBoard::empty(6, 20);
        // Overhang at row 10 over an open pocket below
        board.set(0, 10, SimCell::Filled);
        let bar = placement(PieceKind::Long, 1, -1);
        assert_eq!(board.drop_piece(bar), Some(0));
        assert_eq!(board.get(0, 9), Some(SimCell::Placed));
        assert_eq!(board.get(0, 6), Some(SimCell::Placed));
        assert_eq!(board.get(0, 19), Some(SimCell::Empty));
    }

    #[test]
    fn test_drop_ignores_cells_above_the_shape_box() {
        let mut board = WorkBoard::empty(6, 20);
        // The box occupies mask rows 1-2, so row 0 is never swept
        board.set(1, 0, SimCell::Filled);
        board.set(2, 0, SimCell::Filled);
        assert_eq!(board.drop_piece(placement(PieceKind::Box, 0, 0)), Some(0));
        assert_eq!(board.get(1, 19), Some(SimCell::Placed));
        assert_eq!(board.get(2, 18), Some(SimCell::Placed));
    }

    #[test]
    fn test_drop_rejects_when_column_is_full() {
        let mut board = WorkBoard::empty(6, 20);
        for row in 1..20 {
            board.set(0, row, SimCell::Filled);
        }
        let before = board.clone();
        assert_eq!(board.drop_piece(placement(PieceKind::Long, 1, -1)), None);
        assert_eq!(board, before);
    }

    #[test]
    fn test_drop_clears_completed_row() {
        let mut board = WorkBoard::empty(6, 20);
        for col in 1..6 {
            board.set(col, 19, SimCell::Filled);
        }
        assert_eq!(board.drop_piece(placement(PieceKind::Long, 1, -1)), Some(1));
        // Three placed cells remain, shifted down by one
        let placed = board.cells().filter(|(_, _, c)| *c == SimCell::Placed).count();
        assert_eq!(placed, 3);
        assert_eq!(board.get(0, 19), Some(SimCell::Placed));
        assert_eq!(board.get(1, 19), Some(SimCell::Empty));
    }

    #[test]
    fn test_pair_counts_lines_from_both_drops() {
        let mut board = WorkBoard::empty(6, 20);
        for col in 1..6 {
            board.set(col, 19, SimCell::Filled);
            board.set(col, 18, SimCell::Filled);
        }
        board.set(0, 19, SimCell::Filled);
        let current = placement(PieceKind::Long, 1, -1);
        let next = placement(PieceKind::Box, 0, 0);
        let outcome = simulate_pair(&board, current, next).unwrap();
        assert_eq!(outcome.lines_cleared, 1);
    }

    #[test]
    fn test_rejected_pair_scores_below_every_fit() {
        let mut board = WorkBoard::empty(6, 20);
        for col in 0..3 {
            for row in 1..20 {
                board.set(col, row, SimCell::Filled);
            }
        }
        let heuristic = Heuristic::default();
        let next = placement(PieceKind::Box, 0, 2);
        let rejected = score_pair(&board, placement(PieceKind::Long, 1, -1), next, &heuristic);

        let fitting: Vec<f64> = enumerate_placements(PieceKind::Long, 6)
            .into_iter()
            .filter_map(|p| simulate_pair(&board, p, next).map(|o| heuristic.score(&o)))
            .collect();
        assert!(!fitting.is_empty());
        assert!(fitting.iter().all(|&s| rejected < s));
    }

    #[test]
    fn test_from_grid_skips_active_piece() {
        let mut grid = Grid::new(6, 20).unwrap();
        grid.set(0, 19, crate::board::Cell::filled(PieceKind::J));
        assert!(grid.place(&Piece::spawn(PieceKind::T, 6)));
        let board = WorkBoard::from_grid(&grid);
        assert_eq!(board.cells().filter(|(_, _, c)| c.is_solid()).count(), 1);
    }
}
