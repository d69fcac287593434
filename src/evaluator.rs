//! Heuristic board evaluation for the automated player

use crate::search::{Outcome, SimCell};
use serde::{Deserialize, Serialize};

/// Score given to a placement that cannot be seated. Below every finite
/// heuristic value.
pub const REJECTED_SCORE: f64 = f64::MIN;

/// Scores a simulated outcome; higher is better
pub trait Scorer: Send + Sync {
    fn score(&self, outcome: &Outcome) -> f64;
}

/// Heuristic weights. Signs matter: positive terms are rewarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    /// Per placed cell touching the left or right wall
    pub wall: f64,
    /// Per placed cell side touching an existing filled cell
    pub lateral: f64,
    /// Per placed cell on the bottom row
    pub floor: f64,
    /// Per unit of (height - row) summed over every solid cell
    pub height: f64,
    pub holes: f64,
    pub blockades: f64,
    /// Per line cleared by either simulated drop
    pub clear: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            wall: 6.52,
            lateral: 3.97,
            floor: 0.65,
            height: -3.78,
            holes: -2.31,
            blockades: -0.59,
            clear: 1.6,
        }
    }
}

/// Raw counts the heuristic weighs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    pub wall: u32,
    pub lateral: u32,
    pub floor: u32,
    pub height: u32,
    pub holes: u32,
    pub blockades: u32,
    pub lines: u32,
}

impl Features {
    pub fn measure(outcome: &Outcome) -> Self {
        let board = &outcome.board;
        let width = board.width() as i32;
        let height = board.height() as i32;
        let mut features = Features {
            lines: outcome.lines_cleared,
            ..Features::default()
        };

        for (col, row, cell) in board.cells() {
            if cell.is_solid() {
                features.height += (height - row) as u32;
            }
            if cell != SimCell::Placed {
                continue;
            }
            if col == 0 || col == width - 1 {
                features.wall += 1;
            }
            if row == height - 1 {
                features.floor += 1;
            }
            features.lateral += [(-1, 0), (1, 0), (0, -1), (0, 1)]
                .iter()
                .filter(|(dx, dy)| board.get(col + dx, row + dy) == Some(SimCell::Filled))
                .count() as u32;
        }

        for col in 0..width {
            let column: Vec<bool> = (0..height)
                .map(|row| board.get(col, row).is_some_and(|c| c.is_solid()))
                .collect();
            // Empty below something solid
            let mut covered = false;
            for &solid in &column {
                if solid {
                    covered = true;
                } else if covered {
                    features.holes += 1;
                }
            }
            // Solid above something empty
            let mut gap_below = false;
            for &solid in column.iter().rev() {
                if !solid {
                    gap_below = true;
                } else if gap_below {
                    features.blockades += 1;
                }
            }
        }
        features
    }
}

impl Weights {
    pub fn apply(&self, f: &Features) -> f64 {
        self.wall * f.wall as f64
            + self.lateral * f.lateral as f64
            + self.floor * f.floor as f64
            + self.height * f.height as f64
            + self.holes * f.holes as f64
            + self.blockades * f.blockades as f64
            + self.clear * f.lines as f64
    }
}

/// Weighted-sum scorer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Heuristic {
    pub weights: Weights,
}

impl Heuristic {
    pub fn new(weights: Weights) -> Self {
        Self { weights }
    }
}

impl Scorer for Heuristic {
    fn score(&self, outcome: &Outcome) -> f64 {
        self.weights.apply(&Features::measure(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Placement, WorkBoard};
    use crate::tetromino::PieceKind;

    fn outcome(board: WorkBoard, lines_cleared: u32) -> Outcome {
        Outcome {
            board,
            lines_cleared,
        }
    }

    #[test]
    fn test_features_of_vertical_bar_on_wall() {
        let mut board = WorkBoard::empty(6, 20);
        let bar = Placement {
            kind: PieceKind::Long,
            rotation: 1,
            column: -1,
        };
        assert_eq!(board.drop_piece(bar), Some(0));
        let f = Features::measure(&outcome(board, 0));
        assert_eq!(f.wall, 4);
        assert_eq!(f.floor, 1);
        assert_eq!(f.lateral, 0);
        assert_eq!(f.height, 1 + 2 + 3 + 4);
        assert_eq!(f.holes, 0);
        assert_eq!(f.blockades, 0);
    }

    #[test]
    fn test_holes_and_blockades() {
        let mut board = WorkBoard::empty(4, 6);
        // Column 1: solid at rows 2 and 5, gaps at 3 and 4
        board.set(1, 2, SimCell::Filled);
        board.set(1, 5, SimCell::Filled);
        let f = Features::measure(&outcome(board, 0));
        assert_eq!(f.holes, 2);
        assert_eq!(f.blockades, 1);
        assert_eq!(f.height, (6 - 2) + (6 - 5));
    }

    #[test]
    fn test_lateral_counts_existing_neighbours_only() {
        let mut board = WorkBoard::empty(6, 6);
        board.set(2, 5, SimCell::Placed);
        board.set(3, 5, SimCell::Placed);
        board.set(1, 5, SimCell::Filled);
        board.set(2, 4, SimCell::Filled);
        let f = Features::measure(&outcome(board, 0));
        assert_eq!(f.lateral, 2);
        assert_eq!(f.floor, 2);
    }

    #[test]
    fn test_weighted_sum() {
        let features = Features {
            wall: 1,
            lateral: 1,
            floor: 1,
            height: 1,
            holes: 1,
            blockades: 1,
            lines: 1,
        };
        let expected = 6.52 + 3.97 + 0.65 - 3.78 - 2.31 - 0.59 + 1.6;
        assert!((Weights::default().apply(&features) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_clears_are_rewarded() {
        let weights = Weights::default();
        let base = Features::default();
        let cleared = Features { lines: 2, ..base };
        assert!(weights.apply(&cleared) > weights.apply(&base));
    }

    #[test]
    fn test_weights_parse_partial_toml() {
        let weights: Weights = toml::from_str("holes = -5.0").unwrap();
        assert_eq!(weights.holes, -5.0);
        assert_eq!(weights.wall, Weights::default().wall);
    }
}
