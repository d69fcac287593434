//! Score keeping

use serde::{Deserialize, Serialize};

/// Points for clearing n rows with one landing
pub fn line_clear_points(lines: u32) -> u64 {
    match lines {
        0 => 0,
        1 => 40,
        2 => 100,
        3 => 300,
        _ => 1200,
    }
}

/// Running totals. Only ever grows until `reset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Current score
    pub points: u64,
    /// Total lines cleared
    pub lines: u32,
    /// Pieces spawned this game
    pub blocks_dropped: u32,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a landing that cleared `lines` rows
    pub fn add_clear(&mut self, lines: u32) {
        self.lines += lines;
        self.points += line_clear_points(lines);
    }

    /// Record a successful spawn (flat one point bonus)
    pub fn add_spawn(&mut self) {
        self.blocks_dropped += 1;
        self.points += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
