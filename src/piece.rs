//! Falling piece instances

use crate::tetromino::{PieceKind, Shape};
use serde::{Deserialize, Serialize};

/// A piece at a given rotation and board position.
///
/// `x`/`y` locate the top-left corner of the 4x4 shape box; `y` grows
/// downward. Moves and rotations produce a new value so the previous one can
/// be restored when the attempt is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    pub rotation: usize,
    pub x: i32,
    pub y: i32,
    shape: Shape,
}

impl Piece {
    pub fn new(kind: PieceKind, rotation: usize, x: i32, y: i32) -> Self {
        let rotation = rotation % kind.rotation_count();
        Self {
            kind,
            rotation,
            x,
            y,
            shape: kind.shape(rotation),
        }
    }

    /// Create a piece at the spawn position for a board of `width` columns
    pub fn spawn(kind: PieceKind, width: usize) -> Self {
        Self::new(kind, 0, spawn_column(width), 0)
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Absolute (col, row) positions of the piece's occupied cells
    pub fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        let (x, y) = (self.x, self.y);
        self.shape.cells().map(move |(dx, dy)| (x + dx, y + dy))
    }

    /// Copy shifted by (dx, dy)
    pub fn shifted(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Copy at the next rotation of the kind's table, same anchor
    pub fn rotated(&self) -> Self {
        Self::new(self.kind, self.kind.next_rotation(self.rotation), self.x, self.y)
    }

    pub fn descriptor(&self) -> PieceDescriptor {
        PieceDescriptor {
            kind: self.kind,
            rotation: self.rotation,
            x: self.x,
            y: self.y,
        }
    }
}

/// Column where new pieces appear
pub fn spawn_column(width: usize) -> i32 {
    width as i32 / 2 - 2
}

/// Plain description of a piece for renderers and the wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceDescriptor {
    pub kind: PieceKind,
    pub rotation: usize,
    pub x: i32,
    pub y: i32,
}

impl From<PieceDescriptor> for Piece {
    fn from(d: PieceDescriptor) -> Self {
        Piece::new(d.kind, d.rotation, d.x, d.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_position() {
        let piece = Piece::spawn(PieceKind::T, 10);
        assert_eq!(piece.x, 3);
        assert_eq!(piece.y, 0);
        assert_eq!(piece.rotation, 0);
    }

    #[test]
    fn test_cells_follow_anchor() {
        let piece = Piece::new(PieceKind::Long, 1, 2, 5);
        let cells: Vec<_> = piece.cells().collect();
        assert_eq!(cells, vec![(3, 5), (3, 6), (3, 7), (3, 8)]);
    }

    #[test]
    fn test_rotated_keeps_original() {
        let piece = Piece::spawn(PieceKind::S, 10);
        let rotated = piece.rotated();
        assert_eq!(piece.rotation, 0);
        assert_eq!(rotated.rotation, 1);
        assert_eq!(rotated.rotated().rotation, 0);
        assert_eq!((rotated.x, rotated.y), (piece.x, piece.y));
    }

    #[test]
    fn test_descriptor_round_trip() {
        let piece = Piece::new(PieceKind::J, 3, -1, 7);
        assert_eq!(Piece::from(piece.descriptor()), piece);
    }
}
