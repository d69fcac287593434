//! Piece definitions
//!
//! Seven piece kinds, each with a fixed list of rotation shapes drawn inside a
//! 4x4 box. There is no wall-kick system: rotating simply steps to the next
//! entry of the kind's table and wraps back to rotation 0.

use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Side length of the box every shape is drawn in
pub const SHAPE_SIZE: usize = 4;

/// The 7 piece kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Long, // Cyan - straight bar
    Box,  // Yellow - square
    L,    // Orange
    J,    // Blue
    T,    // Purple
    S,    // Green
    Z,    // Red
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::Long,
        PieceKind::Box,
        PieceKind::L,
        PieceKind::J,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
    ];

    /// Get the color for this piece kind
    pub fn color(&self) -> Color {
        match self {
            PieceKind::Long => Color::Cyan,
            PieceKind::Box => Color::Yellow,
            PieceKind::L => Color::Rgb(255, 165, 0), // Orange
            PieceKind::J => Color::Blue,
            PieceKind::T => Color::Magenta,
            PieceKind::S => Color::Green,
            PieceKind::Z => Color::Red,
        }
    }

    /// All rotation shapes of this kind, in rotation order
    pub fn rotations(&self) -> &'static [Shape] {
        match self {
            PieceKind::Long => &LONG,
            PieceKind::Box => &BOX,
            PieceKind::L => &L,
            PieceKind::J => &J,
            PieceKind::T => &T,
            PieceKind::S => &S,
            PieceKind::Z => &Z,
        }
    }

    pub fn rotation_count(&self) -> usize {
        self.rotations().len()
    }

    /// Rotation index that follows `rotation`, wrapping to 0 after the last one
    pub fn next_rotation(&self, rotation: usize) -> usize {
        (rotation + 1) % self.rotation_count()
    }

    /// Shape for a (kind, rotation) pair. The index wraps modulo the table length.
    pub fn shape(&self, rotation: usize) -> Shape {
        let table = self.rotations();
        table[rotation % table.len()]
    }

    /// Empty margin columns of the shape at `rotation`
    pub fn free_spaces(&self, rotation: usize) -> FreeSpaces {
        self.shape(rotation).free
    }
}

/// Count of entirely empty columns at each side of a shape's 4x4 box.
///
/// Only meaningful because every shape shares the same fixed 4x4 bounding box:
/// a column is "free" when no row of the mask uses it, which bounds how far
/// the box may hang past either wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeSpaces {
    pub left: u8,
    pub right: u8,
}

/// A 4x4 occupancy mask. Each row is a nibble, bit 3 is column 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    rows: [u8; SHAPE_SIZE],
    free: FreeSpaces,
}

impl Shape {
    const fn new(rows: [u8; SHAPE_SIZE]) -> Self {
        let used = rows[0] | rows[1] | rows[2] | rows[3];
        let mut left = 0;
        while left < SHAPE_SIZE as u8 && used & (0b1000 >> left) == 0 {
            left += 1;
        }
        let mut right = 0;
        while right < SHAPE_SIZE as u8 && used & (1 << right) == 0 {
            right += 1;
        }
        Self {
            rows,
            free: FreeSpaces { left, right },
        }
    }

    /// Whether the mask cell at (row, col) is occupied
    pub fn is_filled(&self, row: usize, col: usize) -> bool {
        row < SHAPE_SIZE && col < SHAPE_SIZE && self.rows[row] & (0b1000 >> col) != 0
    }

    /// Occupied cells as (dx, dy) offsets from the box's top-left corner
    pub fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        (0..SHAPE_SIZE).flat_map(move |row| {
            (0..SHAPE_SIZE)
                .filter(move |&col| self.is_filled(row, col))
                .map(move |col| (col as i32, row as i32))
        })
    }

    pub fn free_spaces(&self) -> FreeSpaces {
        self.free
    }
}

// Row 0 is the top of the box.

const LONG: [Shape; 2] = [
    Shape::new([0b0000, 0b1111, 0b0000, 0b0000]),
    Shape::new([0b0100, 0b0100, 0b0100, 0b0100]),
];

const BOX: [Shape; 1] = [Shape::new([0b0000, 0b0110, 0b0110, 0b0000])];

const L: [Shape; 4] = [
    Shape::new([0b0100, 0b0100, 0b0110, 0b0000]),
    Shape::new([0b0000, 0b1110, 0b1000, 0b0000]),
    Shape::new([0b1100, 0b0100, 0b0100, 0b0000]),
    Shape::new([0b0010, 0b1110, 0b0000, 0b0000]),
];

const J: [Shape; 4] = [
    Shape::new([0b0100, 0b0100, 0b1100, 0b0000]),
    Shape::new([0b1000, 0b1110, 0b0000, 0b0000]),
    Shape::new([0b0110, 0b0100, 0b0100, 0b0000]),
    Shape::new([0b0000, 0b1110, 0b0010, 0b0000]),
];

const T: [Shape; 4] = [
    Shape::new([0b0000, 0b1110, 0b0100, 0b0000]),
    Shape::new([0b0100, 0b1100, 0b0100, 0b0000]),
    Shape::new([0b0100, 0b1110, 0b0000, 0b0000]),
    Shape::new([0b0100, 0b0110, 0b0100, 0b0000]),
];

const S: [Shape; 2] = [
    Shape::new([0b0000, 0b0110, 0b1100, 0b0000]),
    Shape::new([0b1000, 0b1100, 0b0100, 0b0000]),
];

const Z: [Shape; 2] = [
    Shape::new([0b0000, 0b1100, 0b0110, 0b0000]),
    Shape::new([0b0100, 0b1100, 0b1000, 0b0000]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shape_has_four_cells() {
        for kind in PieceKind::ALL {
            for rotation in 0..kind.rotation_count() {
                assert_eq!(kind.shape(rotation).cells().count(), 4, "{kind:?} r{rotation}");
            }
        }
    }

    #[test]
    fn test_rotation_counts() {
        assert_eq!(PieceKind::Long.rotation_count(), 2);
        assert_eq!(PieceKind::Box.rotation_count(), 1);
        assert_eq!(PieceKind::T.rotation_count(), 4);
        assert_eq!(PieceKind::S.rotation_count(), 2);
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(PieceKind::Long.next_rotation(1), 0);
        assert_eq!(PieceKind::Box.next_rotation(0), 0);
        assert_eq!(PieceKind::L.shape(5), PieceKind::L.shape(1));
    }

    #[test]
    fn test_free_spaces() {
        assert_eq!(
            PieceKind::Long.free_spaces(0),
            FreeSpaces { left: 0, right: 0 }
        );
        assert_eq!(
            PieceKind::Long.free_spaces(1),
            FreeSpaces { left: 1, right: 2 }
        );
        assert_eq!(
            PieceKind::Box.free_spaces(0),
            FreeSpaces { left: 1, right: 1 }
        );
        assert_eq!(PieceKind::T.free_spaces(3), FreeSpaces { left: 1, right: 1 });
    }

    #[test]
    fn test_free_spaces_match_cells() {
        for kind in PieceKind::ALL {
            for rotation in 0..kind.rotation_count() {
                let shape = kind.shape(rotation);
                let min = shape.cells().map(|(dx, _)| dx).min().unwrap();
                let max = shape.cells().map(|(dx, _)| dx).max().unwrap();
                let free = shape.free_spaces();
                assert_eq!(free.left as i32, min);
                assert_eq!(free.right as i32, 3 - max);
            }
        }
    }
}
