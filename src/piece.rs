//! Falling piece value type

use crate::board::{BOARD_HEIGHT, BOARD_WIDTH};
use crate::tetromino::{Rotation, Shape, TetrominoType};
use serde::{Deserialize, Serialize};

/// Which way pieces fall in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gravity {
    /// Pieces spawn at the top and fall toward the last row
    #[default]
    Down,
    /// Pieces spawn at the bottom and rise toward row 0
    Up,
}

impl Gravity {
    /// Vertical step applied by one gravity tick
    pub fn dy(&self) -> i32 {
        match self {
            Gravity::Down => 1,
            Gravity::Up => -1,
        }
    }
}

/// A piece positioned over a grid.
///
/// Transform operations in [`crate::engine`] take a piece by reference and
/// return a new one; a piece is never mutated in place once dealt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: TetrominoType,
    pub shape: Shape,
    /// Color token written on lock; 0 means "use the raw shape value"
    pub color: u8,
    /// Column of the shape's top-left corner
    pub x: i32,
    /// Row of the shape's top-left corner, may be negative
    pub y: i32,
    pub rotation: Rotation,
}

impl Piece {
    /// Create a new piece at the normal spawn position (top center)
    pub fn new(kind: TetrominoType) -> Self {
        Self::spawn(kind, Gravity::Down)
    }

    /// Create a piece at the spawn position for the given gravity
    pub fn spawn(kind: TetrominoType, gravity: Gravity) -> Self {
        let shape = kind.shape();
        let size = shape.len() as i32;
        let x = (BOARD_WIDTH as i32 - size) / 2;
        let y = match gravity {
            Gravity::Down => 0,
            Gravity::Up => {
                // Lowest filled row sits on the last grid row
                let last_filled = shape
                    .iter()
                    .rposition(|row| row.iter().any(|&c| c != 0))
                    .unwrap_or(0) as i32;
                BOARD_HEIGHT as i32 - 1 - last_filled
            }
        };
        Self {
            kind,
            color: kind.color(),
            shape,
            x,
            y,
            rotation: Rotation::North,
        }
    }

    /// Absolute (x, y) of every filled sub-cell
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, u8)> + '_ {
        self.shape.iter().enumerate().flat_map(move |(sy, row)| {
            row.iter().enumerate().filter_map(move |(sx, &value)| {
                (value != 0).then_some((self.x + sx as i32, self.y + sy as i32, value))
            })
        })
    }

    /// Value written into the grid for a filled sub-cell
    pub fn cell_value(&self, raw: u8) -> u8 {
        if self.color != 0 { self.color } else { raw }
    }
}
