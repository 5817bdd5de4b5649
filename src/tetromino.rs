//! Tetromino definitions and shapes
//!
//! All 7 standard tetrominoes as bounding-box matrices in SRS spawn orientation.
//! Rows grow downward, columns grow rightward.

use serde::{Deserialize, Serialize};

/// A bounding-box matrix where non-zero marks a filled sub-cell
pub type Shape = Vec<Vec<u8>>;

/// The 7 tetromino types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TetrominoType {
    I, // Cyan - long bar
    O, // Yellow - square
    T, // Purple - T-shape
    S, // Green - S-shape
    Z, // Red - Z-shape
    J, // Blue - J-shape
    L, // Orange - L-shape
}

impl TetrominoType {
    /// Color token written into the grid when this piece locks.
    /// Matches the cell indices used on the wire (0 is empty, 8 is garbage).
    pub fn color(&self) -> u8 {
        match self {
            TetrominoType::I => 1,
            TetrominoType::O => 2,
            TetrominoType::T => 3,
            TetrominoType::S => 4,
            TetrominoType::Z => 5,
            TetrominoType::J => 6,
            TetrominoType::L => 7,
        }
    }

    /// All tetromino types, in the order the sequence generator indexes them
    pub fn all() -> [TetrominoType; 7] {
        [
            TetrominoType::I,
            TetrominoType::O,
            TetrominoType::T,
            TetrominoType::S,
            TetrominoType::Z,
            TetrominoType::J,
            TetrominoType::L,
        ]
    }

    /// Spawn-orientation shape: 4x4 for I, 2x2 for O, 3x3 for the rest
    pub fn shape(&self) -> Shape {
        match self {
            TetrominoType::I => vec![
                vec![0, 0, 0, 0],
                vec![1, 1, 1, 1],
                vec![0, 0, 0, 0],
                vec![0, 0, 0, 0],
            ],
            TetrominoType::O => vec![vec![1, 1], vec![1, 1]],
            TetrominoType::T => vec![vec![0, 1, 0], vec![1, 1, 1], vec![0, 0, 0]],
            // .SS
            // SS.
            TetrominoType::S => vec![vec![0, 1, 1], vec![1, 1, 0], vec![0, 0, 0]],
            // ZZ.
            // .ZZ
            TetrominoType::Z => vec![vec![1, 1, 0], vec![0, 1, 1], vec![0, 0, 0]],
            TetrominoType::J => vec![vec![1, 0, 0], vec![1, 1, 1], vec![0, 0, 0]],
            TetrominoType::L => vec![vec![0, 0, 1], vec![1, 1, 1], vec![0, 0, 0]],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TetrominoType::I => "I",
            TetrominoType::O => "O",
            TetrominoType::T => "T",
            TetrominoType::S => "S",
            TetrominoType::Z => "Z",
            TetrominoType::J => "J",
            TetrominoType::L => "L",
        }
    }
}

/// Rotation states (using SRS naming convention)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    North, // Spawn state
    East,  // Clockwise from North
    South, // 180 from North
    West,  // Counter-clockwise from North
}

impl Rotation {
    /// Rotate clockwise: North → East → South → West → North
    pub fn cw(&self) -> Rotation {
        match self {
            Rotation::North => Rotation::East,
            Rotation::East => Rotation::South,
            Rotation::South => Rotation::West,
            Rotation::West => Rotation::North,
        }
    }

    /// Rotate counter-clockwise: North → West → South → East → North
    pub fn ccw(&self) -> Rotation {
        match self {
            Rotation::North => Rotation::West,
            Rotation::West => Rotation::South,
            Rotation::South => Rotation::East,
            Rotation::East => Rotation::North,
        }
    }

    /// Rotation index r in 0..4 (0 = spawn)
    pub fn index(&self) -> u8 {
        match self {
            Rotation::North => 0,
            Rotation::East => 1,
            Rotation::South => 2,
            Rotation::West => 3,
        }
    }

    pub fn step(&self, direction: RotationDirection) -> Rotation {
        match direction {
            RotationDirection::Clockwise => self.cw(),
            RotationDirection::CounterClockwise => self.ccw(),
        }
    }
}

/// Direction for rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shape_has_four_cells() {
        for kind in TetrominoType::all() {
            let filled: usize = kind
                .shape()
                .iter()
                .map(|row| row.iter().filter(|&&c| c != 0).count())
                .sum();
            assert_eq!(filled, 4, "{} should have 4 cells", kind.name());
        }
    }

    #[test]
    fn test_shape_sizes() {
        assert_eq!(TetrominoType::I.shape().len(), 4);
        assert_eq!(TetrominoType::O.shape().len(), 2);
        assert_eq!(TetrominoType::T.shape().len(), 3);
    }

    #[test]
    fn test_rotation_cycle() {
        let mut r = Rotation::North;
        for expected in [1, 2, 3, 0] {
            r = r.cw();
            assert_eq!(r.index(), expected);
        }
        assert_eq!(Rotation::North.ccw(), Rotation::West);
    }
}
