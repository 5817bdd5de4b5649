//! Super Rotation System (SRS) wall kick data
//!
//! SRS defines the wall kicks attempted when rotating a piece.
//! If a rotation would cause collision, these offsets are tried in order.
//! Offsets are (dx, dy) with y growing downward, so the published tables
//! (y up) appear here with dy negated.

use crate::tetromino::{Rotation, TetrominoType};

const O_KICKS: [(i32, i32); 1] = [(0, 0)];

/// Get wall kick offsets for a rotation from `from` to `to`.
/// O pieces get the single identity offset; I and JLSTZ get 5 offsets for
/// every quarter-turn transition.
pub fn get_wall_kicks(piece_type: TetrominoType, from: Rotation, to: Rotation) -> &'static [(i32, i32)] {
    match piece_type {
        TetrominoType::O => &O_KICKS,
        TetrominoType::I => i_piece_kicks(from, to),
        _ => jlstz_kicks(from, to),
    }
}

/// Wall kicks for J, L, S, T, Z pieces
fn jlstz_kicks(from: Rotation, to: Rotation) -> &'static [(i32, i32)] {
    use Rotation::*;

    match (from, to) {
        // 0→R
        (North, East) => &[(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
        // R→0
        (East, North) => &[(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
        // R→2
        (East, South) => &[(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
        // 2→R
        (South, East) => &[(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
        // 2→L
        (South, West) => &[(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
        // L→2
        (West, South) => &[(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
        // L→0
        (West, North) => &[(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
        // 0→L
        (North, West) => &[(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
        _ => &O_KICKS,
    }
}

/// Wall kicks for I piece (different from other pieces)
fn i_piece_kicks(from: Rotation, to: Rotation) -> &'static [(i32, i32)] {
    use Rotation::*;

    match (from, to) {
        (North, East) => &[(0, 0), (-2, 0), (1, 0), (-2, 1), (1, -2)],
        (East, North) => &[(0, 0), (2, 0), (-1, 0), (2, -1), (-1, 2)],
        (East, South) => &[(0, 0), (-1, 0), (2, 0), (-1, -2), (2, 1)],
        (South, East) => &[(0, 0), (1, 0), (-2, 0), (1, 2), (-2, -1)],
        (South, West) => &[(0, 0), (2, 0), (-1, 0), (2, -1), (-1, 2)],
        (West, South) => &[(0, 0), (-2, 0), (1, 0), (-2, 1), (1, -2)],
        (West, North) => &[(0, 0), (1, 0), (-2, 0), (1, 2), (-2, -1)],
        (North, West) => &[(0, 0), (-1, 0), (2, 0), (-1, -2), (2, 1)],
        _ => &O_KICKS,
    }
}
