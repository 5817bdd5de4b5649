//! Collision and transform primitives
//!
//! Everything here is a pure function over grid and piece values: inputs are
//! borrowed and a fresh value is returned, so callers can keep the previous
//! snapshot around (for example to compare before and after a rotation).

use crate::board::{EMPTY, Grid, PENALTY};
use crate::piece::Piece;
use crate::srs::get_wall_kicks;
use crate::tetromino::{RotationDirection, Shape};
use rand::Rng;
use rand::seq::index::sample;

/// Result of removing full rows from a grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearResult {
    pub grid: Grid,
    pub lines_cleared: usize,
}

/// Check whether `piece`, shifted by (dx, dy), fits on `grid`.
///
/// Cells left of column 0, right of the last column or below the last row
/// are out of bounds. Cells above row 0 are allowed; only cells inside the
/// grid are tested against occupied cells. A shape with no filled cells
/// always fits.
pub fn can_place(grid: &Grid, piece: &Piece, dx: i32, dy: i32) -> bool {
    let width = grid.width() as i32;
    let height = grid.height() as i32;
    piece.cells().all(|(x, y, _)| {
        let (x, y) = (x + dx, y + dy);
        if x < 0 || x >= width || y >= height {
            return false;
        }
        y < 0 || grid.get(x, y) == Some(EMPTY)
    })
}

/// Rotate a shape 90° clockwise. An N×M shape becomes M×N.
///
/// # Panics
///
/// Panics if the shape has no rows.
pub fn rotate_shape(shape: &[Vec<u8>]) -> Shape {
    assert!(!shape.is_empty(), "cannot rotate a shape with no rows");
    let rows = shape.len();
    let cols = shape[0].len();
    let mut rotated = vec![vec![0; rows]; cols];
    for (y, row) in shape.iter().enumerate() {
        for (x, &value) in row.iter().enumerate() {
            rotated[x][rows - 1 - y] = value;
        }
    }
    rotated
}

/// Rotate a shape 90° counter-clockwise. An N×M shape becomes M×N.
///
/// # Panics
///
/// Panics if the shape has no rows.
pub fn rotate_shape_ccw(shape: &[Vec<u8>]) -> Shape {
    assert!(!shape.is_empty(), "cannot rotate a shape with no rows");
    let rows = shape.len();
    let cols = shape[0].len();
    let mut rotated = vec![vec![0; rows]; cols];
    for (y, row) in shape.iter().enumerate() {
        for (x, &value) in row.iter().enumerate() {
            rotated[cols - 1 - x][y] = value;
        }
    }
    rotated
}

/// Rotate using SRS wall kicks.
///
/// Offsets for the transition are tried in table order and the first one
/// that fits wins. When nothing fits the original piece comes back as-is.
pub fn rotate_piece_with_kicks(grid: &Grid, piece: &Piece, direction: RotationDirection) -> Piece {
    rotate_piece_with_kicks_by(grid, piece, direction, |grid, candidate| {
        can_place(grid, candidate, 0, 0)
    })
}

/// [`rotate_piece_with_kicks`] with a caller-supplied placement check, for
/// rooms where more than the grid bounds constrain a piece
pub fn rotate_piece_with_kicks_by<F>(grid: &Grid, piece: &Piece, direction: RotationDirection, fits: F) -> Piece
where
    F: Fn(&Grid, &Piece) -> bool,
{
    let to = piece.rotation.step(direction);
    let shape = match direction {
        RotationDirection::Clockwise => rotate_shape(&piece.shape),
        RotationDirection::CounterClockwise => rotate_shape_ccw(&piece.shape),
    };

    get_wall_kicks(piece.kind, piece.rotation, to)
        .iter()
        .map(|&(dx, dy)| Piece {
            shape: shape.clone(),
            rotation: to,
            x: piece.x + dx,
            y: piece.y + dy,
            ..piece.clone()
        })
        .find(|candidate| fits(grid, candidate))
        .unwrap_or_else(|| piece.clone())
}

/// Translate a piece. No bounds or collision check: validate with
/// [`can_place`] first.
pub fn move_piece(piece: &Piece, dx: i32, dy: i32) -> Piece {
    Piece {
        x: piece.x + dx,
        y: piece.y + dy,
        ..piece.clone()
    }
}

/// Write the piece's cells into a copy of the grid.
/// Cells outside the grid are skipped; no piece means an unchanged copy.
pub fn lock_piece(grid: &Grid, piece: Option<&Piece>) -> Grid {
    let mut locked = grid.clone();
    if let Some(piece) = piece {
        for (x, y, raw) in piece.cells() {
            locked.set(x, y, piece.cell_value(raw));
        }
    }
    locked
}

/// Composite the falling piece over the grid for display
pub fn render_with_piece(grid: &Grid, piece: Option<&Piece>) -> Grid {
    lock_piece(grid, piece)
}

/// Remove every full row and pad the top with empty rows.
///
/// A row is full when no cell is empty and no cell is garbage, so garbage
/// rows never clear on their own.
pub fn clear_lines(grid: &Grid) -> ClearResult {
    let kept: Vec<Vec<u8>> = grid
        .rows()
        .iter()
        .filter(|row| !is_line_full(row))
        .cloned()
        .collect();
    let lines_cleared = grid.height() - kept.len();

    let mut rows = Vec::with_capacity(grid.height());
    rows.extend((0..lines_cleared).map(|_| grid.empty_row()));
    rows.extend(kept);

    ClearResult {
        grid: grid.with_rows(rows),
        lines_cleared,
    }
}

fn is_line_full(row: &[u8]) -> bool {
    row.iter().all(|&cell| cell != EMPTY && cell != PENALTY)
}

/// Push `count` garbage rows in from the bottom, dropping rows off the top
pub fn add_penalty_lines<R: Rng + ?Sized>(grid: &Grid, count: i32, rng: &mut R) -> Grid {
    if count <= 0 {
        return grid.clone();
    }
    let height = grid.height();
    let mut rows: Vec<Vec<u8>> = grid.rows().to_vec();
    rows.extend((0..count).map(|_| penalty_row(grid.width(), rng)));
    let overflow = rows.len() - height;
    grid.with_rows(rows.split_off(overflow))
}

/// Push `count` garbage rows in from the top, dropping rows off the bottom.
/// Used when gravity is reversed and the top edge is the floor.
pub fn add_penalty_lines_reverse<R: Rng + ?Sized>(grid: &Grid, count: i32, rng: &mut R) -> Grid {
    if count <= 0 {
        return grid.clone();
    }
    let height = grid.height();
    let mut rows: Vec<Vec<u8>> = (0..count).map(|_| penalty_row(grid.width(), rng)).collect();
    rows.extend(grid.rows().iter().cloned());
    rows.truncate(height);
    grid.with_rows(rows)
}

/// A garbage row with 1 to 3 holes at random columns
fn penalty_row<R: Rng + ?Sized>(width: usize, rng: &mut R) -> Vec<u8> {
    let mut row = vec![PENALTY; width];
    let gaps = rng.gen_range(1..=3).min(width);
    for x in sample(rng, width, gaps) {
        row[x] = EMPTY;
    }
    row
}
