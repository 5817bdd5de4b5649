//! Game board representation and spectrum computation

use serde::{Deserialize, Serialize};

/// Standard Tetris board dimensions
pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;

/// Cell value for an empty cell
pub const EMPTY: u8 = 0;
/// Cell value for a garbage (penalty) cell, never cleared by line clears
pub const PENALTY: u8 = 8;

/// A player's grid. Row 0 is the top, rows grow downward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    rows: Vec<Vec<u8>>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(BOARD_WIDTH, BOARD_HEIGHT)
    }
}

impl Grid {
    /// Create a new empty grid
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rows: vec![vec![EMPTY; width]; height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    /// Get the cell at (x, y).
    /// Returns None if out of bounds
    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 {
            return None;
        }
        self.rows.get(y as usize)?.get(x as usize).copied()
    }

    /// Set a cell at (x, y).
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i32, y: i32, cell: u8) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        match self.rows.get_mut(y as usize).and_then(|row| row.get_mut(x as usize)) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// Replace all rows at once. Row count and width must be preserved.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<u8>>) -> Self {
        debug_assert_eq!(rows.len(), self.height);
        debug_assert!(rows.iter().all(|row| row.len() == self.width));
        Self {
            width: self.width,
            height: self.height,
            rows,
        }
    }

    pub(crate) fn empty_row(&self) -> Vec<u8> {
        vec![EMPTY; self.width]
    }

    /// The same grid upside down
    pub fn flipped(&self) -> Self {
        let mut rows = self.rows.clone();
        rows.reverse();
        self.with_rows(rows)
    }

    /// Check if the grid is completely empty
    pub fn is_empty(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|&cell| cell == EMPTY))
    }

    /// Column heights as seen by an opponent, measured from the bottom edge.
    /// An empty column has height 0.
    pub fn spectrum(&self) -> Vec<u8> {
        (0..self.width)
            .map(|x| {
                self.rows
                    .iter()
                    .position(|row| row[x] != EMPTY)
                    .map_or(0, |top| (self.height - top) as u8)
            })
            .collect()
    }

    /// Column heights measured from the top edge, for reverse gravity where
    /// the stack grows downward from row 0.
    pub fn spectrum_reversed(&self) -> Vec<u8> {
        (0..self.width)
            .map(|x| {
                self.rows
                    .iter()
                    .rposition(|row| row[x] != EMPTY)
                    .map_or(0, |bottom| (bottom + 1) as u8)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_empty() {
        let grid = Grid::default();
        assert!(grid.is_empty());
        assert_eq!(grid.rows().len(), BOARD_HEIGHT);
        assert!(grid.rows().iter().all(|row| row.len() == BOARD_WIDTH));
    }

    #[test]
    fn test_set_and_get() {
        let mut grid = Grid::default();
        assert!(grid.set(5, 5, 3));
        assert_eq!(grid.get(5, 5), Some(3));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut grid = Grid::default();
        assert_eq!(grid.get(-1, 0), None);
        assert_eq!(grid.get(0, -1), None);
        assert_eq!(grid.get(0, BOARD_HEIGHT as i32), None);
        assert_eq!(grid.get(BOARD_WIDTH as i32, 0), None);
        assert!(!grid.set(BOARD_WIDTH as i32, 0, 1));
    }

    #[test]
    fn test_clone_is_deep() {
        let original = Grid::default();
        let mut copy = original.clone();
        copy.set(0, 0, 1);
        assert_eq!(original.get(0, 0), Some(EMPTY));
        assert_eq!(Grid::new(0, 0).clone(), Grid::new(0, 0));
    }

    #[test]
    fn test_spectrum() {
        let mut grid = Grid::default();
        assert_eq!(grid.spectrum(), vec![0; BOARD_WIDTH]);

        grid.set(0, 19, 1);
        grid.set(3, 15, PENALTY);
        grid.set(3, 19, 2);
        let spectrum = grid.spectrum();
        assert_eq!(spectrum[0], 1);
        assert_eq!(spectrum[3], 5);
        assert_eq!(spectrum[9], 0);
    }

    #[test]
    fn test_flipped() {
        let mut grid = Grid::default();
        grid.set(1, 0, 4);
        let flipped = grid.flipped();
        assert_eq!(flipped.get(1, 19), Some(4));
        assert_eq!(flipped.flipped(), grid);
    }

    #[test]
    fn test_spectrum_reversed() {
        let mut grid = Grid::default();
        grid.set(2, 0, 1);
        grid.set(4, 3, 1);
        let spectrum = grid.spectrum_reversed();
        assert_eq!(spectrum[2], 1);
        assert_eq!(spectrum[4], 4);
        assert_eq!(spectrum[0], 0);
    }
}
