//! Per-player scoring, reported in room updates

use serde::{Deserialize, Serialize};

/// Base points for clearing 1, 2, 3 or 4+ rows at once, scaled by level
const CLEAR_POINTS: [u64; 4] = [100, 300, 500, 800];

/// Rows cleared per level
const LINES_PER_LEVEL: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub points: u64,
    /// Starts at 1
    pub level: u32,
    pub lines: u32,
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}

impl Score {
    pub fn new() -> Self {
        Self {
            points: 0,
            level: 1,
            lines: 0,
        }
    }

    /// Credit a lock that cleared `lines` rows; the level in effect before
    /// the clear sets the multiplier
    pub fn add_clear(&mut self, lines: usize) {
        let Some(index) = lines.checked_sub(1) else {
            return;
        };
        let base = CLEAR_POINTS[index.min(CLEAR_POINTS.len() - 1)];
        self.points += base * u64::from(self.level);
        self.lines += lines as u32;
        self.level = self.lines / LINES_PER_LEVEL + 1;
    }

    /// One point per row stepped by soft drop
    pub fn add_soft_drop(&mut self, cells: u32) {
        self.points += u64::from(cells);
    }

    /// Two points per row skipped by hard drop
    pub fn add_hard_drop(&mut self, cells: u32) {
        self.points += 2 * u64::from(cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_clear() {
        let mut score = Score::new();
        score.add_clear(1);
        assert_eq!(score.points, 100);
        assert_eq!(score.lines, 1);
    }

    #[test]
    fn test_tetris() {
        let mut score = Score::new();
        score.add_clear(4);
        assert_eq!(score.points, 800);
        assert_eq!(score.lines, 4);
    }

    #[test]
    fn test_no_clear_scores_nothing() {
        let mut score = Score::new();
        score.add_clear(0);
        assert_eq!(score, Score::new());
    }

    #[test]
    fn test_level_up() {
        let mut score = Score::new();
        for _ in 0..10 {
            score.add_clear(1);
        }
        assert_eq!(score.level, 2);
        score.add_clear(1);
        assert_eq!(score.points, 1000 + 200);
    }

    #[test]
    fn test_drops() {
        let mut score = Score::new();
        score.add_soft_drop(3);
        score.add_hard_drop(10);
        assert_eq!(score.points, 23);
    }
}
