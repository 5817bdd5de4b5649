//! A room occupant and their private simulation

use crate::board::Grid;
use crate::piece::{Gravity, Piece};
use crate::protocol::{PieceSummary, PlayerId};
use crate::score::Score;
use crate::tetromino::TetrominoType;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub grid: Grid,
    pub current_piece: Option<Piece>,
    pub next_piece: Option<Piece>,
    /// Private copy of the room's shared sequence
    pub sequence: Vec<TetrominoType>,
    /// Index of the next entry in `sequence` to become the next piece
    pub cursor: usize,
    pub soft_dropping: bool,
    pub score: Score,
    /// Set when this player's spawn was blocked
    pub eliminated: bool,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            grid: Grid::default(),
            current_piece: None,
            next_piece: None,
            sequence: Vec::new(),
            cursor: 0,
            soft_dropping: false,
            score: Score::new(),
            eliminated: false,
        }
    }

    /// Deal the opening pieces from a fresh copy of the shared sequence
    pub fn start(&mut self, sequence: &[TetrominoType], gravity: Gravity) {
        self.reset();
        self.sequence = sequence.to_vec();
        self.current_piece = self.sequence.first().map(|&kind| Piece::spawn(kind, gravity));
        self.next_piece = self.sequence.get(1).map(|&kind| Piece::spawn(kind, gravity));
        self.cursor = 2;
    }

    /// Back to the pre-game state
    pub fn reset(&mut self) {
        self.grid = Grid::default();
        self.current_piece = None;
        self.next_piece = None;
        self.sequence.clear();
        self.cursor = 0;
        self.soft_dropping = false;
        self.score = Score::new();
        self.eliminated = false;
    }

    /// Still in the running: game dealt and not eliminated
    pub fn is_active(&self) -> bool {
        !self.eliminated && self.current_piece.is_some()
    }

    /// Whether the private sequence needs another batch before the next deal
    pub fn needs_refill(&self) -> bool {
        self.cursor >= self.sequence.len()
    }

    /// Take the next entry of the private sequence, advancing the cursor.
    /// Callers refill first, so this only returns None on an empty sequence.
    pub fn deal(&mut self, gravity: Gravity) -> Option<Piece> {
        let kind = *self.sequence.get(self.cursor)?;
        self.cursor += 1;
        Some(Piece::spawn(kind, gravity))
    }

    pub fn next_piece_summary(&self) -> Option<PieceSummary> {
        self.next_piece.as_ref().map(|piece| PieceSummary {
            kind: piece.kind,
            shape: piece.shape.clone(),
            color: piece.color,
            rotation: piece.rotation.index(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TetrominoType::*;

    #[test]
    fn test_start_deals_first_two() {
        let mut player = Player::new("c1", "ann");
        player.start(&[T, S, Z, O], Gravity::Down);
        assert_eq!(player.current_piece.as_ref().map(|p| p.kind), Some(T));
        assert_eq!(player.next_piece.as_ref().map(|p| p.kind), Some(S));
        assert_eq!(player.cursor, 2);
        assert!(player.is_active());
    }

    #[test]
    fn test_deal_advances_cursor() {
        let mut player = Player::new("c1", "ann");
        player.start(&[T, S, Z], Gravity::Down);
        assert_eq!(player.deal(Gravity::Down).map(|p| p.kind), Some(Z));
        assert!(player.needs_refill());
        assert_eq!(player.deal(Gravity::Down), None);
    }

    #[test]
    fn test_next_piece_summary() {
        let mut player = Player::new("c1", "ann");
        assert_eq!(player.next_piece_summary(), None);
        player.start(&[T, L], Gravity::Down);
        let summary = player.next_piece_summary().unwrap();
        assert_eq!(summary.kind, L);
        assert_eq!(summary.color, L.color());
        assert_eq!(summary.rotation, 0);
        assert_eq!(summary.shape, L.shape());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut player = Player::new("c1", "ann");
        player.start(&[I, O], Gravity::Down);
        player.grid.set(0, 19, 1);
        player.score.add_clear(2);
        player.soft_dropping = true;
        player.reset();
        assert!(player.grid.is_empty());
        assert!(player.current_piece.is_none());
        assert!(player.sequence.is_empty());
        assert_eq!(player.score.points, 0);
        assert!(!player.soft_dropping);
        assert!(!player.is_active());
    }
}
