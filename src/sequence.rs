//! Shared piece sequence for a room
//!
//! Both players in a room are dealt pieces from the same list, so the list
//! has to be reproducible from a seed. A 32-bit linear congruential
//! generator picks each piece uniformly from the 7 types, 50 at a time.
//! This generator is only ever used for piece order; garbage holes come
//! from a separate RNG.

use crate::tetromino::TetrominoType;
use std::time::{SystemTime, UNIX_EPOCH};

/// Pieces generated per batch
pub const BATCH_SIZE: usize = 50;

const LCG_MULTIPLIER: u32 = 1_664_525;
const LCG_INCREMENT: u32 = 1_013_904_223;

/// Seeded LCG: `seed' = (seed * 1664525 + 1013904223) mod 2^32`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGenerator {
    state: u32,
}

impl SequenceGenerator {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed from the room name mixed with the current time
    pub fn for_room(room_name: &str) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self::new(room_seed(room_name, millis))
    }

    /// Next value in [0, 1)
    pub fn next_random(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        f64::from(self.state) / 4_294_967_296.0
    }

    pub fn next_type(&mut self) -> TetrominoType {
        let all = TetrominoType::all();
        let index = (self.next_random() * all.len() as f64).floor() as usize;
        all[index.min(all.len() - 1)]
    }

    /// Generate the next batch of pieces
    pub fn batch(&mut self) -> Vec<TetrominoType> {
        (0..BATCH_SIZE).map(|_| self.next_type()).collect()
    }
}

/// Combine a room name and a timestamp into a generator seed
pub fn room_seed(room_name: &str, now_millis: u64) -> u32 {
    let name_hash = room_name
        .chars()
        .fold(0u32, |acc, c| acc.wrapping_mul(31).wrapping_add(c as u32));
    name_hash.wrapping_add(now_millis as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TetrominoType::*;

    #[test]
    fn test_known_sequence() {
        let mut generator = SequenceGenerator::new(0);
        let first: Vec<_> = (0..8).map(|_| generator.next_type()).collect();
        assert_eq!(first, vec![O, O, J, Z, T, Z, T, Z]);
    }

    #[test]
    fn test_same_seed_same_batch() {
        let mut a = SequenceGenerator::new(42);
        let mut b = SequenceGenerator::new(42);
        assert_eq!(a.batch(), b.batch());
        assert_eq!(a.batch(), b.batch());
    }

    #[test]
    fn test_batch_size() {
        let mut generator = SequenceGenerator::new(1);
        assert_eq!(generator.batch().len(), BATCH_SIZE);
    }

    #[test]
    fn test_random_range() {
        let mut generator = SequenceGenerator::new(u32::MAX);
        for _ in 0..1000 {
            let r = generator.next_random();
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn test_all_types_appear() {
        let mut generator = SequenceGenerator::new(12345);
        let pieces: Vec<_> = (0..10).flat_map(|_| generator.batch()).collect();
        for kind in TetrominoType::all() {
            assert!(pieces.contains(&kind), "{} never dealt", kind.name());
        }
    }

    #[test]
    fn test_room_seed_depends_on_name_and_time() {
        assert_ne!(room_seed("alpha", 1000), room_seed("beta", 1000));
        assert_ne!(room_seed("alpha", 1000), room_seed("alpha", 1001));
        assert_eq!(room_seed("alpha", 1000), room_seed("alpha", 1000));
    }
}
