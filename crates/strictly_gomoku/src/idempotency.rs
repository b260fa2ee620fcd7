//! Duplicate-move detection.

use crate::types::{Coord, Side};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Identity of a move attempt: `(match, move number, x, y, side)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new)]
pub struct MoveKey {
    /// Match identifier.
    pub match_id: String,
    /// Move number the sender believed it was making.
    pub move_number: u32,
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
    /// Acting side.
    pub side: Side,
}

impl MoveKey {
    /// Key for a placement at `coord`.
    pub fn for_coord(
        match_id: impl Into<String>,
        move_number: u32,
        coord: Coord,
        side: Side,
    ) -> Self {
        Self::new(match_id.into(), move_number, coord.x, coord.y, side)
    }
}

/// Remembers recently accepted keys so replays of the same attempt are
/// absorbed instead of applied twice.
///
/// Bounded: once `capacity` keys are stored the oldest is forgotten.
#[derive(Debug, Clone)]
pub struct IdempotencyGuard {
    seen: HashSet<MoveKey>,
    order: VecDeque<MoveKey>,
    capacity: usize,
}

impl IdempotencyGuard {
    /// Default number of remembered keys.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a guard remembering up to `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Whether `key` was already recorded.
    pub fn is_duplicate(&self, key: &MoveKey) -> bool {
        self.seen.contains(key)
    }

    /// Records an accepted key. Returns `false` if it was already present.
    pub fn record(&mut self, key: MoveKey) -> bool {
        if self.seen.contains(&key) {
            debug!(?key, "Duplicate move key");
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.seen.insert(key)
    }

    /// Keys currently remembered.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for IdempotencyGuard {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_detected() {
        let mut guard = IdempotencyGuard::default();
        let key = MoveKey::for_coord("m1", 3, Coord::new(7, 7), Side::Black);
        assert!(guard.record(key.clone()));
        assert!(guard.is_duplicate(&key));
        assert!(!guard.record(key));
    }

    #[test]
    fn test_distinct_fields_are_distinct_keys() {
        let mut guard = IdempotencyGuard::default();
        assert!(guard.record(MoveKey::for_coord("m1", 3, Coord::new(7, 7), Side::Black)));
        assert!(guard.record(MoveKey::for_coord("m2", 3, Coord::new(7, 7), Side::Black)));
        assert!(guard.record(MoveKey::for_coord("m1", 4, Coord::new(7, 7), Side::Black)));
        assert!(guard.record(MoveKey::for_coord("m1", 3, Coord::new(7, 7), Side::White)));
        assert_eq!(guard.len(), 4);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut guard = IdempotencyGuard::new(2);
        let a = MoveKey::for_coord("m", 1, Coord::new(0, 0), Side::Black);
        let b = MoveKey::for_coord("m", 2, Coord::new(1, 0), Side::White);
        let c = MoveKey::for_coord("m", 3, Coord::new(2, 0), Side::Black);
        guard.record(a.clone());
        guard.record(b.clone());
        guard.record(c);
        assert!(!guard.is_duplicate(&a));
        assert!(guard.is_duplicate(&b));
    }
}
