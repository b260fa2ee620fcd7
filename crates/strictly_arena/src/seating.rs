//! Which player sits in which seat.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use strictly_gomoku::{MatchState, Seat, Side};

/// The two players bound to a match, by seat.
///
/// The first seat plays Black in a standard opening and builds the position
/// in a swap2 opening; colours follow the match's assignment after that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_new::new)]
pub struct Seating {
    /// Player in the first seat.
    first: String,
    /// Player in the second seat.
    second: String,
}

impl Seating {
    /// Player in `seat`.
    pub fn player(&self, seat: Seat) -> &str {
        match seat {
            Seat::First => &self.first,
            Seat::Second => &self.second,
        }
    }

    /// Player currently playing `side` in `state`.
    pub fn player_for(&self, state: &MatchState, side: Side) -> &str {
        self.player(state.seat_of(side))
    }

    /// Seat of `player_id`, if seated.
    pub fn seat_of(&self, player_id: &str) -> Option<Seat> {
        if self.first == player_id {
            Some(Seat::First)
        } else if self.second == player_id {
            Some(Seat::Second)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_gomoku::{MatchConfig, MatchEngine};

    #[test]
    fn test_standard_seating_maps_first_to_black() {
        let seating = Seating::new("alice".into(), "bob".into());
        let engine = MatchEngine::new(MatchConfig::default()).unwrap();
        assert_eq!(seating.player_for(engine.state(), Side::Black), "alice");
        assert_eq!(seating.player_for(engine.state(), Side::White), "bob");
        assert_eq!(seating.seat_of("bob"), Some(Seat::Second));
        assert_eq!(seating.seat_of("carol"), None);
    }
}
