//! Events relayed to match observers after each accepted action.

use serde::{Deserialize, Serialize};
use strictly_gomoku::{
    LedgerDelta, MoveOutcome, Seat, Side, SkillId, SkillOutcome, Swap2Outcome, TurnOutcome,
    Verdict,
};

/// Something that happened in a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    /// A stone was placed (or swallowed by a hidden block).
    MovePlayed {
        /// Match.
        match_id: String,
        /// Player behind the moving side.
        player_id: String,
        /// Engine result.
        outcome: MoveOutcome,
    },
    /// An opening action was accepted.
    OpeningStep {
        /// Match.
        match_id: String,
        /// Acting seat.
        seat: Seat,
        /// Engine result.
        outcome: Swap2Outcome,
    },
    /// A skill resolved.
    SkillUsed {
        /// Match.
        match_id: String,
        /// Caster.
        side: Side,
        /// Skill.
        skill: SkillId,
        /// Engine result.
        outcome: SkillOutcome,
    },
    /// A candidate was paid for and held.
    SkillHeld {
        /// Match.
        match_id: String,
        /// Ledger change.
        delta: LedgerDelta,
    },
    /// A turn was ended explicitly.
    TurnEnded {
        /// Match.
        match_id: String,
        /// Engine result.
        outcome: TurnOutcome,
    },
    /// A game reached a result.
    GameEnded {
        /// Match.
        match_id: String,
        /// Game within the series.
        game_number: u32,
        /// Result and series score.
        verdict: Verdict,
    },
    /// The next game of the series began.
    GameStarted {
        /// Match.
        match_id: String,
        /// New game number.
        game_number: u32,
    },
    /// A seat took the series.
    MatchFinished {
        /// Match.
        match_id: String,
        /// Winning seat.
        winner: Seat,
        /// Player behind it.
        winner_user_id: String,
    },
}

impl MatchEvent {
    /// Match the event belongs to.
    pub fn match_id(&self) -> &str {
        match self {
            Self::MovePlayed { match_id, .. }
            | Self::OpeningStep { match_id, .. }
            | Self::SkillUsed { match_id, .. }
            | Self::SkillHeld { match_id, .. }
            | Self::TurnEnded { match_id, .. }
            | Self::GameEnded { match_id, .. }
            | Self::GameStarted { match_id, .. }
            | Self::MatchFinished { match_id, .. } => match_id,
        }
    }

    /// Wire form for relaying to clients.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; the event types always serialize.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged() {
        let event = MatchEvent::GameStarted {
            match_id: "m-1".into(),
            game_number: 2,
        };
        let json = event.to_json().unwrap();
        assert!(json.contains(r#""type":"game_started""#));
        let back: MatchEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.match_id(), "m-1");
    }
}
