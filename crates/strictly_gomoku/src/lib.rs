//! Rules engine for five-in-a-row with fair openings, skills and terrain.
//!
//! The engine is pure computation over in-memory state: no I/O, no clocks,
//! no sockets. A host feeds it actions one at a time and relays the
//! outcomes it returns.
//!
//! # Example
//!
//! ```
//! use strictly_gomoku::{Coord, MatchConfig, MatchEngine, Side};
//!
//! let mut engine = MatchEngine::new(MatchConfig::default()).unwrap();
//! let outcome = engine.apply_move(Side::Black, Coord::new(7, 7)).unwrap();
//! assert_eq!(outcome.next_side, Side::White);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod config;
pub mod contracts;
mod engine;
mod idempotency;
pub mod invariants;
mod replay;
pub mod rules;
pub mod skills;
mod state;
pub mod swap2;
pub mod terrain;
mod types;
mod variants;

pub use action::{EndReason, PlaceStone, RuleViolation};
pub use config::{ConfigError, HiddenPolicy, MatchConfig, Opening, TerrainPolicy};
pub use engine::{MatchEngine, MoveOutcome, SkillOutcome, Swap2Outcome, Verdict};
pub use idempotency::{IdempotencyGuard, MoveKey};
pub use replay::{GameEnding, MoveRecord, OpeningRecord, ReplayError, ReplayOptions, replay};
pub use skills::{LedgerDelta, SkillId, SkillLedger, SkillTarget};
pub use state::{
    GameResult, HistoryEntry, MatchSnapshot, MatchState, Outcome, SeriesScore, TurnOutcome,
};
pub use swap2::{ColorAssignment, Seat, Swap2Action, Swap2Phase};
pub use types::{Axis, Board, Cell, CellChange, Coord, Side, Stone, Terrain};
pub use variants::{
    CustomRules, HiddenRules, SkillRules, TerrainRules, Variant, VariantEvent, VariantRules,
    line_verdict,
};
