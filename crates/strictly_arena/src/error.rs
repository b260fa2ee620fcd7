//! Host error types.

use crate::db::DbError;
use derive_more::{Display, Error};
use strictly_gomoku::{ConfigError, ReplayError, RuleViolation};

/// What went wrong in the host.
#[derive(Debug, Clone, Display)]
pub enum ArenaErrorKind {
    /// The engine rejected the action; nothing changed.
    #[display("{}", _0)]
    Rule(RuleViolation),
    /// Storage failed.
    #[display("{}", _0)]
    Db(DbError),
    /// Configuration was invalid.
    #[display("{}", _0)]
    Config(ConfigError),
    /// A stored match could not be rebuilt.
    #[display("{}", _0)]
    Replay(ReplayError),
    /// No live or stored match has this id.
    #[display("Match '{}' not found", _0)]
    MatchNotFound(String),
    /// The match actor has stopped.
    #[display("Match '{}' is no longer running", _0)]
    MatchClosed(String),
}

impl std::error::Error for ArenaErrorKind {}

/// Host error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{} at {}:{}", kind, file, line)]
pub struct ArenaError {
    /// Error kind.
    pub kind: ArenaErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ArenaError {
    /// Creates a new error with caller location tracking.
    #[track_caller]
    pub fn new(kind: ArenaErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// The rule violation, when the engine rejected the action.
    pub fn rule(&self) -> Option<&RuleViolation> {
        match &self.kind {
            ArenaErrorKind::Rule(violation) => Some(violation),
            _ => None,
        }
    }
}

impl From<RuleViolation> for ArenaError {
    #[track_caller]
    fn from(err: RuleViolation) -> Self {
        Self::new(ArenaErrorKind::Rule(err))
    }
}

impl From<DbError> for ArenaError {
    #[track_caller]
    fn from(err: DbError) -> Self {
        Self::new(ArenaErrorKind::Db(err))
    }
}

impl From<ConfigError> for ArenaError {
    #[track_caller]
    fn from(err: ConfigError) -> Self {
        Self::new(ArenaErrorKind::Config(err))
    }
}

impl From<ReplayError> for ArenaError {
    #[track_caller]
    fn from(err: ReplayError) -> Self {
        Self::new(ArenaErrorKind::Replay(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_gomoku::Side;

    #[test]
    fn test_rule_violation_exposed() {
        let err: ArenaError = RuleViolation::OutOfTurn(Side::White).into();
        assert_eq!(err.rule(), Some(&RuleViolation::OutOfTurn(Side::White)));
        assert!(err.file.ends_with("error.rs"));
        assert!(err.to_string().contains("White"));
    }

    #[test]
    fn test_not_found_has_no_rule() {
        let err = ArenaError::new(ArenaErrorKind::MatchNotFound("m-9".into()));
        assert!(err.rule().is_none());
        assert!(err.to_string().contains("m-9"));
    }
}
