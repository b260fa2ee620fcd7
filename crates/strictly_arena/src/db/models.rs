//! Database rows and their conversions to engine types.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use strictly_gomoku::{
    Coord, EndReason, MatchConfig, MoveRecord, OpeningRecord, Outcome, Seat, Side,
};
use tracing::instrument;

use crate::db::{DbError, schema};

/// Lifecycle of a stored match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    /// Games are still being played.
    Active,
    /// The series has a winner.
    Finished,
}

impl MatchStatus {
    /// Converts status to the string stored in the database.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    /// Parses status from the string stored in the database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the string is not a valid status value.
    #[instrument(skip(s), fields(s = %s))]
    pub fn from_db_string(s: &str) -> Result<Self, DbError> {
        match s {
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            _ => Err(DbError::new(format!("Invalid match status: '{}'", s))),
        }
    }
}

fn parse_side(s: &str) -> Result<Side, DbError> {
    Side::from_db_str(s).ok_or_else(|| DbError::new(format!("Invalid side: '{}'", s)))
}

fn parse_seat(s: &str) -> Result<Seat, DbError> {
    Seat::from_db_str(s).ok_or_else(|| DbError::new(format!("Invalid seat: '{}'", s)))
}

fn parse_reason(s: &str) -> Result<EndReason, DbError> {
    EndReason::from_db_str(s).ok_or_else(|| DbError::new(format!("Invalid end reason: '{}'", s)))
}

fn to_u32(value: i32, column: &str) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_| DbError::new(format!("Negative {}: {}", column, value)))
}

/// Match database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::matches)]
pub struct MatchRow {
    id: String,
    config: String,
    first_player_id: String,
    second_player_id: String,
    status: String,
    winner: Option<String>,
    winner_user_id: Option<String>,
    result: Option<String>,
    total_moves: i32,
    created_at: NaiveDateTime,
    ended_at: Option<NaiveDateTime>,
}

impl MatchRow {
    /// Deserializes the stored match configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored JSON does not parse.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn match_config(&self) -> Result<MatchConfig, DbError> {
        Ok(serde_json::from_str(&self.config)?)
    }

    /// Seat that won the series, once finished.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for an unknown seat string.
    pub fn winning_seat(&self) -> Result<Option<Seat>, DbError> {
        self.winner.as_deref().map(parse_seat).transpose()
    }

    /// Parses the stored status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on an unknown status string.
    pub fn parse_status(&self) -> Result<MatchStatus, DbError> {
        MatchStatus::from_db_string(&self.status)
    }
}

/// Insertable match model.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::matches)]
pub struct NewMatchRow {
    id: String,
    config: String,
    first_player_id: String,
    second_player_id: String,
}

/// Final fields written when a series ends.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct MatchFinish {
    /// Seat that won the series.
    pub winner: Seat,
    /// Player id behind the winning side.
    pub winner_user_id: String,
    /// How the deciding game ended.
    pub result: EndReason,
    /// Moves across the whole series.
    pub total_moves: u32,
}

/// Persisted move, shaped after the public move-record contract.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::moves)]
pub struct MoveRow {
    id: i32,
    match_id: String,
    game_number: i32,
    player_user_id: String,
    position_x: i32,
    position_y: i32,
    turn_player: String,
    move_number: i32,
    is_winning_move: bool,
    created_at: NaiveDateTime,
}

impl MoveRow {
    /// Converts the row into an engine replay record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for negative numbers or an unknown side.
    #[instrument(skip(self), fields(match_id = %self.match_id, move_number = self.move_number))]
    pub fn to_record(&self) -> Result<MoveRecord, DbError> {
        Ok(MoveRecord::new(
            to_u32(self.game_number, "game_number")?,
            to_u32(self.move_number, "move_number")?,
            Coord::new(
                to_u32(self.position_x, "position_x")? as usize,
                to_u32(self.position_y, "position_y")? as usize,
            ),
            parse_side(&self.turn_player)?,
        ))
    }
}

/// Insertable move model.
#[derive(Debug, Clone, Insertable, Getters)]
#[diesel(table_name = schema::moves)]
pub struct NewMoveRow {
    match_id: String,
    game_number: i32,
    player_user_id: String,
    position_x: i32,
    position_y: i32,
    turn_player: String,
    move_number: i32,
    is_winning_move: bool,
}

impl NewMoveRow {
    /// Builds a row from an engine record.
    pub fn from_record(
        match_id: impl Into<String>,
        player_user_id: impl Into<String>,
        record: &MoveRecord,
        is_winning_move: bool,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            game_number: record.game_number as i32,
            player_user_id: player_user_id.into(),
            position_x: record.coord.x as i32,
            position_y: record.coord.y as i32,
            turn_player: record.side.to_db_str().to_string(),
            move_number: record.move_number as i32,
            is_winning_move,
        }
    }
}

/// Swap2 decisions of one game.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::openings)]
pub struct OpeningRow {
    id: i32,
    match_id: String,
    game_number: i32,
    deferred: bool,
    assignment: Option<String>,
}

impl OpeningRow {
    /// Converts the row into the engine's replay input.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for a negative game number or unparsable colours.
    #[instrument(skip(self), fields(match_id = %self.match_id, game = self.game_number))]
    pub fn to_record(&self) -> Result<OpeningRecord, DbError> {
        let assignment = self
            .assignment
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(OpeningRecord::new(
            to_u32(self.game_number, "game_number")?,
            self.deferred,
            assignment,
        ))
    }
}

/// Insertable swap2 decisions.
#[derive(Debug, Clone, Insertable, Getters)]
#[diesel(table_name = schema::openings)]
pub struct NewOpeningRow {
    match_id: String,
    game_number: i32,
    deferred: bool,
    assignment: Option<String>,
}

impl NewOpeningRow {
    /// Builds a row from an engine record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the colours fail to serialize.
    pub fn from_record(
        match_id: impl Into<String>,
        record: &OpeningRecord,
    ) -> Result<Self, DbError> {
        Ok(Self {
            match_id: match_id.into(),
            game_number: record.game_number as i32,
            deferred: record.deferred,
            assignment: record.assignment.as_ref().map(serde_json::to_string).transpose()?,
        })
    }
}

/// Finished game model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::games)]
pub struct GameRow {
    id: i32,
    match_id: String,
    game_number: i32,
    winner: Option<String>,
    reason: String,
    total_moves: i32,
    ended_at: NaiveDateTime,
}

impl GameRow {
    /// The game's outcome.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for an unknown side string.
    pub fn outcome(&self) -> Result<Outcome, DbError> {
        match &self.winner {
            Some(side) => Ok(Outcome::Winner(parse_side(side)?)),
            None => Ok(Outcome::Draw),
        }
    }

    /// Why the game ended.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for an unknown reason string.
    pub fn end_reason(&self) -> Result<EndReason, DbError> {
        parse_reason(&self.reason)
    }
}

/// Insertable finished game.
#[derive(Debug, Clone, Insertable, Getters)]
#[diesel(table_name = schema::games)]
pub struct NewGameRow {
    match_id: String,
    game_number: i32,
    winner: Option<String>,
    reason: String,
    total_moves: i32,
}

impl NewGameRow {
    /// Builds a row for a game that just ended.
    pub fn new(
        match_id: impl Into<String>,
        game_number: u32,
        outcome: Outcome,
        reason: EndReason,
        total_moves: u32,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            game_number: game_number as i32,
            winner: outcome.winner().map(|s| s.to_db_str().to_string()),
            reason: reason.to_string(),
            total_moves: total_moves as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [MatchStatus::Active, MatchStatus::Finished] {
            assert_eq!(MatchStatus::from_db_string(status.to_db_string()).unwrap(), status);
        }
        assert!(MatchStatus::from_db_string("paused").is_err());
    }

    #[test]
    fn test_new_game_row_stores_draw_as_null() {
        let row = NewGameRow::new("m", 2, Outcome::Draw, EndReason::BoardFull, 225);
        assert!(row.winner().is_none());
        assert_eq!(row.reason(), "board_full");
    }

    #[test]
    fn test_opening_row_keeps_pending_choice_empty() {
        let row = NewOpeningRow::from_record("m", &OpeningRecord::new(1, true, None)).unwrap();
        assert!(*row.deferred());
        assert!(row.assignment().is_none());
    }

    #[test]
    fn test_move_row_shape() {
        let record = MoveRecord::new(1, 3, Coord::new(4, 9), Side::White);
        let row = NewMoveRow::from_record("m", "bob", &record, false);
        assert_eq!(row.turn_player(), "white");
        assert_eq!(*row.position_x(), 4);
        assert_eq!(*row.position_y(), 9);
        assert_eq!(*row.move_number(), 3);
    }
}
