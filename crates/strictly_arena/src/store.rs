//! Match persistence behind an async trait.
//!
//! The actor never waits on storage for a reply; it hands finished results to
//! a writer task that calls into a [`MatchStore`].

use crate::db::{
    DbError, MatchFinish, MatchRepository, MatchStatus, NewGameRow, NewMatchRow, NewMoveRow,
    NewOpeningRow,
};
use crate::seating::Seating;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use strictly_gomoku::{
    EndReason, GameEnding, MatchConfig, MoveRecord, OpeningRecord, Outcome, ReplayOptions, Seat,
};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// A match about to be stored.
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct NewMatch {
    /// Match identifier.
    pub match_id: String,
    /// Rules.
    pub config: MatchConfig,
    /// Players.
    pub seating: Seating,
}

/// Everything needed to rebuild a match.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMatch {
    /// Match identifier.
    pub match_id: String,
    /// Rules.
    pub config: MatchConfig,
    /// Players.
    pub seating: Seating,
    /// Swap2 decisions per game.
    pub openings: Vec<OpeningRecord>,
    /// Moves ordered by game and move number.
    pub moves: Vec<MoveRecord>,
    /// Finished games.
    pub games: Vec<FinishedGame>,
    /// Lifecycle.
    pub status: MatchStatus,
}

impl StoredMatch {
    /// Extra inputs replay needs beyond the move list.
    pub fn replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            openings: self.openings.clone(),
            endings: self
                .games
                .iter()
                .filter_map(|g| {
                    g.outcome
                        .winner()
                        .map(|winner| GameEnding::new(g.game_number, winner, g.reason))
                })
                .collect(),
        }
    }
}

/// One placement in the external move-record shape.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct PersistedMove {
    /// Match identifier.
    pub match_id: String,
    /// Player behind the moving side.
    pub player_user_id: String,
    /// Engine record.
    pub record: MoveRecord,
    /// Whether the move completed a line.
    pub is_winning_move: bool,
}

/// A game that reached a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new)]
pub struct FinishedGame {
    /// Game within the series.
    pub game_number: u32,
    /// Result.
    pub outcome: Outcome,
    /// Cause.
    pub reason: EndReason,
    /// Moves in the game.
    pub total_moves: u32,
}

/// Summary row for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    /// Match identifier.
    pub match_id: String,
    /// Lifecycle.
    pub status: MatchStatus,
    /// Seat that won the series, once finished.
    pub winner: Option<Seat>,
    /// Recorded move total.
    pub total_moves: u32,
}

/// Storage for matches, moves and results.
#[async_trait]
pub trait MatchStore: Send + Sync + std::fmt::Debug {
    /// Creates the match record.
    async fn create_match(&self, new: &NewMatch) -> Result<(), DbError>;

    /// Loads a match with its moves and finished games.
    async fn load_match(&self, match_id: &str) -> Result<Option<StoredMatch>, DbError>;

    /// Lists stored matches.
    async fn list_matches(&self) -> Result<Vec<MatchSummary>, DbError>;

    /// Records a game's swap2 decisions, replacing earlier ones for that game.
    async fn record_opening(&self, match_id: &str, opening: OpeningRecord) -> Result<(), DbError>;

    /// Records a move. Returns `false` if it was already stored.
    async fn record_move(&self, mv: PersistedMove) -> Result<bool, DbError>;

    /// Records a finished game. Returns `false` if it was already stored.
    async fn record_game(&self, match_id: &str, game: FinishedGame) -> Result<bool, DbError>;

    /// Marks the series finished.
    async fn finish_match(&self, match_id: &str, finish: MatchFinish) -> Result<(), DbError>;
}

/// [`MatchStore`] over the SQLite repository; each call runs on the
/// blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    repo: MatchRepository,
}

impl SqliteStore {
    /// Opens (and migrates) the database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or migrated.
    #[instrument]
    pub async fn open(db_path: &str) -> Result<Self, DbError> {
        let path = db_path.to_string();
        let repo = tokio::task::spawn_blocking(move || MatchRepository::open(path))
            .await
            .map_err(|e| DbError::new(format!("Blocking task failed: {}", e)))??;
        Ok(Self { repo })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(MatchRepository) -> Result<T, DbError> + Send + 'static,
    {
        let repo = self.repo.clone();
        tokio::task::spawn_blocking(move || f(repo))
            .await
            .map_err(|e| DbError::new(format!("Blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl MatchStore for SqliteStore {
    #[instrument(skip(self, new), fields(match_id = %new.match_id))]
    async fn create_match(&self, new: &NewMatch) -> Result<(), DbError> {
        let row = NewMatchRow::new(
            new.match_id.clone(),
            serde_json::to_string(&new.config)?,
            new.seating.first().clone(),
            new.seating.second().clone(),
        );
        self.blocking(move |repo| repo.create_match(row)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_match(&self, match_id: &str) -> Result<Option<StoredMatch>, DbError> {
        let id = match_id.to_string();
        self.blocking(move |repo| {
            let Some(row) = repo.get_match(&id)? else {
                return Ok(None);
            };
            let moves = repo
                .moves_for(&id)?
                .iter()
                .map(|m| m.to_record())
                .collect::<Result<Vec<_>, _>>()?;
            let games = repo
                .games_for(&id)?
                .iter()
                .map(|g| {
                    Ok(FinishedGame::new(
                        (*g.game_number()).max(0) as u32,
                        g.outcome()?,
                        g.end_reason()?,
                        (*g.total_moves()).max(0) as u32,
                    ))
                })
                .collect::<Result<Vec<_>, DbError>>()?;
            let openings = repo
                .openings_for(&id)?
                .iter()
                .map(|o| o.to_record())
                .collect::<Result<Vec<_>, _>>()?;
            debug!(
                moves = moves.len(),
                games = games.len(),
                openings = openings.len(),
                "Match loaded"
            );
            Ok(Some(StoredMatch {
                match_id: row.id().clone(),
                config: row.match_config()?,
                seating: Seating::new(
                    row.first_player_id().clone(),
                    row.second_player_id().clone(),
                ),
                openings,
                moves,
                games,
                status: row.parse_status()?,
            }))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_matches(&self) -> Result<Vec<MatchSummary>, DbError> {
        self.blocking(|repo| {
            repo.list_matches()?
                .iter()
                .map(|row| {
                    Ok(MatchSummary {
                        match_id: row.id().clone(),
                        status: row.parse_status()?,
                        winner: row.winning_seat()?,
                        total_moves: (*row.total_moves()).max(0) as u32,
                    })
                })
                .collect()
        })
        .await
    }

    #[instrument(skip(self, opening), fields(game = opening.game_number))]
    async fn record_opening(&self, match_id: &str, opening: OpeningRecord) -> Result<(), DbError> {
        let row = NewOpeningRow::from_record(match_id, &opening)?;
        self.blocking(move |repo| repo.record_opening(row)).await
    }

    #[instrument(
        skip(self, mv),
        fields(match_id = %mv.match_id, move_number = mv.record.move_number)
    )]
    async fn record_move(&self, mv: PersistedMove) -> Result<bool, DbError> {
        let row =
            NewMoveRow::from_record(mv.match_id, mv.player_user_id, &mv.record, mv.is_winning_move);
        self.blocking(move |repo| repo.record_move(row)).await
    }

    #[instrument(skip(self, game), fields(game = game.game_number))]
    async fn record_game(&self, match_id: &str, game: FinishedGame) -> Result<bool, DbError> {
        let row = NewGameRow::new(
            match_id,
            game.game_number,
            game.outcome,
            game.reason,
            game.total_moves,
        );
        self.blocking(move |repo| repo.record_game(row)).await
    }

    #[instrument(skip(self, finish))]
    async fn finish_match(&self, match_id: &str, finish: MatchFinish) -> Result<(), DbError> {
        let id = match_id.to_string();
        self.blocking(move |repo| repo.finish_match(&id, &finish)).await
    }
}

#[derive(Debug, Clone)]
struct MemoryMatch {
    stored: StoredMatch,
    winner: Option<Seat>,
}

/// In-process [`MatchStore`] for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    matches: Arc<Mutex<HashMap<String, MemoryMatch>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(match_id: &str) -> DbError {
    DbError::new(format!("No match '{}'", match_id))
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn create_match(&self, new: &NewMatch) -> Result<(), DbError> {
        let mut matches = self.matches.lock().await;
        if matches.contains_key(&new.match_id) {
            return Err(DbError::new(format!("Match '{}' already exists", new.match_id)));
        }
        let stored = StoredMatch {
            match_id: new.match_id.clone(),
            config: new.config.clone(),
            seating: new.seating.clone(),
            openings: Vec::new(),
            moves: Vec::new(),
            games: Vec::new(),
            status: MatchStatus::Active,
        };
        matches.insert(new.match_id.clone(), MemoryMatch { stored, winner: None });
        Ok(())
    }

    async fn load_match(&self, match_id: &str) -> Result<Option<StoredMatch>, DbError> {
        Ok(self.matches.lock().await.get(match_id).map(|m| m.stored.clone()))
    }

    async fn list_matches(&self) -> Result<Vec<MatchSummary>, DbError> {
        let matches = self.matches.lock().await;
        Ok(matches
            .values()
            .map(|m| MatchSummary {
                match_id: m.stored.match_id.clone(),
                status: m.stored.status,
                winner: m.winner,
                total_moves: m.stored.moves.len() as u32,
            })
            .collect())
    }

    async fn record_opening(&self, match_id: &str, opening: OpeningRecord) -> Result<(), DbError> {
        let mut matches = self.matches.lock().await;
        let entry = matches.get_mut(match_id).ok_or_else(|| missing(match_id))?;
        let openings = &mut entry.stored.openings;
        openings.retain(|o| o.game_number != opening.game_number);
        openings.push(opening);
        openings.sort_by_key(|o| o.game_number);
        Ok(())
    }

    async fn record_move(&self, mv: PersistedMove) -> Result<bool, DbError> {
        let mut matches = self.matches.lock().await;
        let entry = matches.get_mut(&mv.match_id).ok_or_else(|| missing(&mv.match_id))?;
        let moves = &mut entry.stored.moves;
        let key = (mv.record.game_number, mv.record.move_number);
        if moves.iter().any(|m| (m.game_number, m.move_number) == key) {
            return Ok(false);
        }
        moves.push(mv.record);
        moves.sort_by_key(|m| (m.game_number, m.move_number));
        Ok(true)
    }

    async fn record_game(&self, match_id: &str, game: FinishedGame) -> Result<bool, DbError> {
        let mut matches = self.matches.lock().await;
        let entry = matches.get_mut(match_id).ok_or_else(|| missing(match_id))?;
        let games = &mut entry.stored.games;
        if games.iter().any(|g| g.game_number == game.game_number) {
            return Ok(false);
        }
        games.push(game);
        games.sort_by_key(|g| g.game_number);
        Ok(true)
    }

    async fn finish_match(&self, match_id: &str, finish: MatchFinish) -> Result<(), DbError> {
        let mut matches = self.matches.lock().await;
        let entry = matches.get_mut(match_id).ok_or_else(|| missing(match_id))?;
        entry.stored.status = MatchStatus::Finished;
        entry.winner = Some(finish.winner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_gomoku::{ColorAssignment, Coord, Side};

    fn new_match() -> NewMatch {
        NewMatch::new(
            "m-1".into(),
            MatchConfig::default(),
            Seating::new("alice".into(), "bob".into()),
        )
    }

    #[tokio::test]
    async fn test_memory_store_ignores_duplicate_moves() {
        let store = MemoryStore::new();
        store.create_match(&new_match()).await.unwrap();
        let record = MoveRecord::new(1, 1, Coord::new(7, 7), Side::Black);
        let mv = PersistedMove::new("m-1".into(), "alice".into(), record, false);
        assert!(store.record_move(mv.clone()).await.unwrap());
        assert!(!store.record_move(mv).await.unwrap());
        let loaded = store.load_match("m-1").await.unwrap().unwrap();
        assert_eq!(loaded.moves, vec![record]);
    }

    #[tokio::test]
    async fn test_replay_options_skip_draws() {
        let store = MemoryStore::new();
        store.create_match(&new_match()).await.unwrap();
        store
            .record_game("m-1", FinishedGame::new(1, Outcome::Draw, EndReason::BoardFull, 225))
            .await
            .unwrap();
        store
            .record_game(
                "m-1",
                FinishedGame::new(2, Outcome::Winner(Side::White), EndReason::Resignation, 10),
            )
            .await
            .unwrap();
        let options = store.load_match("m-1").await.unwrap().unwrap().replay_options();
        assert_eq!(
            options.endings,
            vec![GameEnding::new(2, Side::White, EndReason::Resignation)]
        );
    }

    #[tokio::test]
    async fn test_memory_store_unknown_match() {
        let store = MemoryStore::new();
        assert!(store.load_match("nope").await.unwrap().is_none());
        let opening = OpeningRecord::new(1, false, Some(ColorAssignment::standard()));
        assert!(store.record_opening("nope", opening).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_replaces_opening_per_game() {
        let store = MemoryStore::new();
        store.create_match(&new_match()).await.unwrap();
        let chosen = OpeningRecord::new(1, true, Some(ColorAssignment::standard()));
        store.record_opening("m-1", OpeningRecord::new(1, true, None)).await.unwrap();
        store.record_opening("m-1", chosen).await.unwrap();
        let options = store.load_match("m-1").await.unwrap().unwrap().replay_options();
        assert_eq!(options.openings, vec![chosen]);
    }
}
