//! Database repository for matches, moves and finished games.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::{
    DbError, GameRow, MatchFinish, MatchRow, MatchStatus, MoveRow, NewGameRow, NewMatchRow,
    NewMoveRow, NewOpeningRow, OpeningRow, schema,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database repository for match persistence.
///
/// Each call opens its own connection, so the repository is cheap to clone
/// and safe to use from blocking worker threads.
#[derive(Debug, Clone)]
pub struct MatchRepository {
    db_path: String,
}

impl MatchRepository {
    /// Creates a repository for the database at `db_path` without touching it.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Self {
        info!(path = %db_path, "Creating MatchRepository");
        Self { db_path }
    }

    /// Opens the database at `db_path`, creating it and applying pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the file cannot be opened or a migration fails.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, DbError> {
        let repo = Self::new(db_path);
        let mut conn = repo.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migrations failed: {}", e)))?;
        info!(applied = applied.len(), "Database ready");
        Ok(repo)
    }

    /// Path the repository connects to.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))?;
        diesel::sql_query("PRAGMA busy_timeout = 5000").execute(&mut conn)?;
        Ok(conn)
    }

    /// Creates a match row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the id already exists or a database error occurs.
    #[instrument(skip(self, row), fields(match_id = %row.id()))]
    pub fn create_match(&self, row: NewMatchRow) -> Result<MatchRow, DbError> {
        let mut conn = self.connection()?;
        let created = diesel::insert_into(schema::matches::table)
            .values(&row)
            .returning(MatchRow::as_returning())
            .get_result(&mut conn)?;
        info!(match_id = %created.id(), "Match created");
        Ok(created)
    }

    /// Gets a match by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_match(&self, match_id: &str) -> Result<Option<MatchRow>, DbError> {
        let mut conn = self.connection()?;
        let row = schema::matches::table
            .find(match_id)
            .select(MatchRow::as_select())
            .first(&mut conn)
            .optional()?;
        debug!(found = row.is_some(), "Match lookup");
        Ok(row)
    }

    /// Lists matches, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_matches(&self) -> Result<Vec<MatchRow>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::matches::table
            .order(schema::matches::created_at.desc())
            .select(MatchRow::as_select())
            .load(&mut conn)?;
        info!(count = rows.len(), "Matches loaded");
        Ok(rows)
    }

    /// Stores the swap2 decisions of a game, replacing earlier ones for the
    /// same game.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, row), fields(match_id = %row.match_id(), game = row.game_number()))]
    pub fn record_opening(&self, row: NewOpeningRow) -> Result<(), DbError> {
        use schema::openings::dsl;

        let mut conn = self.connection()?;
        diesel::insert_into(dsl::openings)
            .values(&row)
            .on_conflict((dsl::match_id, dsl::game_number))
            .do_update()
            .set((
                dsl::deferred.eq(*row.deferred()),
                dsl::assignment.eq(row.assignment().clone()),
            ))
            .execute(&mut conn)?;
        debug!(deferred = row.deferred(), chosen = row.assignment().is_some(), "Opening stored");
        Ok(())
    }

    /// Swap2 decisions of a match ordered by game.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn openings_for(&self, match_id: &str) -> Result<Vec<OpeningRow>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::openings::table
            .filter(schema::openings::match_id.eq(match_id))
            .order(schema::openings::game_number.asc())
            .select(OpeningRow::as_select())
            .load(&mut conn)?;
        debug!(count = rows.len(), "Openings loaded");
        Ok(rows)
    }

    /// Records a move. A row with the same `(match, game, move number)` is
    /// ignored; returns whether a new row was written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(
        skip(self, row),
        fields(
            match_id = %row.match_id(),
            game = row.game_number(),
            move_number = row.move_number()
        )
    )]
    pub fn record_move(&self, row: NewMoveRow) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let inserted = diesel::insert_or_ignore_into(schema::moves::table)
            .values(&row)
            .execute(&mut conn)?;
        debug!(inserted, "Move recorded");
        Ok(inserted > 0)
    }

    /// Moves of a match ordered by game and move number.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn moves_for(&self, match_id: &str) -> Result<Vec<MoveRow>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::moves::table
            .filter(schema::moves::match_id.eq(match_id))
            .order((
                schema::moves::game_number.asc(),
                schema::moves::move_number.asc(),
            ))
            .select(MoveRow::as_select())
            .load(&mut conn)?;
        debug!(count = rows.len(), "Moves loaded");
        Ok(rows)
    }

    /// Records a finished game; a repeat for the same game is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(
        skip(self, row),
        fields(match_id = %row.match_id(), game = row.game_number(), reason = %row.reason())
    )]
    pub fn record_game(&self, row: NewGameRow) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let inserted = diesel::insert_or_ignore_into(schema::games::table)
            .values(&row)
            .execute(&mut conn)?;
        info!(inserted, "Game result recorded");
        Ok(inserted > 0)
    }

    /// Finished games of a match in order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn games_for(&self, match_id: &str) -> Result<Vec<GameRow>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::games::table
            .filter(schema::games::match_id.eq(match_id))
            .order(schema::games::game_number.asc())
            .select(GameRow::as_select())
            .load(&mut conn)?;
        debug!(count = rows.len(), "Games loaded");
        Ok(rows)
    }

    /// Marks a match finished with its series result.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the match does not exist or a database error occurs.
    #[instrument(skip(self, finish), fields(winner = %finish.winner, result = %finish.result))]
    pub fn finish_match(&self, match_id: &str, finish: &MatchFinish) -> Result<(), DbError> {
        use schema::matches::dsl;

        let mut conn = self.connection()?;
        let updated = diesel::update(dsl::matches.find(match_id))
            .set((
                dsl::status.eq(MatchStatus::Finished.to_db_string()),
                dsl::winner.eq(Some(finish.winner.to_db_str())),
                dsl::winner_user_id.eq(Some(finish.winner_user_id.as_str())),
                dsl::result.eq(Some(finish.result.to_string())),
                dsl::total_moves.eq(finish.total_moves as i32),
                dsl::ended_at.eq(Some(chrono::Utc::now().naive_utc())),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DbError::new(format!("No match '{}'", match_id)));
        }
        info!("Match finished");
        Ok(())
    }
}
