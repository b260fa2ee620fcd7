//! SQLite persistence for matches, moves and finished games.

mod error;
mod models;
mod repository;
mod schema;

pub use error::DbError;
pub use models::{
    GameRow, MatchFinish, MatchRow, MatchStatus, MoveRow, NewGameRow, NewMatchRow, NewMoveRow,
    NewOpeningRow, OpeningRow,
};
pub use repository::MatchRepository;
