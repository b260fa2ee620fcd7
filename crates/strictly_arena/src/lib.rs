//! Match host for strictly_gomoku.
//!
//! Each match runs in its own task that owns the [`strictly_gomoku::MatchEngine`]
//! and applies commands one at a time. Results are handed to a writer task
//! for persistence and published to subscribers after the caller has its
//! reply.
//!
//! # Architecture
//!
//! - **Actor**: one task per match, fed by an mpsc queue with oneshot replies
//! - **Registry**: live matches by id, hydrated from storage on demand
//! - **Store**: SQLite through diesel, or in memory for tests
//! - **Self-play**: random agents that drive a full series
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use strictly_arena::{ActorSettings, MatchRegistry, MemoryStore, Seating};
//! use strictly_gomoku::{Coord, MatchConfig, Side};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = MatchRegistry::new(Arc::new(MemoryStore::new()), ActorSettings::default());
//! let handle = registry
//!     .create(MatchConfig::default(), Seating::new("alice".into(), "bob".into()))
//!     .await?;
//! handle.apply_move(Side::Black, Coord::new(7, 7), 1).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod actor;
mod config;
pub mod db;
mod error;
mod events;
mod registry;
mod seating;
mod selfplay;
mod store;

pub use actor::{ActorSettings, MatchHandle, MoveReply, spawn_match};
pub use config::{ArenaConfig, DB_PATH_ENV, SelfPlaySettings};
pub use error::{ArenaError, ArenaErrorKind};
pub use events::MatchEvent;
pub use registry::MatchRegistry;
pub use seating::Seating;
pub use selfplay::{Agent, GameSummary, RandomAgent, SeriesLimits, SeriesReport, play_series};
pub use store::{
    FinishedGame, MatchStore, MatchSummary, MemoryStore, NewMatch, PersistedMove, SqliteStore,
    StoredMatch,
};
