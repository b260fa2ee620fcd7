//! Live matches by id.

use crate::actor::{ActorSettings, MatchHandle, spawn_match};
use crate::error::{ArenaError, ArenaErrorKind};
use crate::seating::Seating;
use crate::store::{MatchStore, NewMatch};
use std::collections::HashMap;
use std::sync::Arc;
use strictly_gomoku::{MatchConfig, MatchEngine, replay};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Creates, hydrates and hands out match actors.
///
/// At most one actor runs per match id; a second lookup of the same id
/// returns the running actor's handle.
#[derive(Debug, Clone)]
pub struct MatchRegistry {
    store: Arc<dyn MatchStore>,
    settings: ActorSettings,
    live: Arc<Mutex<HashMap<String, MatchHandle>>>,
}

impl MatchRegistry {
    /// Creates an empty registry over `store`.
    pub fn new(store: Arc<dyn MatchStore>, settings: ActorSettings) -> Self {
        Self {
            store,
            settings,
            live: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    /// Starts a new match under a fresh id.
    ///
    /// # Errors
    ///
    /// Invalid config, or a storage failure.
    pub async fn create(
        &self,
        config: MatchConfig,
        seating: Seating,
    ) -> Result<MatchHandle, ArenaError> {
        let match_id = format!("match-{:016x}", rand::random::<u64>());
        self.create_with_id(&match_id, config, seating).await
    }

    /// Starts a new match under `match_id`.
    ///
    /// # Errors
    ///
    /// Invalid config, a duplicate id, or a storage failure.
    #[instrument(skip(self, config, seating), fields(variant = %config.variant))]
    pub async fn create_with_id(
        &self,
        match_id: &str,
        config: MatchConfig,
        seating: Seating,
    ) -> Result<MatchHandle, ArenaError> {
        let engine = MatchEngine::new(config.clone())?;
        let mut live = self.live.lock().await;
        self.store
            .create_match(&NewMatch::new(match_id.to_string(), config, seating.clone()))
            .await?;
        let handle = spawn_match(match_id, engine, seating, self.store.clone(), self.settings, 0);
        live.insert(match_id.to_string(), handle.clone());
        info!(match_id, "Match created");
        Ok(handle)
    }

    /// Handle of a running match, if any.
    pub async fn get(&self, match_id: &str) -> Option<MatchHandle> {
        let live = self.live.lock().await;
        live.get(match_id).filter(|h| h.is_running()).cloned()
    }

    /// Returns the running actor for `match_id`, rebuilding it from storage
    /// when none is running.
    ///
    /// # Errors
    ///
    /// `MatchNotFound` when nothing is stored under the id, or a replay or
    /// storage failure.
    #[instrument(skip(self))]
    pub async fn hydrate(&self, match_id: &str) -> Result<MatchHandle, ArenaError> {
        let mut live = self.live.lock().await;
        if let Some(handle) = live.get(match_id).filter(|h| h.is_running()) {
            debug!("Match already live");
            return Ok(handle.clone());
        }

        let stored = self
            .store
            .load_match(match_id)
            .await?
            .ok_or_else(|| ArenaError::new(ArenaErrorKind::MatchNotFound(match_id.to_string())))?;
        let options = stored.replay_options();
        let engine = replay(stored.config.clone(), &stored.moves, &options)?;
        let recorded = stored.moves.len() as u32;
        info!(
            moves = recorded,
            games = stored.games.len(),
            game_number = *engine.state().game_number(),
            "Match rebuilt from storage"
        );

        let handle = spawn_match(
            match_id,
            engine,
            stored.seating,
            self.store.clone(),
            self.settings,
            recorded,
        );
        live.insert(match_id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Stops the actor for `match_id` and forgets it. Returns whether one
    /// was running.
    #[instrument(skip(self))]
    pub async fn close(&self, match_id: &str) -> bool {
        let handle = self.live.lock().await.remove(match_id);
        match handle {
            Some(handle) => {
                if let Err(e) = handle.shutdown().await {
                    warn!(error = %e, "Actor already stopped");
                }
                true
            }
            None => false,
        }
    }

    /// Number of registered actors.
    pub async fn live_count(&self) -> usize {
        self.live.lock().await.len()
    }
}
