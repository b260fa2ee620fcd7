//! One task per match: the single writer for its engine.
//!
//! Callers talk to the actor through a [`MatchHandle`]. Every command is
//! answered over a oneshot channel as soon as the engine returns; persistence
//! and broadcast happen afterwards and never delay the reply.

use crate::db::MatchFinish;
use crate::error::{ArenaError, ArenaErrorKind};
use crate::events::MatchEvent;
use crate::seating::Seating;
use crate::store::{FinishedGame, MatchStore, PersistedMove};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strictly_gomoku::{
    Coord, IdempotencyGuard, LedgerDelta, MatchEngine, MatchSnapshot, MatchState, MoveKey,
    MoveOutcome, MoveRecord, OpeningRecord, Seat, Side, SkillId, SkillOutcome, SkillTarget,
    Swap2Action, Swap2Outcome, Swap2Phase, TurnOutcome, Verdict,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Channel sizes and memory bounds for one match actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorSettings {
    /// Pending commands before senders wait.
    pub channel_capacity: usize,
    /// Events buffered for slow subscribers.
    pub event_capacity: usize,
    /// Move keys remembered for duplicate detection.
    pub idempotency_capacity: usize,
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            event_capacity: 256,
            idempotency_capacity: IdempotencyGuard::DEFAULT_CAPACITY,
        }
    }
}

/// Reply to a placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveReply {
    /// The move was applied.
    Applied(MoveOutcome),
    /// The same move was already applied; nothing changed.
    Duplicate(MatchSnapshot),
}

#[derive(Debug, Clone, Copy)]
enum Concession {
    Resign,
    Timeout,
    AutoWin,
}

type Reply<T> = oneshot::Sender<Result<T, ArenaError>>;

#[derive(Debug)]
enum Command {
    Move {
        side: Side,
        coord: Coord,
        move_number: u32,
        reply: Reply<MoveReply>,
    },
    Swap2 {
        seat: Seat,
        action: Swap2Action,
        reply: Reply<Swap2Outcome>,
    },
    Skill {
        side: Side,
        skill: SkillId,
        target: SkillTarget,
        reply: Reply<SkillOutcome>,
    },
    Hold {
        side: Side,
        skill: SkillId,
        reply: Reply<LedgerDelta>,
    },
    EndTurn {
        side: Side,
        reply: Reply<TurnOutcome>,
    },
    Concede {
        kind: Concession,
        side: Side,
        reply: Reply<Verdict>,
    },
    NextGame {
        reply: Reply<u32>,
    },
    State {
        reply: oneshot::Sender<MatchState>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug)]
enum PersistJob {
    Move(PersistedMove),
    Opening(OpeningRecord),
    Game(FinishedGame),
    Finish(MatchFinish),
}

/// Cloneable address of a running match.
#[derive(Debug, Clone)]
pub struct MatchHandle {
    match_id: Arc<str>,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<MatchEvent>,
}

impl MatchHandle {
    /// Match identifier.
    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.events.subscribe()
    }

    /// Whether the actor is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn closed(&self) -> ArenaError {
        ArenaError::new(ArenaErrorKind::MatchClosed(self.match_id.to_string()))
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, ArenaError> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(make(tx)).await.map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())?
    }

    /// Places a stone. `move_number` is the number the caller expects the
    /// move to get; resending the same move is absorbed as a duplicate.
    ///
    /// # Errors
    ///
    /// Rule violations from the engine, or a closed actor.
    #[instrument(skip(self), fields(match_id = %self.match_id, x = coord.x, y = coord.y))]
    pub async fn apply_move(
        &self,
        side: Side,
        coord: Coord,
        move_number: u32,
    ) -> Result<MoveReply, ArenaError> {
        self.request(|reply| Command::Move {
            side,
            coord,
            move_number,
            reply,
        })
        .await
    }

    /// Applies an opening action.
    ///
    /// # Errors
    ///
    /// Rule violations from the engine, or a closed actor.
    #[instrument(skip(self), fields(match_id = %self.match_id))]
    pub async fn apply_swap2(
        &self,
        seat: Seat,
        action: Swap2Action,
    ) -> Result<Swap2Outcome, ArenaError> {
        self.request(|reply| Command::Swap2 { seat, action, reply }).await
    }

    /// Uses a skill.
    ///
    /// # Errors
    ///
    /// Rule violations from the engine, or a closed actor.
    #[instrument(skip(self), fields(match_id = %self.match_id, skill = %skill))]
    pub async fn apply_skill(
        &self,
        side: Side,
        skill: SkillId,
        target: SkillTarget,
    ) -> Result<SkillOutcome, ArenaError> {
        self.request(|reply| Command::Skill {
            side,
            skill,
            target,
            reply,
        })
        .await
    }

    /// Pays for a candidate skill so it survives the next draw.
    ///
    /// # Errors
    ///
    /// Rule violations from the engine, or a closed actor.
    pub async fn hold_skill(&self, side: Side, skill: SkillId) -> Result<LedgerDelta, ArenaError> {
        self.request(|reply| Command::Hold { side, skill, reply }).await
    }

    /// Ends `side`'s turn (skill variant).
    ///
    /// # Errors
    ///
    /// Rule violations from the engine, or a closed actor.
    pub async fn end_turn(&self, side: Side) -> Result<TurnOutcome, ArenaError> {
        self.request(|reply| Command::EndTurn { side, reply }).await
    }

    /// `side` resigns the current game.
    ///
    /// # Errors
    ///
    /// `MatchOver` if the game already ended, or a closed actor.
    pub async fn resign(&self, side: Side) -> Result<Verdict, ArenaError> {
        self.request(|reply| Command::Concede {
            kind: Concession::Resign,
            side,
            reply,
        })
        .await
    }

    /// `side`'s clock ran out.
    ///
    /// # Errors
    ///
    /// `MatchOver` if the game already ended, or a closed actor.
    pub async fn timeout(&self, side: Side) -> Result<Verdict, ArenaError> {
        self.request(|reply| Command::Concede {
            kind: Concession::Timeout,
            side,
            reply,
        })
        .await
    }

    /// Records an externally decided win for `winner`.
    ///
    /// # Errors
    ///
    /// `MatchOver` if the game already ended, or a closed actor.
    pub async fn auto_win(&self, winner: Side) -> Result<Verdict, ArenaError> {
        self.request(|reply| Command::Concede {
            kind: Concession::AutoWin,
            side: winner,
            reply,
        })
        .await
    }

    /// Starts the next game of the series.
    ///
    /// # Errors
    ///
    /// `GameInProgress` or `MatchOver`, or a closed actor.
    pub async fn next_game(&self) -> Result<u32, ArenaError> {
        self.request(|reply| Command::NextGame { reply }).await
    }

    /// Copy of the full match state.
    ///
    /// # Errors
    ///
    /// Fails only when the actor has stopped.
    pub async fn state(&self) -> Result<MatchState, ArenaError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::State { reply: tx })
            .await
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }

    /// Serializable summary of the match.
    ///
    /// # Errors
    ///
    /// Fails only when the actor has stopped.
    pub async fn snapshot(&self) -> Result<MatchSnapshot, ArenaError> {
        Ok(self.state().await?.snapshot())
    }

    /// Stops the actor after queued commands and pending writes finish.
    ///
    /// # Errors
    ///
    /// Fails if the actor already stopped.
    #[instrument(skip(self), fields(match_id = %self.match_id))]
    pub async fn shutdown(&self) -> Result<(), ArenaError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Shutdown { reply: tx })
            .await
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }
}

struct MatchActor {
    match_id: Arc<str>,
    engine: MatchEngine,
    seating: Seating,
    guard: IdempotencyGuard,
    guard_capacity: usize,
    events: broadcast::Sender<MatchEvent>,
    writer: mpsc::UnboundedSender<PersistJob>,
    moves_recorded: u32,
}

/// Starts the actor and its writer task for `engine`.
///
/// `moves_recorded` seeds the series move total for hydrated matches.
#[instrument(skip(engine, seating, store, settings))]
pub fn spawn_match(
    match_id: &str,
    engine: MatchEngine,
    seating: Seating,
    store: Arc<dyn MatchStore>,
    settings: ActorSettings,
    moves_recorded: u32,
) -> MatchHandle {
    let match_id: Arc<str> = Arc::from(match_id);
    let (commands, inbox) = mpsc::channel(settings.channel_capacity.max(1));
    let (events, _) = broadcast::channel(settings.event_capacity.max(1));
    let (writer, jobs) = mpsc::unbounded_channel();

    let writer_task = tokio::spawn(run_writer(match_id.clone(), store, jobs));
    let actor = MatchActor {
        match_id: match_id.clone(),
        engine,
        seating,
        guard: IdempotencyGuard::new(settings.idempotency_capacity),
        guard_capacity: settings.idempotency_capacity,
        events: events.clone(),
        writer,
        moves_recorded,
    };
    tokio::spawn(actor.run(inbox, writer_task));
    info!(match_id = %match_id, "Match actor started");

    MatchHandle {
        match_id,
        commands,
        events,
    }
}

async fn run_writer(
    match_id: Arc<str>,
    store: Arc<dyn MatchStore>,
    mut jobs: mpsc::UnboundedReceiver<PersistJob>,
) {
    while let Some(job) = jobs.recv().await {
        let result = match job {
            PersistJob::Move(mv) => store.record_move(mv).await.map(|inserted| {
                if !inserted {
                    debug!(match_id = %match_id, "Move already stored");
                }
            }),
            PersistJob::Opening(opening) => store.record_opening(&match_id, opening).await,
            PersistJob::Game(game) => store.record_game(&match_id, game).await.map(|_| ()),
            PersistJob::Finish(finish) => store.finish_match(&match_id, finish).await,
        };
        if let Err(e) = result {
            warn!(match_id = %match_id, error = %e, "Persistence failed");
        }
    }
    debug!(match_id = %match_id, "Writer drained");
}

impl MatchActor {
    async fn run(mut self, mut inbox: mpsc::Receiver<Command>, writer_task: JoinHandle<()>) {
        let mut shutdown = None;
        while let Some(command) = inbox.recv().await {
            match command {
                Command::Move {
                    side,
                    coord,
                    move_number,
                    reply,
                } => {
                    let _ = reply.send(self.handle_move(side, coord, move_number));
                }
                Command::Swap2 { seat, action, reply } => {
                    let _ = reply.send(self.handle_swap2(seat, action));
                }
                Command::Skill {
                    side,
                    skill,
                    target,
                    reply,
                } => {
                    let _ = reply.send(self.handle_skill(side, skill, target));
                }
                Command::Hold { side, skill, reply } => {
                    let result = self.engine.hold_skill(side, skill).map_err(ArenaError::from);
                    if let Ok(delta) = &result {
                        self.publish(MatchEvent::SkillHeld {
                            match_id: self.match_id.to_string(),
                            delta: delta.clone(),
                        });
                    }
                    let _ = reply.send(result);
                }
                Command::EndTurn { side, reply } => {
                    let result = self.engine.end_turn(side).map_err(ArenaError::from);
                    if let Ok(outcome) = &result {
                        self.publish(MatchEvent::TurnEnded {
                            match_id: self.match_id.to_string(),
                            outcome: outcome.clone(),
                        });
                    }
                    let _ = reply.send(result);
                }
                Command::Concede { kind, side, reply } => {
                    let _ = reply.send(self.handle_concede(kind, side));
                }
                Command::NextGame { reply } => {
                    let result = self.engine.next_game().map_err(ArenaError::from);
                    if let Ok(game_number) = result {
                        self.guard = IdempotencyGuard::new(self.guard_capacity);
                        self.publish(MatchEvent::GameStarted {
                            match_id: self.match_id.to_string(),
                            game_number,
                        });
                    }
                    let _ = reply.send(result);
                }
                Command::State { reply } => {
                    let _ = reply.send(self.engine.state().clone());
                }
                Command::Shutdown { reply } => {
                    shutdown = Some(reply);
                    break;
                }
            }
        }

        let MatchActor {
            match_id, writer, ..
        } = self;
        drop(writer);
        if let Err(e) = writer_task.await {
            warn!(match_id = %match_id, error = %e, "Writer task failed");
        }
        info!(match_id = %match_id, "Match actor stopped");
        if let Some(reply) = shutdown {
            let _ = reply.send(());
        }
    }

    fn publish(&self, event: MatchEvent) {
        if self.events.send(event).is_err() {
            debug!(match_id = %self.match_id, "No event subscribers");
        }
    }

    fn persist(&self, job: PersistJob) {
        if self.writer.send(job).is_err() {
            warn!(match_id = %self.match_id, "Writer stopped; result not persisted");
        }
    }

    fn persist_move(&mut self, player_id: String, record: MoveRecord, is_winning_move: bool) {
        self.moves_recorded += 1;
        self.persist(PersistJob::Move(PersistedMove::new(
            self.match_id.to_string(),
            player_id,
            record,
            is_winning_move,
        )));
    }

    fn handle_move(
        &mut self,
        side: Side,
        coord: Coord,
        move_number: u32,
    ) -> Result<MoveReply, ArenaError> {
        let key = MoveKey::for_coord(&*self.match_id, move_number, coord, side);
        if self.guard.is_duplicate(&key) {
            debug!(?key, "Duplicate move absorbed");
            return Ok(MoveReply::Duplicate(self.engine.state().snapshot()));
        }

        let outcome = self.engine.apply_move(side, coord)?;
        self.guard.record(key);

        let state = self.engine.state();
        let player_id = self.seating.player_for(state, side).to_string();
        let record = MoveRecord::new(*state.game_number(), outcome.move_number, coord, side);
        self.persist_move(player_id.clone(), record, outcome.is_winning_move());
        self.publish(MatchEvent::MovePlayed {
            match_id: self.match_id.to_string(),
            player_id,
            outcome: outcome.clone(),
        });
        if let Some(verdict) = outcome.verdict {
            self.game_ended(verdict);
        }
        Ok(MoveReply::Applied(outcome))
    }

    fn handle_swap2(
        &mut self,
        seat: Seat,
        action: Swap2Action,
    ) -> Result<Swap2Outcome, ArenaError> {
        let outcome = self.engine.apply_swap2(seat, action)?;
        let game_number = *self.engine.state().game_number();

        if let Some(entry) = outcome.placed {
            let record = MoveRecord::new(game_number, entry.move_number, entry.coord, entry.side);
            self.persist_move(self.seating.player(seat).to_string(), record, false);
        }
        match (action, outcome.phase, outcome.assignment) {
            (Swap2Action::Defer, _, _) => {
                self.persist(PersistJob::Opening(OpeningRecord::new(game_number, true, None)));
            }
            (_, Swap2Phase::Complete, Some(assignment)) => {
                info!(match_id = %self.match_id, ?assignment, "Colours assigned");
                let deferred = self.engine.state().move_count() > 3;
                let opening = OpeningRecord::new(game_number, deferred, Some(assignment));
                self.persist(PersistJob::Opening(opening));
            }
            _ => {}
        }
        self.publish(MatchEvent::OpeningStep {
            match_id: self.match_id.to_string(),
            seat,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    fn handle_skill(
        &mut self,
        side: Side,
        skill: SkillId,
        target: SkillTarget,
    ) -> Result<SkillOutcome, ArenaError> {
        let outcome = self.engine.apply_skill(side, skill, target)?;
        self.publish(MatchEvent::SkillUsed {
            match_id: self.match_id.to_string(),
            side,
            skill,
            outcome: outcome.clone(),
        });
        if let Some(verdict) = outcome.verdict {
            self.game_ended(verdict);
        }
        Ok(outcome)
    }

    fn handle_concede(&mut self, kind: Concession, side: Side) -> Result<Verdict, ArenaError> {
        let verdict = match kind {
            Concession::Resign => self.engine.resign(side),
            Concession::Timeout => self.engine.timeout(side),
            Concession::AutoWin => self.engine.auto_win(side),
        }?;
        debug!(match_id = %self.match_id, ?kind, %side, "Game conceded");
        self.game_ended(verdict);
        Ok(verdict)
    }

    fn game_ended(&mut self, verdict: Verdict) {
        let state = self.engine.state();
        let game_number = *state.game_number();
        let game = FinishedGame::new(
            game_number,
            verdict.result.outcome,
            verdict.result.reason,
            state.move_count(),
        );
        info!(
            match_id = %self.match_id,
            game_number,
            outcome = %verdict.result.outcome,
            reason = %verdict.result.reason,
            "Game ended"
        );
        self.persist(PersistJob::Game(game));
        self.publish(MatchEvent::GameEnded {
            match_id: self.match_id.to_string(),
            game_number,
            verdict,
        });

        if let Some(winner) = verdict.series_winner {
            let winner_user_id = self.seating.player(winner).to_string();
            info!(match_id = %self.match_id, %winner, player = %winner_user_id, "Series decided");
            self.persist(PersistJob::Finish(MatchFinish::new(
                winner,
                winner_user_id.clone(),
                verdict.result.reason,
                self.moves_recorded,
            )));
            self.publish(MatchEvent::MatchFinished {
                match_id: self.match_id.to_string(),
                winner,
                winner_user_id,
            });
        }
    }
}
