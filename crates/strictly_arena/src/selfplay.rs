//! Automated players and the loop that drives a series between them.

use crate::actor::{MatchHandle, MoveReply};
use crate::error::ArenaError;
use anyhow::Result;
use derive_getters::Getters;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strictly_gomoku::skills::Targeting;
use strictly_gomoku::swap2::Swap2State;
use strictly_gomoku::{
    Coord, MatchState, Seat, Side, SkillId, SkillTarget, Swap2Action, Swap2Phase, VariantRules,
};
use tracing::{debug, info, instrument, warn};

/// Something that can play a seat.
#[async_trait::async_trait]
pub trait Agent: Send {
    /// Display name.
    fn name(&self) -> &str;

    /// Next opening action while `seat` is the active swap2 seat.
    async fn opening(&mut self, state: &MatchState, seat: Seat) -> Result<Swap2Action>;

    /// Cell to play for `side`.
    async fn choose_move(&mut self, state: &MatchState, side: Side) -> Result<Coord>;

    /// Optional skill to use before placing.
    async fn choose_skill(
        &mut self,
        _state: &MatchState,
        _side: Side,
    ) -> Option<(SkillId, SkillTarget)> {
        None
    }
}

/// Plays uniformly random legal-looking moves from its own view of the
/// board, occasionally casting an affordable untargeted skill.
#[derive(Debug)]
pub struct RandomAgent {
    name: String,
    rng: StdRng,
}

impl RandomAgent {
    /// Creates an agent with a deterministic random stream.
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn random_cell(&mut self, open: &[Coord]) -> Result<Coord> {
        open.choose(&mut self.rng)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("No open cells"))
    }
}

#[async_trait::async_trait]
impl Agent for RandomAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn opening(&mut self, state: &MatchState, seat: Seat) -> Result<Swap2Action> {
        let action = match state.phase() {
            Swap2Phase::Placement | Swap2Phase::ExtraPlacement => {
                Swap2Action::Place(self.random_cell(&state.board().open_cells())?)
            }
            Swap2Phase::Choice => match self.rng.random_range(0..3) {
                0 => Swap2Action::Choose(Side::Black),
                1 => Swap2Action::Choose(Side::White),
                _ => Swap2Action::Defer,
            },
            Swap2Phase::FinalChoice => {
                if self.rng.random_bool(0.5) {
                    Swap2Action::Choose(Side::Black)
                } else {
                    Swap2Action::Choose(Side::White)
                }
            }
            Swap2Phase::NotStarted | Swap2Phase::Complete => {
                anyhow::bail!("No opening action in phase {:?}", state.phase())
            }
        };
        debug!(agent = %self.name, %seat, ?action, "Opening action chosen");
        Ok(action)
    }

    async fn choose_move(&mut self, state: &MatchState, side: Side) -> Result<Coord> {
        let coord = self.random_cell(&state.view_for(side).open_cells())?;
        debug!(agent = %self.name, %coord, "Move chosen");
        Ok(coord)
    }

    async fn choose_skill(
        &mut self,
        state: &MatchState,
        side: Side,
    ) -> Option<(SkillId, SkillTarget)> {
        if !self.rng.random_ratio(1, 4) {
            return None;
        }
        let ledger = state.ledger(side);
        let usable: Vec<SkillId> = ledger
            .held()
            .iter()
            .copied()
            .chain(
                ledger
                    .candidates()
                    .iter()
                    .copied()
                    .filter(|id| id.spec().mana_cost <= ledger.mana()),
            )
            .filter(|id| id.spec().targeting == Targeting::Global && ledger.is_available(*id))
            .collect();
        let skill = usable.choose(&mut self.rng).copied()?;
        debug!(agent = %self.name, %skill, "Skill chosen");
        Some((skill, SkillTarget::None))
    }
}

/// Safety limits for an automated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct SeriesLimits {
    /// Placements after which the side to move is timed out.
    pub max_moves_per_game: u32,
    /// Rejected actions tolerated before the side to move is timed out.
    pub max_rejections: u32,
}

impl Default for SeriesLimits {
    fn default() -> Self {
        Self {
            max_moves_per_game: 1000,
            max_rejections: 50,
        }
    }
}

/// What happened in one automated game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GameSummary {
    game_number: u32,
    winner: Option<Side>,
    reason: String,
    moves: u32,
}

/// Result of an automated series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SeriesReport {
    match_id: String,
    games: Vec<GameSummary>,
    winner: Option<Seat>,
    winner_name: Option<String>,
    rejections: u32,
}

fn active_seat(state: &MatchState) -> Option<Seat> {
    state.swap2().as_ref().map(Swap2State::active)
}

/// Plays `handle`'s match to a series result. `agents` are indexed by seat:
/// first, then second.
///
/// # Errors
///
/// Fails if the actor stops or an agent has nothing to play.
#[instrument(skip(handle, agents), fields(match_id = %handle.match_id()))]
pub async fn play_series(
    handle: &MatchHandle,
    agents: &mut [Box<dyn Agent>; 2],
    limits: SeriesLimits,
) -> Result<SeriesReport> {
    let mut games = Vec::new();
    let mut rejections = 0u32;
    let mut streak = 0u32;

    loop {
        let state = handle.state().await?;

        if let Some(result) = *state.result() {
            games.push(GameSummary {
                game_number: *state.game_number(),
                winner: result.outcome.winner(),
                reason: result.reason.to_string(),
                moves: state.move_count(),
            });
            if state.series_winner().is_some() {
                break;
            }
            let next = handle.next_game().await?;
            info!(game = next, "Next game");
            streak = 0;
            continue;
        }

        let to_move = *state.side_to_move();
        if streak >= limits.max_rejections || state.move_count() >= limits.max_moves_per_game {
            warn!(side = %to_move, streak, moves = state.move_count(), "Limit reached; timing out");
            handle.timeout(to_move).await?;
            continue;
        }

        let attempt = match active_seat(&state).filter(|_| state.phase() != Swap2Phase::Complete) {
            Some(seat) => {
                let agent = &mut agents[seat_index(seat)];
                let action = agent.opening(&state, seat).await?;
                handle.apply_swap2(seat, action).await.map(|_| ())
            }
            None => {
                let agent = &mut agents[seat_index(state.seat_of(to_move))];
                play_turn(handle, &state, agent, to_move).await
            }
        };

        match attempt {
            Ok(()) => streak = 0,
            Err(e) if e.rule().is_some() => {
                debug!(error = %e, "Action rejected; retrying");
                rejections += 1;
                streak += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let state = handle.state().await?;
    let winner = state.series_winner();
    let winner_name = winner.map(|seat| agents[seat_index(seat)].name().to_string());
    info!(?winner, ?winner_name, games = games.len(), rejections, "Series complete");
    Ok(SeriesReport {
        match_id: handle.match_id().to_string(),
        games,
        winner,
        winner_name,
        rejections,
    })
}

fn seat_index(seat: Seat) -> usize {
    match seat {
        Seat::First => 0,
        Seat::Second => 1,
    }
}

async fn play_turn(
    handle: &MatchHandle,
    state: &MatchState,
    agent: &mut Box<dyn Agent>,
    side: Side,
) -> Result<(), ArenaError> {
    let rules = state.config().variant.rules();

    if rules.allows_skills() && !*state.placed_this_turn() {
        if let Some((skill, target)) = agent.choose_skill(state, side).await {
            match handle.apply_skill(side, skill, target).await {
                Ok(outcome) if outcome.verdict.is_some() => return Ok(()),
                Ok(_) => {}
                Err(e) if e.rule().is_some() => debug!(error = %e, %skill, "Skill rejected"),
                Err(e) => return Err(e),
            }
        }
    }

    if !*state.placed_this_turn() {
        let Ok(coord) = agent.choose_move(state, side).await else {
            warn!(agent = %agent.name(), "No move available; resigning");
            handle.resign(side).await?;
            return Ok(());
        };
        let move_number = state.move_count() + 1;
        if let MoveReply::Applied(outcome) = handle.apply_move(side, coord, move_number).await? {
            if outcome.verdict.is_some() || outcome.next_side != side {
                return Ok(());
            }
        }
    }

    if rules.requires_end_turn() {
        handle.end_turn(side).await?;
    }
    Ok(())
}
