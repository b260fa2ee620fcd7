//! Hidden tile generation and the one-shot effects tiles fire when revealed.

use crate::action::RuleViolation;
use crate::skills::{EffectKind, SkillId, SkillLedger};
use crate::types::{Board, Coord, Side, Terrain};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Per-tile probabilities in percent. Whatever is left over is `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileWeights {
    /// Grants a skill.
    pub skill: u32,
    /// Extra turn.
    pub double: u32,
    /// Hidden wall.
    pub block: u32,
    /// Clears nearby enemies.
    pub bomb: u32,
    /// Skips the opponent's turn.
    pub freeze: u32,
    /// Relocates the stone.
    pub teleport: u32,
    /// Shields the stone.
    pub shield: u32,
    /// Random sub-effect.
    pub mystery: u32,
    /// Permanent point.
    pub score: u32,
}

impl Default for TileWeights {
    fn default() -> Self {
        Self {
            skill: 2,
            double: 3,
            block: 2,
            bomb: 2,
            freeze: 2,
            teleport: 2,
            shield: 2,
            mystery: 2,
            score: 3,
        }
    }
}

impl TileWeights {
    fn table(&self) -> [(Terrain, u32); 9] {
        [
            (Terrain::Skill, self.skill),
            (Terrain::Double, self.double),
            (Terrain::Block, self.block),
            (Terrain::Bomb, self.bomb),
            (Terrain::Freeze, self.freeze),
            (Terrain::Teleport, self.teleport),
            (Terrain::Shield, self.shield),
            (Terrain::Mystery, self.mystery),
            (Terrain::Score, self.score),
        ]
    }

    /// Sum of the special-tile weights.
    pub fn special_total(&self) -> u32 {
        self.table().iter().map(|(_, w)| w).sum()
    }

    /// Draws one tile.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Terrain {
        let mut roll = rng.random_range(0..100u32);
        for (terrain, weight) in self.table() {
            if roll < weight {
                return terrain;
            }
            roll -= weight;
        }
        Terrain::Normal
    }
}

/// Sub-effects a mystery tile may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum MysteryEffect {
    /// A random skill for free.
    GrantSkill,
    /// Move again.
    ExtraTurn,
    /// Clear nearby enemy stones.
    Bomb,
    /// Skip the opponent's next turn.
    FreezeOpponent,
    /// Shield the placed stone.
    Shield,
    /// One permanent point.
    ScorePoint,
    /// Take a held skill from the opponent.
    StealSkill,
}

/// What a steal does when the opponent holds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StealFallback {
    /// Grant a random skill instead.
    #[default]
    GrantRandom,
    /// The sub-effect fizzles.
    Nothing,
}

/// Something a revealed tile did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainEvent {
    /// A tile was uncovered.
    Revealed {
        /// Tile cell.
        coord: Coord,
        /// Tile type.
        terrain: Terrain,
    },
    /// A hidden block swallowed the placement; the turn is lost.
    TurnForfeited {
        /// Block cell.
        coord: Coord,
        /// Side that lost its turn.
        side: Side,
    },
    /// A skill was added to a side's held set.
    SkillGranted {
        /// Receiving side.
        side: Side,
        /// Skill granted.
        skill: SkillId,
    },
    /// The side moves again after this turn.
    ExtraTurn {
        /// Side.
        side: Side,
    },
    /// Enemy stones around the tile were cleared.
    Bombed {
        /// Cleared cells.
        cleared: Vec<Coord>,
    },
    /// The named side loses its next turn.
    TurnSkipped {
        /// Skipped side.
        side: Side,
    },
    /// The placed stone jumped elsewhere.
    Teleported {
        /// Tile cell.
        from: Coord,
        /// Landing cell.
        to: Coord,
    },
    /// The placed stone gained a shield.
    Shielded {
        /// Stone cell.
        coord: Coord,
    },
    /// A permanent point was awarded.
    ScorePoint {
        /// Side.
        side: Side,
    },
    /// A mystery tile picked a sub-effect.
    Mystery {
        /// Chosen sub-effect.
        effect: MysteryEffect,
    },
    /// A held skill changed hands.
    SkillStolen {
        /// Thief.
        side: Side,
        /// Skill taken.
        skill: SkillId,
    },
    /// The tile had nothing to act on.
    Fizzled,
}

/// Everything a tile trigger may touch.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct TileContext<'a> {
    pub board: &'a mut Board,
    pub ledgers: &'a mut [SkillLedger; 2],
    pub tile_bonus: &'a mut [u32; 2],
    pub rng: &'a mut StdRng,
    /// Side whose stone revealed the tile.
    pub side: Side,
    /// Skills a grant may draw from.
    pub skill_pool: &'a [SkillId],
    pub max_held: usize,
    pub mystery: &'a [MysteryEffect],
    pub steal_fallback: StealFallback,
}

/// Assigns a hidden tile to every cell.
#[instrument(skip(board, weights, rng), fields(size = board.size()))]
pub fn generate(board: &mut Board, weights: &TileWeights, rng: &mut StdRng) {
    let coords: Vec<Coord> = board.coords().collect();
    let mut specials = 0usize;
    for c in coords {
        let terrain = weights.sample(rng);
        if terrain != Terrain::Normal {
            specials += 1;
        }
        if let Some(cell) = board.cell_mut(c) {
            cell.terrain = terrain;
            cell.terrain_revealed = false;
        }
    }
    debug!(specials, "Terrain generated");
}

/// Whether placing on `coord` would hit a hidden block.
pub fn is_hidden_block(board: &Board, coord: Coord) -> bool {
    board
        .cell(coord)
        .is_some_and(|c| c.terrain == Terrain::Block && !c.terrain_revealed && c.stone.is_none())
}

/// Reveals a hidden block at `coord`, consuming the placement.
pub fn reveal_block(board: &mut Board, coord: Coord, side: Side) -> Vec<TerrainEvent> {
    if let Some(cell) = board.cell_mut(coord) {
        cell.terrain_revealed = true;
    }
    info!(%coord, %side, "Hidden block revealed, turn forfeited");
    vec![
        TerrainEvent::Revealed {
            coord,
            terrain: Terrain::Block,
        },
        TerrainEvent::TurnForfeited { coord, side },
    ]
}

/// Reveals the tile under a freshly placed stone and fires its effect.
///
/// Already revealed tiles do nothing.
///
/// # Errors
///
/// Propagates board errors from relocation, which only occur if the board is
/// internally inconsistent.
#[instrument(skip(ctx), fields(side = %ctx.side))]
pub fn trigger(
    ctx: &mut TileContext<'_>,
    coord: Coord,
) -> Result<Vec<TerrainEvent>, RuleViolation> {
    let Some(cell) = ctx.board.cell_mut(coord) else {
        return Err(RuleViolation::OutOfBounds(coord));
    };
    if cell.terrain_revealed {
        return Ok(Vec::new());
    }
    cell.terrain_revealed = true;
    let terrain = cell.terrain;

    let mut events = vec![TerrainEvent::Revealed { coord, terrain }];
    match terrain {
        Terrain::Normal | Terrain::Block => {}
        Terrain::Skill => events.push(grant_random(ctx)),
        Terrain::Double => events.push(extra_turn(ctx)),
        Terrain::Bomb => events.push(bomb(ctx, coord)),
        Terrain::Freeze => events.push(skip_opponent(ctx)),
        Terrain::Teleport => events.push(teleport(ctx, coord)?),
        Terrain::Shield => events.push(shield(ctx, coord)),
        Terrain::Score => events.push(score_point(ctx)),
        Terrain::Mystery => {
            if ctx.mystery.is_empty() {
                events.push(TerrainEvent::Fizzled);
            } else {
                let effect = ctx.mystery[ctx.rng.random_range(0..ctx.mystery.len())];
                events.push(TerrainEvent::Mystery { effect });
                events.push(mystery(ctx, coord, effect));
            }
        }
    }
    debug!(%coord, %terrain, events = events.len(), "Tile triggered");
    Ok(events)
}

fn mystery(ctx: &mut TileContext<'_>, coord: Coord, effect: MysteryEffect) -> TerrainEvent {
    match effect {
        MysteryEffect::GrantSkill => grant_random(ctx),
        MysteryEffect::ExtraTurn => extra_turn(ctx),
        MysteryEffect::Bomb => bomb(ctx, coord),
        MysteryEffect::FreezeOpponent => skip_opponent(ctx),
        MysteryEffect::Shield => shield(ctx, coord),
        MysteryEffect::ScorePoint => score_point(ctx),
        MysteryEffect::StealSkill => {
            let side = ctx.side;
            let victim = side.opponent().index();
            match ctx.ledgers[victim].steal_random(&mut *ctx.rng) {
                Some(skill) => {
                    ctx.ledgers[side.index()].grant(skill, ctx.max_held);
                    TerrainEvent::SkillStolen { side, skill }
                }
                None => match ctx.steal_fallback {
                    StealFallback::GrantRandom => grant_random(ctx),
                    StealFallback::Nothing => TerrainEvent::Fizzled,
                },
            }
        }
    }
}

fn grant_random(ctx: &mut TileContext<'_>) -> TerrainEvent {
    let side = ctx.side;
    let ledger = &ctx.ledgers[side.index()];
    let options: Vec<SkillId> = ctx
        .skill_pool
        .iter()
        .copied()
        .filter(|id| !ledger.held().contains(id))
        .collect();
    if options.is_empty() || ledger.held().len() >= ctx.max_held {
        return TerrainEvent::Fizzled;
    }
    let skill = options[ctx.rng.random_range(0..options.len())];
    ctx.ledgers[side.index()].grant(skill, ctx.max_held);
    TerrainEvent::SkillGranted { side, skill }
}

fn extra_turn(ctx: &mut TileContext<'_>) -> TerrainEvent {
    ctx.ledgers[ctx.side.index()].add_effect(EffectKind::ExtraTurn, 1, 0);
    TerrainEvent::ExtraTurn { side: ctx.side }
}

fn skip_opponent(ctx: &mut TileContext<'_>) -> TerrainEvent {
    let opponent = ctx.side.opponent();
    ctx.ledgers[opponent.index()].add_effect(EffectKind::SkipTurn, 1, 0);
    TerrainEvent::TurnSkipped { side: opponent }
}

fn bomb(ctx: &mut TileContext<'_>, center: Coord) -> TerrainEvent {
    let enemy = ctx.side.opponent();
    let mut cleared = Vec::new();
    for c in ctx.board.area(center, 1) {
        let hit = ctx
            .board
            .stone(c)
            .is_some_and(|s| s.side == enemy && !s.is_protected());
        if hit {
            ctx.board.remove(c);
            cleared.push(c);
        }
    }
    TerrainEvent::Bombed { cleared }
}

fn teleport(ctx: &mut TileContext<'_>, from: Coord) -> Result<TerrainEvent, RuleViolation> {
    let board: &Board = ctx.board;
    let open: Vec<Coord> = board
        .open_cells()
        .into_iter()
        .filter(|c| !is_hidden_block(board, *c))
        .collect();
    if open.is_empty() {
        return Ok(TerrainEvent::Fizzled);
    }
    let to = open[ctx.rng.random_range(0..open.len())];
    ctx.board.relocate(from, to)?;
    Ok(TerrainEvent::Teleported { from, to })
}

fn shield(ctx: &mut TileContext<'_>, coord: Coord) -> TerrainEvent {
    match ctx.board.stone_mut(coord) {
        Some(stone) => {
            stone.shielded = true;
            TerrainEvent::Shielded { coord }
        }
        None => TerrainEvent::Fizzled,
    }
}

fn score_point(ctx: &mut TileContext<'_>) -> TerrainEvent {
    ctx.tile_bonus[ctx.side.index()] += 1;
    TerrainEvent::ScorePoint { side: ctx.side }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use strum::IntoEnumIterator;

    struct Fixture {
        board: Board,
        ledgers: [SkillLedger; 2],
        tile_bonus: [u32; 2],
        rng: StdRng,
        pool: Vec<SkillId>,
        mystery: Vec<MysteryEffect>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                board: Board::new(7),
                ledgers: [SkillLedger::new(0), SkillLedger::new(0)],
                tile_bonus: [0, 0],
                rng: StdRng::seed_from_u64(3),
                pool: SkillId::iter().collect(),
                mystery: vec![MysteryEffect::StealSkill],
            }
        }

        fn place_on(
            &mut self,
            coord: Coord,
            terrain: Terrain,
            side: Side,
            fallback: StealFallback,
        ) -> Vec<TerrainEvent> {
            self.board.cell_mut(coord).unwrap().terrain = terrain;
            self.board.place(coord, side).unwrap();
            let mut ctx = TileContext {
                board: &mut self.board,
                ledgers: &mut self.ledgers,
                tile_bonus: &mut self.tile_bonus,
                rng: &mut self.rng,
                side,
                skill_pool: &self.pool,
                max_held: 3,
                mystery: &self.mystery,
                steal_fallback: fallback,
            };
            trigger(&mut ctx, coord).unwrap()
        }
    }

    #[test]
    fn test_default_weights_leave_most_cells_normal() {
        let weights = TileWeights::default();
        assert_eq!(weights.special_total(), 20);
        let mut board = Board::new(15);
        generate(&mut board, &weights, &mut StdRng::seed_from_u64(9));
        let normal = board
            .coords()
            .filter(|c| board.cell(*c).unwrap().terrain == Terrain::Normal)
            .count();
        assert!(normal > 225 / 2);
    }

    #[test]
    fn test_generation_is_seeded() {
        let mut a = Board::new(15);
        let mut b = Board::new(15);
        generate(&mut a, &TileWeights::default(), &mut StdRng::seed_from_u64(1));
        generate(&mut b, &TileWeights::default(), &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_score_tile_adds_bonus_once() {
        let mut f = Fixture::new();
        let events =
            f.place_on(Coord::new(1, 1), Terrain::Score, Side::White, StealFallback::Nothing);
        assert!(events.contains(&TerrainEvent::ScorePoint { side: Side::White }));
        assert_eq!(f.tile_bonus, [0, 1]);

        let mut ctx = TileContext {
            board: &mut f.board,
            ledgers: &mut f.ledgers,
            tile_bonus: &mut f.tile_bonus,
            rng: &mut f.rng,
            side: Side::White,
            skill_pool: &f.pool,
            max_held: 3,
            mystery: &f.mystery,
            steal_fallback: StealFallback::Nothing,
        };
        assert!(trigger(&mut ctx, Coord::new(1, 1)).unwrap().is_empty());
        assert_eq!(f.tile_bonus, [0, 1]);
    }

    #[test]
    fn test_bomb_tile_clears_enemies_only() {
        let mut f = Fixture::new();
        f.board.place(Coord::new(2, 2), Side::White).unwrap();
        f.board.place(Coord::new(4, 4), Side::Black).unwrap();
        f.place_on(Coord::new(3, 3), Terrain::Bomb, Side::Black, StealFallback::Nothing);
        assert_eq!(f.board.occupant(Coord::new(2, 2)), None);
        assert_eq!(f.board.occupant(Coord::new(4, 4)), Some(Side::Black));
    }

    #[test]
    fn test_steal_with_empty_victim_uses_fallback() {
        let mut f = Fixture::new();
        let events =
            f.place_on(Coord::new(0, 0), Terrain::Mystery, Side::Black, StealFallback::GrantRandom);
        assert!(matches!(
            events.last(),
            Some(TerrainEvent::SkillGranted { side: Side::Black, .. })
        ));
        assert_eq!(f.ledgers[0].held().len(), 1);

        let events =
            f.place_on(Coord::new(0, 1), Terrain::Mystery, Side::White, StealFallback::Nothing);
        assert!(matches!(
            events.last(),
            Some(TerrainEvent::SkillStolen { side: Side::White, .. })
        ));
        assert!(f.ledgers[0].held().is_empty());
        assert_eq!(f.ledgers[1].held().len(), 1);
    }

    #[test]
    fn test_freeze_tile_marks_opponent_skip() {
        let mut f = Fixture::new();
        f.place_on(Coord::new(5, 5), Terrain::Freeze, Side::Black, StealFallback::Nothing);
        assert!(f.ledgers[Side::White.index()].has_active(EffectKind::SkipTurn));
    }

    #[test]
    fn test_teleport_skips_hidden_blocks() {
        let mut f = Fixture::new();
        let from = Coord::new(0, 0);
        let landing = Coord::new(6, 6);
        let coords: Vec<Coord> = f.board.coords().collect();
        for c in coords {
            if c != from && c != landing {
                f.board.cell_mut(c).unwrap().terrain = Terrain::Block;
            }
        }
        let events = f.place_on(from, Terrain::Teleport, Side::Black, StealFallback::Nothing);
        assert_eq!(events.last(), Some(&TerrainEvent::Teleported { from, to: landing }));
        assert_eq!(f.board.occupant(landing), Some(Side::Black));
        assert!(is_hidden_block(&f.board, Coord::new(3, 3)));
    }

    #[test]
    fn test_hidden_block_detection() {
        let mut board = Board::new(5);
        board.cell_mut(Coord::new(1, 1)).unwrap().terrain = Terrain::Block;
        assert!(is_hidden_block(&board, Coord::new(1, 1)));
        let events = reveal_block(&mut board, Coord::new(1, 1), Side::Black);
        assert_eq!(events.len(), 2);
        assert!(!is_hidden_block(&board, Coord::new(1, 1)));
        assert!(board.cell(Coord::new(1, 1)).unwrap().is_blocked());
    }
}
