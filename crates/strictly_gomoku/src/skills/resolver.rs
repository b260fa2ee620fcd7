//! Applies a skill's [`Effect`] to the board and ledgers.
//!
//! The resolver validates the target before it mutates anything, so a
//! rejected effect leaves the context as it found it.

use super::catalog::{AreaScope, Buff, Direction, Effect, SkillId, SkillSpec, SkillTarget};
use super::ledger::{EffectKind, SkillLedger};
use crate::action::RuleViolation;
use crate::types::{Board, Coord, Side, Stone, Terrain};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Mutable view over everything a skill may touch.
#[derive(Debug)]
pub struct SkillContext<'a> {
    /// Board.
    pub board: &'a mut Board,
    /// Ledgers indexed by [`Side::index`].
    pub ledgers: &'a mut [SkillLedger; 2],
    /// Acting side.
    pub side: Side,
    /// Match randomness.
    pub rng: &'a mut StdRng,
    /// Mana ceiling.
    pub mana_cap: u32,
}

impl SkillContext<'_> {
    fn own(&mut self) -> &mut SkillLedger {
        &mut self.ledgers[self.side.index()]
    }

    fn opponent(&mut self) -> &mut SkillLedger {
        &mut self.ledgers[self.side.opponent().index()]
    }
}

/// What a resolved skill touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillReport {
    /// Skill resolved.
    pub skill: SkillId,
    /// Cells whose contents changed or were flagged.
    pub affected: Vec<Coord>,
}

fn invalid(reason: impl Into<String>) -> RuleViolation {
    RuleViolation::InvalidTarget(reason.into())
}

fn require_own(board: &Board, coord: Coord, side: Side) -> Result<(), RuleViolation> {
    match board.stone(coord) {
        Some(stone) if stone.side == side && !stone.decoy => Ok(()),
        Some(_) => Err(invalid(format!("{coord} is not an own stone"))),
        None if board.contains(coord) => Err(invalid(format!("no stone at {coord}"))),
        None => Err(RuleViolation::OutOfBounds(coord)),
    }
}

fn require_enemy(board: &Board, coord: Coord, side: Side) -> Result<(), RuleViolation> {
    match board.stone(coord) {
        Some(stone) if stone.side == side => Err(invalid(format!("{coord} is an own stone"))),
        Some(stone) if stone.is_protected() => Err(invalid(format!("{coord} is protected"))),
        Some(_) => Ok(()),
        None if board.contains(coord) => Err(invalid(format!("no stone at {coord}"))),
        None => Err(RuleViolation::OutOfBounds(coord)),
    }
}

fn require_open(board: &Board, coord: Coord) -> Result<(), RuleViolation> {
    if !board.contains(coord) {
        return Err(RuleViolation::OutOfBounds(coord));
    }
    if !board.is_open(coord) {
        return Err(invalid(format!("{coord} is not open")));
    }
    Ok(())
}

fn require_on_board(board: &Board, coord: Coord) -> Result<(), RuleViolation> {
    if board.contains(coord) {
        Ok(())
    } else {
        Err(RuleViolation::OutOfBounds(coord))
    }
}

/// Resolves `spec` against `target`.
///
/// Eligibility (turn, mana, cooldown, use limit) is the caller's concern;
/// this only checks that the target makes sense for the effect.
///
/// # Errors
///
/// Returns [`RuleViolation::InvalidTarget`] or [`RuleViolation::OutOfBounds`]
/// for malformed or illegal targets.
#[instrument(skip(ctx, spec), fields(side = %ctx.side, skill = %spec.id))]
pub fn resolve(
    ctx: &mut SkillContext<'_>,
    spec: &SkillSpec,
    target: SkillTarget,
) -> Result<SkillReport, RuleViolation> {
    if !target.fits(spec.targeting) {
        return Err(invalid(format!(
            "{} needs a {:?} target",
            spec.id, spec.targeting
        )));
    }

    let affected = match (spec.effect, target) {
        (Effect::DestroyStone, SkillTarget::Cell(c)) => destroy(ctx, c)?,
        (Effect::ShieldStone, SkillTarget::Cell(c)) => shield(ctx, c)?,
        (Effect::ProtectStone { turns }, SkillTarget::Cell(c)) => protect(ctx, c, turns)?,
        (Effect::PlaceDecoy { turns }, SkillTarget::Cell(c)) => decoy(ctx, c, turns)?,
        (Effect::TeleportStone, SkillTarget::Pair(from, to)) => teleport(ctx, from, to)?,
        (Effect::CloneStone, SkillTarget::Pair(src, dst)) => clone_stone(ctx, src, dst)?,
        (Effect::SwapStones, SkillTarget::Pair(own, enemy)) => swap(ctx, own, enemy)?,
        (Effect::PushLine, SkillTarget::Directed(c, dir)) => push(ctx, c, dir)?,
        (Effect::ClearArea { scope }, SkillTarget::Area(c)) => clear_area(ctx, c, scope)?,
        (Effect::BlockArea, SkillTarget::Area(c)) => block_area(ctx, c)?,
        (Effect::ResetArea, SkillTarget::Area(c)) => reset_area(ctx, c)?,
        (Effect::ShuffleArea, SkillTarget::Area(c)) => shuffle_area(ctx, c)?,
        (Effect::ScatterArea, SkillTarget::Area(c)) => scatter_area(ctx, c)?,
        (Effect::RestoreMana(amount), SkillTarget::None) => {
            let cap = ctx.mana_cap;
            ctx.own().gain_mana(amount, cap);
            Vec::new()
        }
        (Effect::ReduceCooldowns(amount), SkillTarget::None) => {
            ctx.own().reduce_cooldowns(amount, spec.id);
            Vec::new()
        }
        (Effect::GrantBuff(Buff::TwoSkillsNextTurn), SkillTarget::None) => {
            ctx.own().add_effect(EffectKind::TwoSkillsNextTurn, 1, 1);
            Vec::new()
        }
        (Effect::GrantBuff(Buff::ExtraTurn), SkillTarget::None) => {
            ctx.own().add_effect(EffectKind::ExtraTurn, 1, 0);
            Vec::new()
        }
        (Effect::FreezeOpponentSkills { turns }, SkillTarget::None) => {
            ctx.opponent().add_effect(EffectKind::SkillsFrozen, turns, 0);
            Vec::new()
        }
        (Effect::DrainMana(amount), SkillTarget::None) => {
            let drained = ctx.opponent().drain_mana(amount);
            debug!(drained, "Opponent mana drained");
            Vec::new()
        }
        (Effect::ChaosJump, SkillTarget::None) => {
            let cells: Vec<Coord> = ctx.board.coords().collect();
            permute(ctx, &cells)
        }
        (effect, target) => {
            return Err(invalid(format!("{effect:?} cannot take {target:?}")));
        }
    };

    debug!(affected = affected.len(), "Skill resolved");
    Ok(SkillReport {
        skill: spec.id,
        affected,
    })
}

fn destroy(ctx: &mut SkillContext<'_>, c: Coord) -> Result<Vec<Coord>, RuleViolation> {
    require_enemy(ctx.board, c, ctx.side)?;
    ctx.board.remove(c);
    Ok(vec![c])
}

fn shield(ctx: &mut SkillContext<'_>, c: Coord) -> Result<Vec<Coord>, RuleViolation> {
    require_own(ctx.board, c, ctx.side)?;
    let stone = ctx.board.stone_mut(c).ok_or_else(|| invalid("stone vanished"))?;
    if stone.shielded {
        return Err(invalid(format!("{c} is already shielded")));
    }
    stone.shielded = true;
    Ok(vec![c])
}

fn protect(ctx: &mut SkillContext<'_>, c: Coord, turns: u32) -> Result<Vec<Coord>, RuleViolation> {
    require_own(ctx.board, c, ctx.side)?;
    let stone = ctx.board.stone_mut(c).ok_or_else(|| invalid("stone vanished"))?;
    stone.frozen_turns = stone.frozen_turns.max(turns);
    Ok(vec![c])
}

fn decoy(ctx: &mut SkillContext<'_>, c: Coord, turns: u32) -> Result<Vec<Coord>, RuleViolation> {
    require_open(ctx.board, c)?;
    let mut stone = Stone::new(ctx.side, 0);
    stone.decoy = true;
    stone.frozen_turns = turns;
    ctx.board.place_stone(c, stone)?;
    Ok(vec![c])
}

fn teleport(
    ctx: &mut SkillContext<'_>,
    from: Coord,
    to: Coord,
) -> Result<Vec<Coord>, RuleViolation> {
    require_own(ctx.board, from, ctx.side)?;
    require_open(ctx.board, to)?;
    ctx.board.relocate(from, to)?;
    Ok(vec![from, to])
}

fn clone_stone(
    ctx: &mut SkillContext<'_>,
    src: Coord,
    dst: Coord,
) -> Result<Vec<Coord>, RuleViolation> {
    require_own(ctx.board, src, ctx.side)?;
    require_open(ctx.board, dst)?;
    if src.x.abs_diff(dst.x) > 1 || src.y.abs_diff(dst.y) > 1 {
        return Err(invalid(format!("{dst} is not adjacent to {src}")));
    }
    ctx.board.place(dst, ctx.side)?;
    Ok(vec![dst])
}

fn swap(ctx: &mut SkillContext<'_>, own: Coord, enemy: Coord) -> Result<Vec<Coord>, RuleViolation> {
    require_own(ctx.board, own, ctx.side)?;
    require_enemy(ctx.board, enemy, ctx.side)?;
    ctx.board.swap_stones(own, enemy);
    Ok(vec![own, enemy])
}

fn push(
    ctx: &mut SkillContext<'_>,
    start: Coord,
    dir: Direction,
) -> Result<Vec<Coord>, RuleViolation> {
    require_enemy(ctx.board, start, ctx.side)?;
    let (dx, dy) = dir.delta();

    let mut line = vec![start];
    let mut cursor = start;
    let landing = loop {
        match ctx.board.offset(cursor, dx, dy) {
            None => return Err(invalid("push would leave the board")),
            Some(next) if ctx.board.stone(next).is_some() => {
                line.push(next);
                cursor = next;
            }
            Some(next) if ctx.board.cell(next).is_some_and(|c| c.is_blocked()) => {
                return Err(invalid(format!("push blocked at {next}")));
            }
            Some(next) => break next,
        }
    };

    let mut affected = vec![landing];
    for from in line.into_iter().rev() {
        let to = ctx
            .board
            .offset(from, dx, dy)
            .ok_or_else(|| invalid("push would leave the board"))?;
        ctx.board.relocate(from, to)?;
        affected.push(from);
    }
    Ok(affected)
}

fn clear_area(
    ctx: &mut SkillContext<'_>,
    center: Coord,
    scope: AreaScope,
) -> Result<Vec<Coord>, RuleViolation> {
    require_on_board(ctx.board, center)?;
    let side = ctx.side;
    let mut cleared = Vec::new();
    for c in ctx.board.area(center, 1) {
        let Some(stone) = ctx.board.stone(c) else {
            continue;
        };
        let in_scope = match scope {
            AreaScope::Enemy => stone.side != side,
            AreaScope::All => true,
        };
        if in_scope && !stone.is_protected() {
            ctx.board.remove(c);
            cleared.push(c);
        }
    }
    Ok(cleared)
}

fn block_area(ctx: &mut SkillContext<'_>, center: Coord) -> Result<Vec<Coord>, RuleViolation> {
    require_on_board(ctx.board, center)?;
    let open: Vec<Coord> = ctx
        .board
        .area(center, 1)
        .into_iter()
        .filter(|c| ctx.board.is_open(*c))
        .collect();
    if open.is_empty() {
        return Err(invalid(format!("no open cells around {center}")));
    }
    for c in &open {
        if let Some(cell) = ctx.board.cell_mut(*c) {
            cell.terrain = Terrain::Block;
            cell.terrain_revealed = true;
        }
    }
    Ok(open)
}

fn reset_area(ctx: &mut SkillContext<'_>, center: Coord) -> Result<Vec<Coord>, RuleViolation> {
    require_on_board(ctx.board, center)?;
    let mut touched = Vec::new();
    for c in ctx.board.area(center, 1) {
        let Some(cell) = ctx.board.cell_mut(c) else {
            continue;
        };
        let mut changed = false;
        if cell.is_blocked() {
            cell.terrain = Terrain::Normal;
            changed = true;
        }
        if cell.stone.is_some_and(|s| s.decoy) {
            cell.stone = None;
            changed = true;
        } else if let Some(stone) = cell
            .stone
            .as_mut()
            .filter(|s| s.shielded || s.frozen_turns > 0)
        {
            stone.shielded = false;
            stone.frozen_turns = 0;
            changed = true;
        }
        if changed {
            touched.push(c);
        }
    }
    Ok(touched)
}

fn shuffle_area(ctx: &mut SkillContext<'_>, center: Coord) -> Result<Vec<Coord>, RuleViolation> {
    require_on_board(ctx.board, center)?;
    let cells = ctx.board.area(center, 1);
    Ok(permute(ctx, &cells))
}

/// Randomly redistributes stones among `cells`, skipping blocked cells and
/// protected stones. Returns the cells whose contents changed.
fn permute(ctx: &mut SkillContext<'_>, cells: &[Coord]) -> Vec<Coord> {
    let movable: Vec<Coord> = cells
        .iter()
        .copied()
        .filter(|c| {
            ctx.board.cell(*c).is_some_and(|cell| {
                !cell.is_blocked() && !cell.stone.is_some_and(|s| s.is_protected())
            })
        })
        .collect();

    let before: Vec<Option<Stone>> = movable.iter().map(|c| ctx.board.stone(*c).copied()).collect();
    let mut contents = before.clone();
    contents.shuffle(&mut *ctx.rng);

    let mut changed = Vec::new();
    for ((c, old), new) in movable.iter().zip(before).zip(contents) {
        if let Some(cell) = ctx.board.cell_mut(*c) {
            cell.stone = new;
        }
        if old.map(|s| s.placement_index) != new.map(|s| s.placement_index) {
            changed.push(*c);
        }
    }
    changed
}

fn scatter_area(ctx: &mut SkillContext<'_>, center: Coord) -> Result<Vec<Coord>, RuleViolation> {
    require_on_board(ctx.board, center)?;
    let stones: Vec<Coord> = ctx
        .board
        .area(center, 1)
        .into_iter()
        .filter(|c| ctx.board.stone(*c).is_some_and(|s| !s.is_protected()))
        .collect();

    let mut moved = Vec::new();
    for from in stones {
        let options: Vec<Coord> = ctx
            .board
            .area(from, 1)
            .into_iter()
            .filter(|c| *c != from && ctx.board.is_open(*c))
            .collect();
        if options.is_empty() {
            continue;
        }
        let to = options[ctx.rng.random_range(0..options.len())];
        ctx.board.relocate(from, to)?;
        moved.push(from);
        moved.push(to);
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct Fixture {
        board: Board,
        ledgers: [SkillLedger; 2],
        rng: StdRng,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                board: Board::new(9),
                ledgers: [SkillLedger::new(10), SkillLedger::new(10)],
                rng: StdRng::seed_from_u64(11),
            }
        }

        fn run(
            &mut self,
            side: Side,
            id: SkillId,
            target: SkillTarget,
        ) -> Result<SkillReport, RuleViolation> {
            let mut ctx = SkillContext {
                board: &mut self.board,
                ledgers: &mut self.ledgers,
                side,
                rng: &mut self.rng,
                mana_cap: 15,
            };
            resolve(&mut ctx, id.spec(), target)
        }
    }

    #[test]
    fn test_destroy_removes_enemy_stone() {
        let mut f = Fixture::new();
        f.board.place(Coord::new(4, 4), Side::White).unwrap();
        f.run(Side::Black, SkillId::Destroy, SkillTarget::Cell(Coord::new(4, 4)))
            .unwrap();
        assert_eq!(f.board.occupant(Coord::new(4, 4)), None);
    }

    #[test]
    fn test_shielded_stone_resists_destroy_bomb_and_push() {
        let mut f = Fixture::new();
        let c = Coord::new(4, 4);
        f.board.place(c, Side::White).unwrap();
        f.board.stone_mut(c).unwrap().shielded = true;

        assert!(f.run(Side::Black, SkillId::Destroy, SkillTarget::Cell(c)).is_err());
        assert!(
            f.run(Side::Black, SkillId::Push, SkillTarget::Directed(c, Direction::Right))
                .is_err()
        );
        f.run(Side::Black, SkillId::Bomb, SkillTarget::Area(c)).unwrap();
        assert_eq!(f.board.occupant(c), Some(Side::White));
    }

    #[test]
    fn test_push_shifts_whole_line() {
        let mut f = Fixture::new();
        f.board.place(Coord::new(2, 1), Side::White).unwrap();
        f.board.place(Coord::new(3, 1), Side::Black).unwrap();
        f.run(
            Side::Black,
            SkillId::Push,
            SkillTarget::Directed(Coord::new(2, 1), Direction::Right),
        )
        .unwrap();
        assert_eq!(f.board.occupant(Coord::new(2, 1)), None);
        assert_eq!(f.board.occupant(Coord::new(3, 1)), Some(Side::White));
        assert_eq!(f.board.occupant(Coord::new(4, 1)), Some(Side::Black));
    }

    #[test]
    fn test_push_off_board_rejected_without_mutation() {
        let mut f = Fixture::new();
        f.board.place(Coord::new(7, 0), Side::White).unwrap();
        f.board.place(Coord::new(8, 0), Side::White).unwrap();
        let before = f.board.clone();
        let result = f.run(
            Side::Black,
            SkillId::Push,
            SkillTarget::Directed(Coord::new(7, 0), Direction::Right),
        );
        assert!(matches!(result, Err(RuleViolation::InvalidTarget(_))));
        assert_eq!(f.board, before);
    }

    #[test]
    fn test_push_blocked_by_block_terrain() {
        let mut f = Fixture::new();
        f.board.place(Coord::new(2, 2), Side::White).unwrap();
        let cell = f.board.cell_mut(Coord::new(2, 3)).unwrap();
        cell.terrain = Terrain::Block;
        cell.terrain_revealed = true;
        let result = f.run(
            Side::Black,
            SkillId::Push,
            SkillTarget::Directed(Coord::new(2, 2), Direction::Down),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_swap_exchanges_positions() {
        let mut f = Fixture::new();
        f.board.place(Coord::new(0, 0), Side::Black).unwrap();
        f.board.place(Coord::new(5, 5), Side::White).unwrap();
        f.run(
            Side::Black,
            SkillId::Swap,
            SkillTarget::Pair(Coord::new(0, 0), Coord::new(5, 5)),
        )
        .unwrap();
        assert_eq!(f.board.occupant(Coord::new(0, 0)), Some(Side::White));
        assert_eq!(f.board.occupant(Coord::new(5, 5)), Some(Side::Black));
    }

    #[test]
    fn test_clone_requires_adjacency() {
        let mut f = Fixture::new();
        f.board.place(Coord::new(3, 3), Side::Black).unwrap();
        assert!(
            f.run(
                Side::Black,
                SkillId::Clone,
                SkillTarget::Pair(Coord::new(3, 3), Coord::new(6, 6))
            )
            .is_err()
        );
        f.run(
            Side::Black,
            SkillId::Clone,
            SkillTarget::Pair(Coord::new(3, 3), Coord::new(4, 4)),
        )
        .unwrap();
        assert_eq!(f.board.occupant(Coord::new(4, 4)), Some(Side::Black));
    }

    #[test]
    fn test_wrong_target_shape_rejected() {
        let mut f = Fixture::new();
        let result = f.run(Side::Black, SkillId::ManaRestore, SkillTarget::Cell(Coord::new(0, 0)));
        assert!(matches!(result, Err(RuleViolation::InvalidTarget(_))));
    }

    #[test]
    fn test_freeze_and_drain_hit_opponent() {
        let mut f = Fixture::new();
        f.run(Side::Black, SkillId::FreezeSkills, SkillTarget::None).unwrap();
        f.run(Side::Black, SkillId::ManaDrain, SkillTarget::None).unwrap();
        assert!(f.ledgers[Side::White.index()].skills_disabled());
        assert_eq!(f.ledgers[Side::White.index()].mana(), 7);
        assert!(!f.ledgers[Side::Black.index()].skills_disabled());
    }

    #[test]
    fn test_chaos_jump_preserves_stone_counts() {
        let mut f = Fixture::new();
        for x in 0..4 {
            f.board.place(Coord::new(x, 0), Side::Black).unwrap();
            f.board.place(Coord::new(x, 1), Side::White).unwrap();
        }
        f.run(Side::Black, SkillId::ChaosJump, SkillTarget::None).unwrap();
        assert_eq!(f.board.stones_of(Side::Black).count(), 4);
        assert_eq!(f.board.stones_of(Side::White).count(), 4);
    }

    #[test]
    fn test_block_area_blocks_only_open_cells() {
        let mut f = Fixture::new();
        f.board.place(Coord::new(4, 4), Side::White).unwrap();
        let blocked = f
            .run(Side::Black, SkillId::BlockArea, SkillTarget::Area(Coord::new(4, 4)))
            .unwrap();
        assert_eq!(blocked.affected.len(), 8);
        assert!(f.board.cell(Coord::new(3, 3)).unwrap().is_blocked());
        assert_eq!(f.board.occupant(Coord::new(4, 4)), Some(Side::White));
    }
}
