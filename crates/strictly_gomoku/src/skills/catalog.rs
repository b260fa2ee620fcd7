//! The closed skill catalog.
//!
//! Each [`SkillId`] maps to exactly one [`SkillSpec`] in [`CATALOG`]; the
//! spec's [`Effect`] carries the typed payload the resolver needs.

use crate::types::Coord;
use serde::{Deserialize, Serialize};

/// Identifier of a catalog skill.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkillId {
    /// Remove one enemy stone.
    Destroy,
    /// Shield one own stone permanently.
    Shield,
    /// Make one own stone untargetable for a few turns.
    Protect,
    /// Place a temporary decoy stone.
    FakePiece,
    /// Move one own stone to any open cell.
    Teleport,
    /// Copy one own stone to an adjacent open cell.
    Clone,
    /// Exchange one own stone with one enemy stone.
    Swap,
    /// Shove an enemy line one step.
    Push,
    /// Clear enemy stones in a 3x3 area.
    Bomb,
    /// Clear all stones in a 3x3 area.
    Burn,
    /// Turn open cells in a 3x3 area into block terrain.
    BlockArea,
    /// Strip shields, decoys and blocks in a 3x3 area.
    Reset,
    /// Permute stones within a 3x3 area.
    Shuffle,
    /// Nudge every stone in a 3x3 area to a random neighbouring open cell.
    ChaosMove,
    /// Regain mana.
    ManaRestore,
    /// Shorten all own cooldowns.
    CooldownReduction,
    /// Allow two skills next turn.
    TwoSkillsNextTurn,
    /// Disable the opponent's skills for their next turn.
    FreezeSkills,
    /// Remove opponent mana.
    ManaDrain,
    /// Take another turn after this one.
    ExtraTurn,
    /// Reshuffle every stone across the board.
    ChaosJump,
}

impl SkillId {
    /// Catalog entry for this skill.
    pub fn spec(self) -> &'static SkillSpec {
        &CATALOG[self as usize]
    }
}

/// Targeting shape a skill requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Targeting {
    /// One cell.
    Cell,
    /// Two cells (source then destination).
    TwoCells,
    /// One cell and a cardinal direction.
    Directional,
    /// 3x3 area centered on a cell.
    Area,
    /// No target.
    Global,
}

/// Cardinal direction for push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter)]
pub enum Direction {
    /// Decreasing `y`.
    Up,
    /// Increasing `y`.
    Down,
    /// Decreasing `x`.
    Left,
    /// Increasing `x`.
    Right,
}

impl Direction {
    /// Unit step.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// Target supplied with a skill use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillTarget {
    /// Global skills.
    None,
    /// Single-cell skills.
    Cell(Coord),
    /// Two-selection skills: source, destination.
    Pair(Coord, Coord),
    /// Push: enemy stone and direction.
    Directed(Coord, Direction),
    /// Area skills: center of the 3x3.
    Area(Coord),
}

impl SkillTarget {
    /// Whether this target has the shape `targeting` needs.
    pub fn fits(&self, targeting: Targeting) -> bool {
        matches!(
            (self, targeting),
            (SkillTarget::None, Targeting::Global)
                | (SkillTarget::Cell(_), Targeting::Cell)
                | (SkillTarget::Pair(..), Targeting::TwoCells)
                | (SkillTarget::Directed(..), Targeting::Directional)
                | (SkillTarget::Area(_), Targeting::Area)
        )
    }
}

/// Which stones an area clear removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaScope {
    /// Only the opponent's stones.
    Enemy,
    /// Stones of both sides.
    All,
}

/// Timed buffs a skill can grant its user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Buff {
    /// Use limit of two on the next turn.
    TwoSkillsNextTurn,
    /// Move again after ending this turn.
    ExtraTurn,
}

/// What a skill does. One resolver arm per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Remove an unprotected enemy stone.
    DestroyStone,
    /// Shield an own stone.
    ShieldStone,
    /// Freeze an own stone, making it untargetable while frozen.
    ProtectStone {
        /// Frozen turns.
        turns: u32,
    },
    /// Place a decoy on an open cell that expires.
    PlaceDecoy {
        /// Turns before the decoy vanishes.
        turns: u32,
    },
    /// Move an own stone to an open cell.
    TeleportStone,
    /// Copy an own stone to an adjacent open cell.
    CloneStone,
    /// Exchange an own stone with an unprotected enemy stone.
    SwapStones,
    /// Shift the line starting at an enemy stone one step.
    PushLine,
    /// Remove unprotected stones in the area.
    ClearArea {
        /// Whose stones.
        scope: AreaScope,
    },
    /// Open cells in the area become revealed block terrain.
    BlockArea,
    /// Strip shields, decoys and block terrain in the area.
    ResetArea,
    /// Randomly permute the unprotected stones and open cells of the area.
    ShuffleArea,
    /// Move each unprotected stone in the area to a random adjacent open cell.
    ScatterArea,
    /// Gain mana.
    RestoreMana(u32),
    /// Reduce every other own cooldown.
    ReduceCooldowns(u32),
    /// Grant a timed buff.
    GrantBuff(Buff),
    /// Freeze the opponent's skills.
    FreezeOpponentSkills {
        /// Opponent turns affected.
        turns: u32,
    },
    /// Remove opponent mana.
    DrainMana(u32),
    /// Reshuffle every unprotected stone across all open cells.
    ChaosJump,
}

/// Static description of a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkillSpec {
    /// Identifier.
    pub id: SkillId,
    /// Mana cost.
    pub mana_cost: u32,
    /// Base cooldown in own turns.
    pub cooldown: u32,
    /// Required target shape.
    pub targeting: Targeting,
    /// Effect payload.
    pub effect: Effect,
}

const fn spec(
    id: SkillId,
    mana_cost: u32,
    cooldown: u32,
    targeting: Targeting,
    effect: Effect,
) -> SkillSpec {
    SkillSpec {
        id,
        mana_cost,
        cooldown,
        targeting,
        effect,
    }
}

/// Every skill, indexed by `SkillId as usize`.
pub const CATALOG: [SkillSpec; 21] = [
    spec(SkillId::Destroy, 4, 3, Targeting::Cell, Effect::DestroyStone),
    spec(SkillId::Shield, 2, 2, Targeting::Cell, Effect::ShieldStone),
    spec(SkillId::Protect, 3, 3, Targeting::Cell, Effect::ProtectStone { turns: 2 }),
    spec(SkillId::FakePiece, 2, 3, Targeting::Cell, Effect::PlaceDecoy { turns: 3 }),
    spec(SkillId::Teleport, 3, 3, Targeting::TwoCells, Effect::TeleportStone),
    spec(SkillId::Clone, 5, 4, Targeting::TwoCells, Effect::CloneStone),
    spec(SkillId::Swap, 4, 4, Targeting::TwoCells, Effect::SwapStones),
    spec(SkillId::Push, 3, 3, Targeting::Directional, Effect::PushLine),
    spec(SkillId::Bomb, 6, 5, Targeting::Area, Effect::ClearArea { scope: AreaScope::Enemy }),
    spec(SkillId::Burn, 5, 5, Targeting::Area, Effect::ClearArea { scope: AreaScope::All }),
    spec(SkillId::BlockArea, 4, 4, Targeting::Area, Effect::BlockArea),
    spec(SkillId::Reset, 3, 3, Targeting::Area, Effect::ResetArea),
    spec(SkillId::Shuffle, 4, 4, Targeting::Area, Effect::ShuffleArea),
    spec(SkillId::ChaosMove, 4, 4, Targeting::Area, Effect::ScatterArea),
    spec(SkillId::ManaRestore, 0, 5, Targeting::Global, Effect::RestoreMana(4)),
    spec(SkillId::CooldownReduction, 2, 4, Targeting::Global, Effect::ReduceCooldowns(2)),
    spec(
        SkillId::TwoSkillsNextTurn,
        3,
        5,
        Targeting::Global,
        Effect::GrantBuff(Buff::TwoSkillsNextTurn),
    ),
    spec(SkillId::FreezeSkills, 4, 5, Targeting::Global, Effect::FreezeOpponentSkills { turns: 1 }),
    spec(SkillId::ManaDrain, 2, 4, Targeting::Global, Effect::DrainMana(3)),
    spec(SkillId::ExtraTurn, 7, 6, Targeting::Global, Effect::GrantBuff(Buff::ExtraTurn)),
    spec(SkillId::ChaosJump, 8, 8, Targeting::Global, Effect::ChaosJump),
];

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_catalog_is_indexed_by_id() {
        for id in SkillId::iter() {
            assert_eq!(id.spec().id, id);
        }
        assert_eq!(SkillId::iter().count(), CATALOG.len());
    }

    #[test]
    fn test_skill_ids_parse_from_snake_case() {
        assert_eq!("two_skills_next_turn".parse::<SkillId>(), Ok(SkillId::TwoSkillsNextTurn));
        assert_eq!(SkillId::ChaosJump.to_string(), "chaos_jump");
    }

    #[test]
    fn test_target_shapes() {
        assert!(SkillTarget::None.fits(SkillId::ManaRestore.spec().targeting));
        assert!(!SkillTarget::Cell(Coord::new(0, 0)).fits(SkillId::Teleport.spec().targeting));
        let directed = SkillTarget::Directed(Coord::new(0, 0), Direction::Up);
        assert!(directed.fits(Targeting::Directional));
    }
}
