//! Skill system: catalog, per-side ledgers and the effect resolver.

mod catalog;
mod ledger;
mod resolver;

pub use catalog::{
    AreaScope, Buff, CATALOG, Direction, Effect, SkillId, SkillSpec, SkillTarget, Targeting,
};
pub use ledger::{ActiveEffect, EffectKind, LedgerDelta, SkillLedger, draw_candidates};
pub use resolver::{SkillContext, SkillReport, resolve};
