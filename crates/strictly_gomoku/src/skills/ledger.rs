//! Per-side mana, cooldown and buff bookkeeping.

use super::catalog::SkillId;
use crate::action::RuleViolation;
use crate::types::Side;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Kind of timed effect attached to a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Use limit raised by one.
    TwoSkillsNextTurn,
    /// No skills may be used.
    SkillsFrozen,
    /// The side moves again after ending its turn.
    ExtraTurn,
    /// The side's next turn is skipped.
    SkipTurn,
}

/// A timed effect.
///
/// The effect is dormant while `delay > 0`; `delay` counts down at the start
/// of each own turn, `remaining_duration` at the end of each own turn once
/// active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEffect {
    /// Effect kind.
    pub kind: EffectKind,
    /// Own turns the effect stays active.
    pub remaining_duration: u32,
    /// Own turn starts before the effect activates.
    pub delay: u32,
}

impl ActiveEffect {
    /// Whether the effect currently applies.
    pub fn is_active(&self) -> bool {
        self.delay == 0 && self.remaining_duration > 0
    }
}

/// One side's skill economy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillLedger {
    mana: u32,
    cooldowns: BTreeMap<SkillId, u32>,
    held: BTreeSet<SkillId>,
    candidates: Vec<SkillId>,
    effects: Vec<ActiveEffect>,
    skills_used_this_turn: u32,
}

impl SkillLedger {
    /// Creates a ledger with starting mana.
    pub fn new(mana: u32) -> Self {
        Self {
            mana,
            cooldowns: BTreeMap::new(),
            held: BTreeSet::new(),
            candidates: Vec::new(),
            effects: Vec::new(),
            skills_used_this_turn: 0,
        }
    }

    /// Current mana.
    pub fn mana(&self) -> u32 {
        self.mana
    }

    /// Turns remaining on each cooling skill.
    pub fn cooldowns(&self) -> &BTreeMap<SkillId, u32> {
        &self.cooldowns
    }

    /// Remaining cooldown of one skill.
    pub fn cooldown(&self, id: SkillId) -> u32 {
        self.cooldowns.get(&id).copied().unwrap_or(0)
    }

    /// Prepaid skills carried across draws.
    pub fn held(&self) -> &BTreeSet<SkillId> {
        &self.held
    }

    /// This turn's drawn candidates.
    pub fn candidates(&self) -> &[SkillId] {
        &self.candidates
    }

    /// Timed effects.
    pub fn effects(&self) -> &[ActiveEffect] {
        &self.effects
    }

    /// Skills used so far this turn.
    pub fn skills_used_this_turn(&self) -> u32 {
        self.skills_used_this_turn
    }

    /// Whether an effect of `kind` currently applies.
    pub fn has_active(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind && e.is_active())
    }

    /// Skill uses allowed this turn.
    pub fn use_limit(&self, base: u32) -> u32 {
        if self.has_active(EffectKind::TwoSkillsNextTurn) {
            base + 1
        } else {
            base
        }
    }

    /// Whether an opponent effect blocks skill use.
    pub fn skills_disabled(&self) -> bool {
        self.has_active(EffectKind::SkillsFrozen)
    }

    /// Whether the skill can be chosen this turn.
    pub fn is_available(&self, id: SkillId) -> bool {
        self.candidates.contains(&id) || self.held.contains(&id)
    }

    /// Adds mana, saturating at `cap`.
    pub fn gain_mana(&mut self, amount: u32, cap: u32) {
        self.mana = self.mana.saturating_add(amount).min(cap);
    }

    /// Removes mana, flooring at zero. Returns the amount actually removed.
    pub fn drain_mana(&mut self, amount: u32) -> u32 {
        let drained = amount.min(self.mana);
        self.mana -= drained;
        drained
    }

    /// Deducts `cost` mana.
    ///
    /// # Errors
    ///
    /// Returns [`RuleViolation::InsufficientMana`] without deducting anything
    /// when the balance is short.
    pub fn spend(&mut self, cost: u32) -> Result<(), RuleViolation> {
        if self.mana < cost {
            return Err(RuleViolation::InsufficientMana {
                need: cost,
                have: self.mana,
            });
        }
        self.mana -= cost;
        Ok(())
    }

    /// Starts a skill's cooldown.
    pub fn set_cooldown(&mut self, id: SkillId, turns: u32) {
        if turns == 0 {
            self.cooldowns.remove(&id);
        } else {
            self.cooldowns.insert(id, turns);
        }
    }

    /// Shortens every cooldown except `except`'s by `amount`.
    pub fn reduce_cooldowns(&mut self, amount: u32, except: SkillId) {
        for (id, turns) in self.cooldowns.iter_mut() {
            if *id != except {
                *turns = turns.saturating_sub(amount);
            }
        }
        self.cooldowns.retain(|_, turns| *turns > 0);
    }

    /// Attaches a timed effect.
    pub fn add_effect(&mut self, kind: EffectKind, duration: u32, delay: u32) {
        self.effects.push(ActiveEffect {
            kind,
            remaining_duration: duration,
            delay,
        });
    }

    /// Consumes one active effect of `kind`. Returns whether one was present.
    pub fn take_effect(&mut self, kind: EffectKind) -> bool {
        match self.effects.iter().position(|e| e.kind == kind && e.is_active()) {
            Some(i) => {
                self.effects.remove(i);
                true
            }
            None => false,
        }
    }

    /// Pays for a candidate up front so it survives into the next draw.
    ///
    /// # Errors
    ///
    /// Rejects skills that are not candidates, already held, over the held
    /// limit, or unaffordable.
    #[instrument(skip(self), fields(mana = self.mana))]
    pub fn hold(&mut self, id: SkillId, cost: u32, max_held: usize) -> Result<(), RuleViolation> {
        if !self.candidates.contains(&id) || self.held.contains(&id) {
            return Err(RuleViolation::SkillUnavailable(id));
        }
        if self.held.len() >= max_held {
            return Err(RuleViolation::HeldLimitReached(max_held));
        }
        self.spend(cost)?;
        self.candidates.retain(|c| *c != id);
        self.held.insert(id);
        debug!(%id, "Skill held");
        Ok(())
    }

    /// Adds a skill to the held set without charging for it.
    ///
    /// Returns `false` when the held set is full or already contains it.
    pub fn grant(&mut self, id: SkillId, max_held: usize) -> bool {
        if self.held.len() >= max_held || self.held.contains(&id) {
            return false;
        }
        self.held.insert(id)
    }

    /// Removes and returns a random held skill.
    pub fn steal_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<SkillId> {
        let held: Vec<_> = self.held.iter().copied().collect();
        if held.is_empty() {
            return None;
        }
        let id = held[rng.random_range(0..held.len())];
        self.held.remove(&id);
        Some(id)
    }

    /// Records a successful use of `id`.
    ///
    /// Clears the two-skills buff once the raised limit is exhausted.
    pub fn record_use(&mut self, id: SkillId, base_limit: u32) {
        self.skills_used_this_turn += 1;
        self.candidates.retain(|c| *c != id);
        self.held.remove(&id);
        if self.has_active(EffectKind::TwoSkillsNextTurn)
            && self.skills_used_this_turn >= self.use_limit(base_limit)
        {
            self.effects
                .retain(|e| !(e.kind == EffectKind::TwoSkillsNextTurn && e.is_active()));
        }
    }

    /// Starts an own turn with freshly drawn candidates.
    pub fn begin_turn(&mut self, candidates: Vec<SkillId>) {
        self.skills_used_this_turn = 0;
        for effect in &mut self.effects {
            effect.delay = effect.delay.saturating_sub(1);
        }
        self.candidates = candidates;
    }

    /// Ends an own turn: cooldowns tick, mana regenerates, active effects age.
    pub fn end_turn(&mut self, regen: u32, cap: u32) {
        for turns in self.cooldowns.values_mut() {
            *turns = turns.saturating_sub(1);
        }
        self.cooldowns.retain(|_, turns| *turns > 0);
        self.gain_mana(regen, cap);
        for effect in &mut self.effects {
            if effect.delay == 0 {
                effect.remaining_duration = effect.remaining_duration.saturating_sub(1);
            }
        }
        self.effects.retain(|e| e.remaining_duration > 0);
        self.skills_used_this_turn = 0;
        self.candidates.clear();
    }
}

/// Draws up to `count` candidates: held skills first, then random distinct
/// picks from `pool`.
pub fn draw_candidates<R: Rng + ?Sized>(
    rng: &mut R,
    pool: &[SkillId],
    held: &BTreeSet<SkillId>,
    count: usize,
) -> Vec<SkillId> {
    let mut drawn: Vec<SkillId> = held.iter().copied().take(count).collect();
    let mut rest: Vec<SkillId> = pool
        .iter()
        .copied()
        .filter(|id| !held.contains(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    rest.shuffle(rng);
    let missing = count.saturating_sub(drawn.len());
    drawn.extend(rest.into_iter().take(missing));
    drawn
}

/// Ledger changes produced by one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDelta {
    /// Ledger owner.
    pub side: Side,
    /// Mana before the action.
    pub mana_before: u32,
    /// Mana after the action.
    pub mana_after: u32,
    /// Cooldowns after the action.
    pub cooldowns: BTreeMap<SkillId, u32>,
    /// Held skills after the action.
    pub held: BTreeSet<SkillId>,
    /// Skills used this turn after the action.
    pub skills_used_this_turn: u32,
}

impl LedgerDelta {
    /// Summarises the change from `before` to `after`.
    pub fn between(side: Side, before: &SkillLedger, after: &SkillLedger) -> Self {
        Self {
            side,
            mana_before: before.mana,
            mana_after: after.mana,
            cooldowns: after.cooldowns.clone(),
            held: after.held.clone(),
            skills_used_this_turn: after.skills_used_this_turn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_spend_rejects_without_deducting() {
        let mut ledger = SkillLedger::new(2);
        assert_eq!(
            ledger.spend(3),
            Err(RuleViolation::InsufficientMana { need: 3, have: 2 })
        );
        assert_eq!(ledger.mana(), 2);
    }

    #[test]
    fn test_end_turn_ticks_cooldowns_and_caps_mana() {
        let mut ledger = SkillLedger::new(14);
        ledger.set_cooldown(SkillId::Destroy, 1);
        ledger.set_cooldown(SkillId::Bomb, 3);
        ledger.end_turn(3, 15);
        assert_eq!(ledger.mana(), 15);
        assert_eq!(ledger.cooldown(SkillId::Destroy), 0);
        assert_eq!(ledger.cooldown(SkillId::Bomb), 2);
    }

    #[test]
    fn test_two_skills_buff_activates_next_turn() {
        let mut ledger = SkillLedger::new(10);
        ledger.add_effect(EffectKind::TwoSkillsNextTurn, 1, 1);
        assert_eq!(ledger.use_limit(1), 1);
        ledger.end_turn(0, 15);
        ledger.begin_turn(vec![]);
        assert_eq!(ledger.use_limit(1), 2);
        ledger.end_turn(0, 15);
        assert!(ledger.effects().is_empty());
    }

    #[test]
    fn test_record_use_clears_buff_at_limit() {
        let mut ledger = SkillLedger::new(10);
        ledger.add_effect(EffectKind::TwoSkillsNextTurn, 1, 0);
        ledger.begin_turn(vec![SkillId::Shield, SkillId::Push]);
        ledger.record_use(SkillId::Shield, 1);
        assert_eq!(ledger.use_limit(1), 2);
        ledger.record_use(SkillId::Push, 1);
        assert!(!ledger.has_active(EffectKind::TwoSkillsNextTurn));
        assert_eq!(ledger.skills_used_this_turn(), 2);
    }

    #[test]
    fn test_hold_pays_up_front() {
        let mut ledger = SkillLedger::new(5);
        ledger.begin_turn(vec![SkillId::Destroy, SkillId::Shield]);
        ledger.hold(SkillId::Destroy, 4, 3).unwrap();
        assert_eq!(ledger.mana(), 1);
        assert!(ledger.held().contains(&SkillId::Destroy));
        assert!(!ledger.candidates().contains(&SkillId::Destroy));
        assert_eq!(
            ledger.hold(SkillId::Shield, 2, 3),
            Err(RuleViolation::InsufficientMana { need: 2, have: 1 })
        );
    }

    #[test]
    fn test_draw_keeps_held_and_fills_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let held: BTreeSet<_> = [SkillId::Bomb].into_iter().collect();
        let pool = [SkillId::Bomb, SkillId::Push, SkillId::Shield, SkillId::Reset];
        let drawn = draw_candidates(&mut rng, &pool, &held, 3);
        assert_eq!(drawn.len(), 3);
        assert_eq!(drawn[0], SkillId::Bomb);
        let unique: BTreeSet<_> = drawn.iter().collect();
        assert_eq!(unique.len(), 3);
    }
}
