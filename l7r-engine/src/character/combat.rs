//! Per-trial mutable combat state and the read-only `Fighter` view over it.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{Character, RollKind, Skill};
use crate::constants::{
    FIRST_PHASE, LAST_PHASE, RAISE, TN_BASE, TN_PER_PARRY_RANK, UNSKILLED_ADVANCED_PENALTY,
    WOUND_CHECK_STEP,
};
use crate::dice::RollParams;
use crate::error::InvariantViolation;
use crate::group::{CombatantId, Side};
use crate::modifiers::ModifierList;

pub type ActionDice = SmallVec<[u8; 8]>;

/// Running per-character counters that feed the trial outcome record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatTally {
    pub actions_taken: u32,
    pub attacks_taken: u32,
    pub parries_taken: u32,
    pub damage_rolls: u32,
    pub damage_sum: i64,
    pub damage_sum_squares: i64,
    pub sw_taken: i32,
    pub vp_spent: u32,
    pub vp_spent_attacks: u32,
    pub vp_spent_wound_checks: u32,
}

/// What a void-point spend is paying for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoidUse {
    Attack,
    Parry,
    WoundCheck,
}

/// Fresh combat state for one character in one trial.
#[derive(Debug, Clone)]
pub struct Combatant {
    id: CombatantId,
    side: Side,
    lw: i32,
    sw: i32,
    vp: u32,
    tvp: u32,
    actions: ActionDice,
    modifiers: ModifierList,
    lw_history: Vec<i32>,
    fighting: bool,
    tally: CombatTally,
}

impl Combatant {
    #[must_use]
    pub fn new(id: CombatantId, side: Side, character: &Character) -> Self {
        Self {
            id,
            side,
            lw: 0,
            sw: 0,
            vp: character.max_vp(),
            tvp: 0,
            actions: ActionDice::new(),
            modifiers: ModifierList::default(),
            lw_history: Vec::new(),
            fighting: true,
            tally: CombatTally::default(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> CombatantId {
        self.id
    }

    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub const fn lw(&self) -> i32 {
        self.lw
    }

    #[must_use]
    pub const fn sw(&self) -> i32 {
        self.sw
    }

    #[must_use]
    pub const fn is_fighting(&self) -> bool {
        self.fighting
    }

    #[must_use]
    pub const fn tally(&self) -> &CombatTally {
        &self.tally
    }

    pub const fn tally_mut(&mut self) -> &mut CombatTally {
        &mut self.tally
    }

    #[must_use]
    pub fn actions(&self) -> &[u8] {
        &self.actions
    }

    #[must_use]
    pub const fn modifiers(&self) -> &ModifierList {
        &self.modifiers
    }

    pub const fn modifiers_mut(&mut self) -> &mut ModifierList {
        &mut self.modifiers
    }

    #[must_use]
    pub fn lw_history(&self) -> &[i32] {
        &self.lw_history
    }

    /// Regular plus temporary void points.
    #[must_use]
    pub const fn vp(&self) -> u32 {
        self.vp + self.tvp
    }

    #[must_use]
    pub const fn tvp(&self) -> u32 {
        self.tvp
    }

    /// Replace this round's action dice with a fresh initiative result.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation::ActionDieOutOfRange` for faces outside 1..=10.
    pub fn set_actions(&mut self, dice: ActionDice, name: &str) -> Result<(), InvariantViolation> {
        if let Some(bad) = dice
            .iter()
            .find(|die| !(FIRST_PHASE..=LAST_PHASE).contains(die))
        {
            return Err(InvariantViolation::ActionDieOutOfRange {
                character: name.to_string(),
                value: *bad,
            });
        }
        self.actions = dice;
        self.actions.sort_unstable();
        Ok(())
    }

    pub fn clear_actions(&mut self) {
        self.actions.clear();
    }

    /// Spend the highest die usable in `phase`. Returns the spent value.
    pub fn spend_action(&mut self, phase: u8) -> Option<u8> {
        let index = self.actions.iter().rposition(|die| *die <= phase)?;
        Some(self.actions.remove(index))
    }

    /// Spend `count` of the highest dice regardless of phase (interrupts).
    pub fn spend_interrupt(&mut self, count: usize) -> bool {
        if self.actions.len() < count {
            return false;
        }
        let keep = self.actions.len() - count;
        self.actions.truncate(keep);
        true
    }

    /// Move the highest remaining die to `phase`.
    pub fn advance_highest_action(&mut self, phase: u8) {
        if let Some(last) = self.actions.last_mut() {
            *last = (*last).min(phase);
        }
        self.actions.sort_unstable();
    }

    pub fn gain_tvp(&mut self, amount: u32) {
        self.tvp = self.tvp.saturating_add(amount);
    }

    /// Spend void points, temporary ones first.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation::VoidOverspent` when `amount` exceeds the pool.
    pub fn spend_vp(
        &mut self,
        amount: u32,
        usage: VoidUse,
        name: &str,
    ) -> Result<(), InvariantViolation> {
        if amount > self.vp() {
            return Err(InvariantViolation::VoidOverspent {
                character: name.to_string(),
                requested: amount,
                available: self.vp(),
            });
        }
        let from_temporary = amount.min(self.tvp);
        self.tvp -= from_temporary;
        self.vp -= amount - from_temporary;
        self.tally.vp_spent += amount;
        match usage {
            VoidUse::Attack => self.tally.vp_spent_attacks += amount,
            VoidUse::WoundCheck => self.tally.vp_spent_wound_checks += amount,
            VoidUse::Parry => {}
        }
        Ok(())
    }

    /// Add light wounds from a damage roll.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation::NegativeLightWounds` for a negative total.
    pub fn take_lw(&mut self, damage: i32, name: &str) -> Result<(), InvariantViolation> {
        let total = self.lw + damage;
        if total < 0 {
            return Err(InvariantViolation::NegativeLightWounds {
                character: name.to_string(),
                value: total,
            });
        }
        self.lw = total;
        self.lw_history.push(damage);
        Ok(())
    }

    pub const fn reset_lw(&mut self) {
        self.lw = 0;
    }

    /// Add serious wounds, taking the character out at `max_sw`.
    ///
    /// Returns whether this call took the character out of the fight.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation::DoubleDeath` if the character was already out.
    pub fn take_sw(&mut self, amount: i32, max_sw: i32, name: &str) -> Result<bool, InvariantViolation> {
        if !self.fighting {
            return Err(InvariantViolation::DoubleDeath {
                character: name.to_string(),
            });
        }
        self.sw += amount;
        self.tally.sw_taken += amount;
        if self.sw >= max_sw {
            self.fighting = false;
            self.actions.clear();
            return Ok(true);
        }
        Ok(false)
    }
}

/// Number of serious wounds a wound check roll against `lw` inflicts.
#[must_use]
pub const fn wound_check_sw(roll: i32, lw: i32) -> i32 {
    if roll >= lw {
        0
    } else {
        1 + (lw - roll) / WOUND_CHECK_STEP
    }
}

/// Lowest wound check roll that keeps the serious wounds taken at or below `max_sw`.
#[must_use]
pub const fn wound_check_needed(lw: i32, max_sw: i32) -> i32 {
    if max_sw <= 0 {
        lw
    } else {
        lw - WOUND_CHECK_STEP * max_sw + 1
    }
}

/// Read-only pairing of a character's profile with its combat state.
#[derive(Debug, Clone, Copy)]
pub struct Fighter<'a> {
    pub character: &'a Character,
    pub state: &'a Combatant,
}

impl<'a> Fighter<'a> {
    #[must_use]
    pub const fn new(character: &'a Character, state: &'a Combatant) -> Self {
        Self { character, state }
    }

    #[must_use]
    pub const fn id(&self) -> CombatantId {
        self.state.id()
    }

    #[must_use]
    pub const fn side(&self) -> Side {
        self.state.side()
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        self.character.name()
    }

    #[must_use]
    pub const fn is_fighting(&self) -> bool {
        self.state.is_fighting()
    }

    /// Crippled characters no longer reroll tens on skill rolls.
    #[must_use]
    pub fn crippled(&self) -> bool {
        self.state.sw() >= i32::from(self.character.rings().earth)
    }

    #[must_use]
    pub fn sw_remaining(&self) -> i32 {
        self.character.max_sw() - self.state.sw()
    }

    /// Void points this character may put into a single roll.
    #[must_use]
    pub fn spendable_vp(&self) -> u32 {
        self.character.max_vp_per_roll().min(self.state.vp())
    }

    #[must_use]
    pub fn available_actions(&self, phase: u8) -> usize {
        self.state.actions().iter().filter(|die| **die <= phase).count()
    }

    #[must_use]
    pub fn has_action(&self, phase: u8) -> bool {
        self.available_actions(phase) > 0
    }

    /// TN an attacker must meet to hit this character.
    #[must_use]
    pub fn tn_to_hit(&self) -> i32 {
        TN_BASE
            + TN_PER_PARRY_RANK * i32::from(self.character.skill(Skill::Parry))
            + self.state.modifiers().tn_to_hit()
    }

    /// Pool for a skill roll of `kind` with `vp` void points committed.
    #[must_use]
    pub fn skill_params(&self, kind: RollKind, vp: u32) -> RollParams {
        let vp = i32::try_from(vp).unwrap_or(0);
        let ring = i32::from(self.character.ring(kind.ring()));
        let adjustment = self.state.modifiers().adjustment(kind);
        let mut modifier = RAISE * self.character.free_raises(kind) + adjustment.bonus;
        let mut explode = !self.crippled();
        let rank = match kind.skill() {
            Some(skill) => {
                let rank = i32::from(self.character.skill(skill));
                if rank == 0 {
                    explode = false;
                    if skill.is_advanced() {
                        modifier -= UNSKILLED_ADVANCED_PENALTY;
                    }
                }
                rank
            }
            None => 0,
        };
        RollParams::new(
            ring + rank + self.character.extra_rolled(kind) + vp + adjustment.extra_rolled,
            ring + vp + adjustment.extra_kept,
        )
        .with_modifier(modifier)
        .with_explosion(explode)
    }

    /// Damage pool with `extra_rolled` dice earned by the attack roll.
    #[must_use]
    pub fn damage_params(&self, extra_rolled: i32) -> RollParams {
        let weapon = self.character.weapon();
        let adjustment = self.state.modifiers().adjustment(RollKind::Damage);
        RollParams::new(
            i32::from(self.character.rings().fire)
                + weapon.rolled
                + extra_rolled
                + self.character.extra_rolled(RollKind::Damage)
                + adjustment.extra_rolled,
            weapon.kept + adjustment.extra_kept,
        )
        .with_modifier(RAISE * self.character.free_raises(RollKind::Damage) + adjustment.bonus)
    }

    /// Wound check pool with `vp` void points committed.
    #[must_use]
    pub fn wound_check_params(&self, vp: u32) -> RollParams {
        let vp = i32::try_from(vp).unwrap_or(0);
        let water = i32::from(self.character.rings().water);
        let adjustment = self.state.modifiers().adjustment(RollKind::WoundCheck);
        RollParams::new(
            water
                + 1
                + vp
                + self.character.extra_rolled(RollKind::WoundCheck)
                + adjustment.extra_rolled,
            water + vp + adjustment.extra_kept,
        )
        .with_modifier(RAISE * self.character.free_raises(RollKind::WoundCheck) + adjustment.bonus)
    }

    /// Initiative pool: Void + 1 rolled (plus school dice), Void kept.
    #[must_use]
    pub fn initiative_params(&self) -> RollParams {
        let void = i32::from(self.character.rings().void);
        RollParams::new(void + 1 + self.character.extra_rolled(RollKind::Initiative), void)
            .with_explosion(false)
    }
}
