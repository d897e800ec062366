//! One combat encounter: the phase scheduler and the action resolver.
//!
//! A `Battle` owns the fresh per-trial state of every character and borrows
//! the shared, read-only parts of the run (roster, odds table, school hooks).
//! Randomness is threaded through every call as an explicit `DieSource`.

mod resolver;
mod scheduler;

use serde::{Deserialize, Serialize};

use crate::character::{Combatant, Fighter};
use crate::constants::{DEFAULT_INTERRUPT_COST, DEFAULT_MAX_ROUNDS, FIRST_PHASE};
use crate::error::InvariantViolation;
use crate::group::{CombatantId, Roster, Side};
use crate::odds::RollOdds;
use crate::schools::{HookEffect, HookEvent, SchoolHooks};
use crate::strategy::DecisionContext;

/// Per-combat limits shared by every trial of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRules {
    /// Rounds fought before the combat is called a tie.
    pub max_rounds: u32,
    /// Action dice spent to parry outside one's own phase.
    pub interrupt_cost: usize,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            interrupt_cost: DEFAULT_INTERRUPT_COST,
        }
    }
}

/// How a combat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatEnd {
    Victory(Side),
    /// Round cap reached, or nobody left standing.
    Tie,
}

impl CombatEnd {
    #[must_use]
    pub const fn winner(self) -> Option<Side> {
        match self {
            Self::Victory(side) => Some(side),
            Self::Tie => None,
        }
    }
}

#[derive(Debug)]
pub struct Battle<'r> {
    roster: &'r Roster,
    odds: &'r RollOdds,
    hooks: &'r SchoolHooks,
    rules: CombatRules,
    combatants: Vec<Combatant>,
    /// Side that wins initiative ties this trial.
    precedence: Side,
    round: u32,
    phase: u8,
    phases_elapsed: u32,
}

impl<'r> Battle<'r> {
    #[must_use]
    pub fn new(
        roster: &'r Roster,
        odds: &'r RollOdds,
        hooks: &'r SchoolHooks,
        rules: CombatRules,
        precedence: Side,
    ) -> Self {
        let combatants = roster
            .ids()
            .map(|id| Combatant::new(id, roster.side(id), roster.character(id)))
            .collect();
        Self {
            roster,
            odds,
            hooks,
            rules,
            combatants,
            precedence,
            round: 0,
            phase: FIRST_PHASE,
            phases_elapsed: 0,
        }
    }

    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub const fn phases_elapsed(&self) -> u32 {
        self.phases_elapsed
    }

    #[must_use]
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    #[must_use]
    pub const fn roster(&self) -> &'r Roster {
        self.roster
    }

    #[must_use]
    pub fn fighter(&self, id: CombatantId) -> Fighter<'_> {
        Fighter::new(self.roster.character(id), &self.combatants[id.0])
    }

    /// Living characters on `side`, in declaration order.
    pub fn living(&self, side: Side) -> impl Iterator<Item = Fighter<'_>> + '_ {
        self.roster
            .ids()
            .map(|id| self.fighter(id))
            .filter(move |fighter| fighter.side() == side && fighter.is_fighting())
    }

    /// Terminal check: `None` while both sides still have someone standing.
    #[must_use]
    pub fn terminal(&self) -> Option<CombatEnd> {
        let control = self.living(Side::Control).next().is_some();
        let test = self.living(Side::Test).next().is_some();
        match (control, test) {
            (true, true) => None,
            (true, false) => Some(CombatEnd::Victory(Side::Control)),
            (false, true) => Some(CombatEnd::Victory(Side::Test)),
            (false, false) => Some(CombatEnd::Tie),
        }
    }

    fn context(&self, id: CombatantId) -> DecisionContext<'_> {
        let me = self.fighter(id);
        DecisionContext {
            me,
            allies: self
                .living(me.side())
                .filter(|ally| ally.id() != id)
                .collect(),
            enemies: self.living(me.side().opponent()).collect(),
            phase: self.phase,
            interrupt_cost: self.rules.interrupt_cost,
            odds: self.odds,
        }
    }

    fn state_mut(&mut self, id: CombatantId) -> &mut Combatant {
        &mut self.combatants[id.0]
    }

    fn name(&self, id: CombatantId) -> &'r str {
        self.roster.character(id).name()
    }

    /// Fire `owner`'s school hooks for `event` and apply what they return.
    fn fire_hooks(&mut self, owner: CombatantId, event: &HookEvent) {
        let effects = self.hooks.fire(self.roster.character(owner), event);
        for effect in effects {
            log::trace!("{} hook effect {effect:?}", self.name(owner));
            let state = self.state_mut(owner);
            match effect {
                HookEffect::GainTemporaryVoid(amount) => state.gain_tvp(amount),
                HookEffect::AddModifier(modifier) => state.modifiers_mut().add(modifier),
            }
        }
    }

    fn ensure_fighting(&self, id: CombatantId) -> Result<(), InvariantViolation> {
        if self.combatants[id.0].is_fighting() {
            Ok(())
        } else {
            Err(InvariantViolation::ActedWhileDown {
                character: self.name(id).to_string(),
            })
        }
    }
}
