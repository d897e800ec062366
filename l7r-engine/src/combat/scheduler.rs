use std::cmp::Reverse;
use std::collections::BTreeSet;

use log::debug;

use super::{Battle, CombatEnd};
use crate::constants::{FIRST_PHASE, LAST_PHASE};
use crate::dice::roll_initiative;
use crate::error::InvariantViolation;
use crate::group::CombatantId;
use crate::modifiers::Expiry;
use crate::rng::DieSource;

impl Battle<'_> {
    /// Fight rounds until one side is down or the round cap is reached.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the resolver detects an engine bug.
    pub fn fight(&mut self, source: &mut impl DieSource) -> Result<CombatEnd, InvariantViolation> {
        while self.round < self.rules.max_rounds {
            if let Some(end) = self.terminal() {
                return Ok(end);
            }
            self.round += 1;
            self.run_round(source)?;
        }
        Ok(self.terminal().unwrap_or(CombatEnd::Tie))
    }

    /// Initiative, phases 1 through 10, then the end-of-round sweep.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the resolver detects an engine bug.
    pub fn run_round(&mut self, source: &mut impl DieSource) -> Result<(), InvariantViolation> {
        debug!("round {} begins", self.round);
        self.roll_initiative(source)?;
        for phase in FIRST_PHASE..=LAST_PHASE {
            self.phase = phase;
            self.phases_elapsed += 1;
            self.run_phase(source)?;
            if self.terminal().is_some() {
                break;
            }
        }
        for combatant in &mut self.combatants {
            combatant.clear_actions();
            combatant.modifiers_mut().sweep(Expiry::EndOfRound);
        }
        debug!("round {} ends", self.round);
        Ok(())
    }

    fn roll_initiative(&mut self, source: &mut impl DieSource) -> Result<(), InvariantViolation> {
        for id in self.roster.ids() {
            if !self.combatants[id.0].is_fighting() {
                continue;
            }
            let params = self.fighter(id).initiative_params();
            let dice = roll_initiative(params.rolled, params.kept, source);
            debug!("{} initiative {dice:?}", self.name(id));
            let name = self.name(id);
            self.state_mut(id).set_actions(dice, name)?;
        }
        Ok(())
    }

    /// Let characters act in precedence order until everyone with a usable
    /// die has acted or chosen to hold.
    fn run_phase(&mut self, source: &mut impl DieSource) -> Result<(), InvariantViolation> {
        let mut holding = BTreeSet::new();
        while let Some(actor) = self.next_actor(&holding) {
            let wants_to_act = {
                let ctx = self.context(actor);
                match self.roster.character(actor).strategies().action.decide(&ctx) {
                    Ok(decision) => decision,
                    Err(err) => {
                        log::warn!("{err}; holding");
                        false
                    }
                }
            };
            if !wants_to_act || !self.take_action(actor, source)? {
                holding.insert(actor);
            }
            if self.terminal().is_some() {
                break;
            }
        }
        Ok(())
    }

    /// Living character with a usable die who has not held this phase.
    ///
    /// Lowest remaining die first, then higher Void, then this trial's side
    /// precedence, then declaration order.
    fn next_actor(&self, holding: &BTreeSet<CombatantId>) -> Option<CombatantId> {
        self.roster
            .ids()
            .filter(|id| !holding.contains(id))
            .map(|id| self.fighter(id))
            .filter(|fighter| fighter.is_fighting() && fighter.has_action(self.phase))
            .min_by_key(|fighter| {
                (
                    fighter.state.actions().first().copied(),
                    Reverse(fighter.character.rings().void),
                    fighter.side() != self.precedence,
                    fighter.id(),
                )
            })
            .map(|fighter| fighter.id())
    }
}
