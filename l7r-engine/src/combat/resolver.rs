use log::{debug, warn};

use super::Battle;
use crate::character::combat::{VoidUse, wound_check_sw};
use crate::character::RollKind;
use crate::constants::{
    DICE_PER_FAILED_PARRY, DOUBLE_ATTACK_DIRECT_SW, DOUBLE_ATTACK_TN_OFFSET,
    FEINT_TEMPORARY_VOID, LUNGE_EXTRA_DAMAGE_DICE, LUNGE_TN_PENALTY, MAX_COUNTED_FAILED_PARRIES,
    PARRY_FOR_ALLY_PENALTY, RAISE, WOUND_CHECK_THRESHOLD,
};
use crate::dice::{RollParams, roll_with};
use crate::error::{InvariantViolation, StrategyError};
use crate::group::CombatantId;
use crate::modifiers::{Expiry, Modifier, ModifierEffect, ModifierScope};
use crate::rng::DieSource;
use crate::schools::HookEvent;
use crate::strategy::{AttackForm, AttackPlan, IncomingAttack};

impl Battle<'_> {
    /// Resolve one action for `actor` in the current phase.
    ///
    /// Returns `false` when the actor ends up doing nothing, either by choice
    /// or because its attack strategy failed; no die is spent in that case.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` on any engine-state inconsistency.
    pub fn take_action(
        &mut self,
        actor: CombatantId,
        source: &mut impl DieSource,
    ) -> Result<bool, InvariantViolation> {
        self.ensure_fighting(actor)?;
        let plan = match self.choose_attack(actor) {
            Ok(Some(plan)) => plan,
            Ok(None) => return Ok(false),
            Err(err) => {
                warn!("{err}; no action");
                return Ok(false);
            }
        };
        let name = self.name(actor);
        let phase = self.phase;
        let Some(die) = self.state_mut(actor).spend_action(phase) else {
            warn!(
                "{}; no action",
                StrategyError::NoActionDice {
                    actor: name.to_string()
                }
            );
            return Ok(false);
        };
        let tally = self.state_mut(actor).tally_mut();
        tally.actions_taken += 1;
        tally.attacks_taken += 1;
        debug!(
            "phase {phase}: {name} spends die {die} on a {} at {} ({} VP)",
            plan.form,
            self.name(plan.target),
            plan.vp
        );
        self.resolve_attack(actor, plan, source)?;
        Ok(true)
    }

    /// Ask the attack strategy and reject plans the resolver cannot carry out.
    fn choose_attack(&self, actor: CombatantId) -> Result<Option<AttackPlan>, StrategyError> {
        let ctx = self.context(actor);
        if ctx.enemies.is_empty() {
            return Ok(None);
        }
        let strategies = self.roster.character(actor).strategies();
        let Some(plan) = strategies.attack.decide(&ctx, &ctx.enemies)? else {
            return Ok(None);
        };
        let me = ctx.me;
        let actor_name = me.name().to_string();
        if !ctx.enemies.iter().any(|enemy| enemy.id() == plan.target) {
            return Err(StrategyError::InvalidTarget {
                actor: actor_name,
                target: plan.target.0,
            });
        }
        if plan.form.knack().is_some_and(|skill| me.character.skill(skill) == 0) {
            return Err(StrategyError::UnusableForm {
                actor: actor_name,
                form: plan.form.label(),
            });
        }
        if plan.vp > me.spendable_vp() {
            return Err(StrategyError::VoidOverspend {
                actor: actor_name,
                requested: plan.vp,
                available: me.spendable_vp(),
            });
        }
        Ok(Some(plan))
    }

    fn resolve_attack(
        &mut self,
        attacker: CombatantId,
        plan: AttackPlan,
        source: &mut impl DieSource,
    ) -> Result<(), InvariantViolation> {
        let kind = plan.form.roll_kind();
        let name = self.name(attacker);
        if plan.vp > 0 {
            self.state_mut(attacker)
                .spend_vp(plan.vp, VoidUse::Attack, name)?;
        }
        self.fire_hooks(attacker, &HookEvent::PreRoll { kind, vp: plan.vp });
        if plan.form == AttackForm::Lunge {
            self.state_mut(attacker).modifiers_mut().add(Modifier::new(
                ModifierScope::TnToHit,
                ModifierEffect::Flat(-LUNGE_TN_PENALTY),
                Expiry::EndOfRound,
                "lunge",
            ));
        }

        let mut tn = self.fighter(plan.target).tn_to_hit();
        if plan.form == AttackForm::Double {
            tn += DOUBLE_ATTACK_TN_OFFSET;
        }
        let roll = roll_with(self.fighter(attacker).skill_params(kind, plan.vp), source);
        self.state_mut(attacker).modifiers_mut().consume_roll(kind);
        self.fire_hooks(attacker, &HookEvent::PostRoll {
            kind,
            total: roll.total,
            tn,
        });
        let hit = roll.total >= tn;
        debug!(
            "{name} rolls {} for {} against TN {tn}: {}",
            roll.total,
            plan.form,
            if hit { "hit" } else { "miss" }
        );

        if plan.form == AttackForm::Feint {
            if hit {
                let phase = self.phase;
                let state = self.state_mut(attacker);
                state.gain_tvp(FEINT_TEMPORARY_VOID);
                state.advance_highest_action(phase);
            }
            self.discard_damage_bonuses(attacker);
            return Ok(());
        }
        if !hit {
            self.discard_damage_bonuses(attacker);
            return Ok(());
        }

        let raises = ((roll.total - tn) / RAISE).max(0);
        let mut incoming = IncomingAttack {
            attacker,
            target: plan.target,
            form: plan.form,
            total: roll.total,
            tn,
            damage: self.fighter(attacker).damage_params(raises),
            parry_attempts: 0,
            declined: Vec::new(),
        };
        let (parried, failed) = self.parries(&mut incoming, source);
        if parried {
            debug!("{} parries {name}", self.name(plan.target));
            self.discard_damage_bonuses(attacker);
            return Ok(());
        }

        let mut extra_dice = match plan.form {
            _ if incoming.parry_attempts == 0 => raises,
            AttackForm::Double => DICE_PER_FAILED_PARRY * failed.min(MAX_COUNTED_FAILED_PARRIES),
            AttackForm::Plain | AttackForm::Feint | AttackForm::Lunge => 0,
        };
        if plan.form == AttackForm::Lunge {
            extra_dice += LUNGE_EXTRA_DAMAGE_DICE;
        }
        if plan.form == AttackForm::Double {
            let target_name = self.name(plan.target);
            let max_sw = self.roster.character(plan.target).max_sw();
            let died = self.state_mut(plan.target).take_sw(
                DOUBLE_ATTACK_DIRECT_SW,
                max_sw,
                target_name,
            )?;
            if died {
                debug!("{target_name} falls to {name}'s double attack");
                self.discard_damage_bonuses(attacker);
                return Ok(());
            }
        }
        self.deal_damage(attacker, plan.target, extra_dice, source)
    }

    /// Offer the parry to the target, then to the target's allies in
    /// declaration order. Returns whether it was parried and how many
    /// parries failed.
    fn parries(
        &mut self,
        incoming: &mut IncomingAttack,
        source: &mut impl DieSource,
    ) -> (bool, i32) {
        let side = self.roster.side(incoming.target);
        let mut order = vec![incoming.target];
        order.extend(
            self.living(side)
                .map(|fighter| fighter.id())
                .filter(|id| *id != incoming.target),
        );
        let mut failed = 0;
        for defender in order {
            if !self.combatants[defender.0].is_fighting() {
                continue;
            }
            let wants_to_parry = {
                let ctx = self.context(defender);
                if !ctx.can_react(&ctx.me) {
                    continue;
                }
                let strategies = self.roster.character(defender).strategies();
                strategies.parry.decide(&ctx, incoming).unwrap_or_else(|err| {
                    warn!("{err}; no parry");
                    false
                })
            };
            if !wants_to_parry {
                incoming.declined.push(defender);
                continue;
            }
            if !self.pay_for_parry(defender) {
                continue;
            }
            let total = self.roll_parry(defender, incoming, source);
            incoming.parry_attempts += 1;
            if total >= incoming.total {
                return (true, failed);
            }
            debug!(
                "{} fails to parry ({total} against {})",
                self.name(defender),
                incoming.total
            );
            failed += 1;
        }
        (false, failed)
    }

    /// Spend a die usable this phase, or interrupt with the highest dice.
    fn pay_for_parry(&mut self, defender: CombatantId) -> bool {
        let phase = self.phase;
        let cost = self.rules.interrupt_cost;
        let state = self.state_mut(defender);
        let paid = state.spend_action(phase).is_some() || state.spend_interrupt(cost);
        if paid {
            let tally = state.tally_mut();
            tally.actions_taken += 1;
            tally.parries_taken += 1;
        }
        paid
    }

    fn roll_parry(
        &mut self,
        defender: CombatantId,
        incoming: &IncomingAttack,
        source: &mut impl DieSource,
    ) -> i32 {
        self.fire_hooks(defender, &HookEvent::PreRoll {
            kind: RollKind::Parry,
            vp: 0,
        });
        let mut params = self.fighter(defender).skill_params(RollKind::Parry, 0);
        if defender != incoming.target {
            params = params.with_modifier(params.modifier - PARRY_FOR_ALLY_PENALTY);
        }
        let roll = roll_with(params, source);
        self.state_mut(defender)
            .modifiers_mut()
            .consume_roll(RollKind::Parry);
        self.fire_hooks(defender, &HookEvent::PostRoll {
            kind: RollKind::Parry,
            total: roll.total,
            tn: incoming.total,
        });
        roll.total
    }

    fn deal_damage(
        &mut self,
        attacker: CombatantId,
        target: CombatantId,
        extra_dice: i32,
        source: &mut impl DieSource,
    ) -> Result<(), InvariantViolation> {
        let params: RollParams = self.fighter(attacker).damage_params(extra_dice);
        let damage = roll_with(params, source).total.max(0);
        let attacker_state = self.state_mut(attacker);
        attacker_state
            .modifiers_mut()
            .consume_roll(RollKind::Damage);
        let tally = attacker_state.tally_mut();
        tally.damage_rolls += 1;
        tally.damage_sum += i64::from(damage);
        tally.damage_sum_squares += i64::from(damage) * i64::from(damage);

        let target_name = self.name(target);
        self.state_mut(target).take_lw(damage, target_name)?;
        let lw = self.combatants[target.0].lw();
        debug!("{} deals {damage} ({params}) to {target_name}, now {lw} LW", self.name(attacker));
        self.fire_hooks(target, &HookEvent::PostDamage { damage, lw });

        if lw > WOUND_CHECK_THRESHOLD {
            self.wound_check(target, source)?;
        }
        Ok(())
    }

    /// Roll a wound check against current light wounds and apply the result.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` on any engine-state inconsistency.
    pub fn wound_check(
        &mut self,
        id: CombatantId,
        source: &mut impl DieSource,
    ) -> Result<(), InvariantViolation> {
        let name = self.name(id);
        let vp = self.choose_wound_check_vp(id);
        if vp > 0 {
            self.state_mut(id).spend_vp(vp, VoidUse::WoundCheck, name)?;
        }
        self.fire_hooks(id, &HookEvent::PreRoll {
            kind: RollKind::WoundCheck,
            vp,
        });
        let lw = self.combatants[id.0].lw();
        let roll = roll_with(self.fighter(id).wound_check_params(vp), source).total;
        self.state_mut(id)
            .modifiers_mut()
            .consume_roll(RollKind::WoundCheck);
        self.fire_hooks(id, &HookEvent::PostWoundCheck { roll, lw });

        let max_sw = self.roster.character(id).max_sw();
        if roll >= lw {
            let keep = {
                let ctx = self.context(id);
                self.roster
                    .character(id)
                    .strategies()
                    .light_wounds
                    .decide(&ctx)
                    .unwrap_or_else(|err| {
                        warn!("{err}; keeping light wounds");
                        true
                    })
            };
            debug!(
                "{name} passes a wound check ({roll} against {lw}) and {}",
                if keep { "keeps the light wounds" } else { "takes a serious wound" }
            );
            if !keep {
                let state = self.state_mut(id);
                state.reset_lw();
                state.take_sw(1, max_sw, name)?;
            }
        } else {
            let serious = wound_check_sw(roll, lw);
            debug!("{name} fails a wound check ({roll} against {lw}): {serious} SW");
            let state = self.state_mut(id);
            state.reset_lw();
            if state.take_sw(serious, max_sw, name)? {
                debug!("{name} is out of the fight");
            }
        }
        Ok(())
    }

    fn choose_wound_check_vp(&self, id: CombatantId) -> u32 {
        let ctx = self.context(id);
        let strategies = self.roster.character(id).strategies();
        let available = ctx.me.spendable_vp();
        match strategies.wound_check.decide(&ctx) {
            Ok(vp) if vp <= available => vp,
            Ok(vp) => {
                let err = StrategyError::VoidOverspend {
                    actor: ctx.me.name().to_string(),
                    requested: vp,
                    available,
                };
                warn!("{err}; spending 0");
                0
            }
            Err(err) => {
                warn!("{err}; spending 0");
                0
            }
        }
    }

    /// Damage-roll bonuses committed to an attack that dealt no damage.
    fn discard_damage_bonuses(&mut self, attacker: CombatantId) {
        self.state_mut(attacker)
            .modifiers_mut()
            .consume_roll(RollKind::Damage);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::{duelist, roster};
    use super::super::{Battle, CombatRules};
    use super::*;
    use crate::character::{ActionDice, CharacterBuild, Skill};
    use crate::modifiers::{Expiry, Modifier, ModifierEffect, ModifierScope};
    use crate::group::{Roster, Side};
    use crate::odds::RollOdds;
    use crate::rng::ScriptedDice;
    use crate::schools::SchoolHooks;
    use crate::strategy::{
        AttackStrategy, DecisionContext, LightWoundsPolicy, ParryPolicy, StrategyBindings,
        StrategySet, WoundCheckPolicy,
    };

    #[derive(Debug)]
    struct FixedPlan(AttackPlan);

    impl AttackStrategy for FixedPlan {
        fn decide(
            &self,
            _ctx: &DecisionContext<'_>,
            _candidates: &[crate::character::Fighter<'_>],
        ) -> Result<Option<AttackPlan>, StrategyError> {
            Ok(Some(self.0))
        }
    }

    fn fixed(target: usize, form: AttackForm, vp: u32) -> StrategySet {
        StrategySet::default().with_attack(Arc::new(FixedPlan(AttackPlan {
            target: CombatantId(target),
            form,
            vp,
        })))
    }

    fn stingy(build: CharacterBuild, parry: ParryPolicy) -> CharacterBuild {
        build.with_strategies(StrategyBindings {
            parry,
            wound_check: WoundCheckPolicy::Stingy,
            ..StrategyBindings::default()
        })
    }

    fn arm(battle: &mut Battle<'_>, id: usize, dice: &[u8]) {
        battle.combatants[id]
            .set_actions(ActionDice::from_slice(dice), "test")
            .expect("dice");
    }

    #[test]
    fn failed_wound_check_by_23_costs_three_serious_wounds() {
        let roster = roster(
            vec![stingy(duelist("Kenji", 3, 3, 2), ParryPolicy::Reluctant)],
            vec![duelist("Aiko", 3, 3, 2)],
        );
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        let kenji = &mut battle.combatants[0];
        kenji.take_lw(12, "Kenji").expect("damage");
        kenji.modifiers_mut().add(Modifier::new(
            ModifierScope::Roll(RollKind::WoundCheck),
            ModifierEffect::Flat(-14),
            Expiry::EndOfRoll,
            "test",
        ));
        // 4k3 of ones is 3, minus 14 is -11: the check misses 12 by 23.
        let mut dice = ScriptedDice::constant(1);
        battle.wound_check(CombatantId(0), &mut dice).expect("check");
        assert_eq!(dice.draws(), 4);
        assert_eq!(battle.combatants[0].sw(), 3);
        assert_eq!(battle.combatants[0].lw(), 0);
        assert!(battle.combatants[0].modifiers().is_empty());
    }

    #[test]
    fn invalid_plans_become_no_action() {
        let mut roster = roster(vec![duelist("Kenji", 3, 3, 2)], vec![duelist("Aiko", 3, 3, 2)]);
        roster.set_strategies(CombatantId(0), fixed(0, AttackForm::Plain, 0));
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 0, &[1, 2]);
        battle.phase = 2;
        let mut dice = ScriptedDice::constant(5);
        assert_eq!(battle.take_action(CombatantId(0), &mut dice), Ok(false));
        assert_eq!(battle.combatants[0].actions(), &[1, 2]);
        assert_eq!(dice.draws(), 0);
    }

    #[test]
    fn untrained_knacks_and_overspends_are_rejected() {
        let mut roster = roster(vec![duelist("Kenji", 3, 3, 2)], vec![duelist("Aiko", 3, 3, 2)]);
        roster.set_strategies(CombatantId(0), fixed(1, AttackForm::Double, 0));
        roster.set_strategies(CombatantId(1), fixed(0, AttackForm::Plain, 9));
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 0, &[1]);
        arm(&mut battle, 1, &[1]);
        battle.phase = 1;
        let mut dice = ScriptedDice::constant(5);
        assert_eq!(battle.take_action(CombatantId(0), &mut dice), Ok(false));
        assert_eq!(battle.take_action(CombatantId(1), &mut dice), Ok(false));
        assert_eq!(battle.combatants[1].vp(), 3);
    }

    #[test]
    fn dead_characters_cannot_act() {
        let roster = roster(vec![duelist("Kenji", 3, 3, 2)], vec![duelist("Aiko", 3, 3, 2)]);
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        battle.combatants[1].take_sw(6, 6, "Aiko").expect("alive");
        let mut dice = ScriptedDice::constant(5);
        assert!(matches!(
            battle.take_action(CombatantId(1), &mut dice),
            Err(InvariantViolation::ActedWhileDown { .. })
        ));
        assert!(battle.terminal().is_some());
    }

    #[test]
    fn successful_feint_grants_void_and_pulls_a_die_forward() {
        let attacker = duelist("Aiko", 3, 3, 2).with_skill(Skill::Feint, 2);
        let mut roster = roster(vec![stingy(duelist("Kenji", 3, 3, 0), ParryPolicy::Never)], vec![
            attacker,
        ]);
        roster.set_strategies(CombatantId(1), fixed(0, AttackForm::Feint, 0));
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 1, &[2, 5, 9]);
        battle.phase = 3;
        let mut dice = ScriptedDice::constant(5);
        assert_eq!(battle.take_action(CombatantId(1), &mut dice), Ok(true));
        let aiko = &battle.combatants[1];
        assert_eq!(aiko.actions(), &[3, 5]);
        assert_eq!(aiko.tvp(), 1);
        assert_eq!(battle.combatants[0].lw(), 0);
    }

    #[test]
    fn akodo_feints_bank_four_void() {
        let attacker = duelist("Aiko", 3, 3, 2)
            .with_skill(Skill::Feint, 2)
            .with_school(crate::schools::SchoolId::AkodoBushi, 1);
        let mut roster = roster(vec![stingy(duelist("Kenji", 3, 3, 0), ParryPolicy::Never)], vec![
            attacker,
        ]);
        roster.set_strategies(CombatantId(1), fixed(0, AttackForm::Feint, 0));
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 1, &[2]);
        battle.phase = 3;
        let mut dice = ScriptedDice::constant(5);
        assert_eq!(battle.take_action(CombatantId(1), &mut dice), Ok(true));
        assert_eq!(battle.combatants[1].tvp(), 4);
    }

    #[test]
    fn unparried_plain_attack_adds_raises_to_damage() {
        let mut roster = roster(vec![stingy(duelist("Kenji", 3, 3, 0), ParryPolicy::Never)], vec![
            duelist("Aiko", 3, 3, 2),
        ]);
        roster.set_strategies(CombatantId(1), fixed(0, AttackForm::Plain, 0));
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 1, &[1]);
        battle.phase = 1;
        // Attack 6k3 of 5s = 15 against TN 5: two raises, damage 9k2 of 5s = 10.
        // Wound check 4k3 of 5s = 15 passes against 10 LW.
        let mut dice = ScriptedDice::constant(5);
        assert_eq!(battle.take_action(CombatantId(1), &mut dice), Ok(true));
        assert_eq!(dice.draws(), 6 + 9 + 4);
        let kenji = &battle.combatants[0];
        assert_eq!(kenji.lw(), 10);
        assert_eq!(kenji.sw(), 0);
        let tally = battle.combatants[1].tally();
        assert_eq!((tally.attacks_taken, tally.damage_rolls, tally.damage_sum), (1, 1, 10));
    }

    fn double_attacker() -> CharacterBuild {
        duelist("Aiko", 3, 3, 2).with_skill(Skill::DoubleAttack, 2)
    }

    fn passive(name: &str, parry: ParryPolicy) -> CharacterBuild {
        duelist(name, 3, 3, 0).with_strategies(StrategyBindings {
            parry,
            light_wounds: LightWoundsPolicy::AlwaysKeep,
            wound_check: WoundCheckPolicy::Stingy,
            ..StrategyBindings::default()
        })
    }

    // Double attack 5k3 of [9, 9, 9, 1, 1] is 27 against TN 25: a hit with no raises.
    const DOUBLE_HIT: [u32; 5] = [9, 9, 9, 1, 1];

    #[test]
    fn two_failed_parries_add_four_damage_dice() {
        let mut roster = roster(
            vec![passive("Kenji", ParryPolicy::Always), passive("Hiro", ParryPolicy::Always)],
            vec![double_attacker()],
        );
        roster.set_strategies(CombatantId(2), fixed(0, AttackForm::Double, 0));
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 0, &[1]);
        arm(&mut battle, 1, &[1]);
        arm(&mut battle, 2, &[1]);
        battle.phase = 1;
        // Both parries roll 3k3 of ones. Damage is 3 + 4 + 4 = 11k2, normalized to 10k3.
        let mut dice = ScriptedDice::new(&DOUBLE_HIT, 1);
        assert_eq!(battle.take_action(CombatantId(2), &mut dice), Ok(true));
        assert_eq!(dice.draws(), 5 + 3 + 3 + 10 + 4);
        let kenji = &battle.combatants[0];
        assert_eq!(kenji.sw(), 1);
        assert_eq!(kenji.lw(), 3);
        assert_eq!(kenji.tally().parries_taken, 1);
        assert_eq!(battle.combatants[1].tally().parries_taken, 1);
        assert_eq!(battle.combatants[2].tally().damage_sum, 3);
    }

    #[test]
    fn one_failed_parry_adds_two_damage_dice() {
        let mut roster = roster(
            vec![passive("Kenji", ParryPolicy::Always), passive("Hiro", ParryPolicy::Never)],
            vec![double_attacker()],
        );
        roster.set_strategies(CombatantId(2), fixed(0, AttackForm::Double, 0));
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 0, &[1]);
        arm(&mut battle, 1, &[1]);
        arm(&mut battle, 2, &[1]);
        battle.phase = 1;
        let mut dice = ScriptedDice::new(&DOUBLE_HIT, 1);
        assert_eq!(battle.take_action(CombatantId(2), &mut dice), Ok(true));
        assert_eq!(dice.draws(), 5 + 3 + 9 + 4);
        assert_eq!(battle.combatants[0].sw(), 1);
        assert_eq!(battle.combatants[0].lw(), 2);
        assert_eq!(battle.combatants[1].actions(), &[1]);
    }

    #[test]
    fn double_attack_direct_wound_can_finish_the_target() {
        let mut roster = roster(vec![passive("Kenji", ParryPolicy::Never)], vec![double_attacker()]);
        roster.set_strategies(CombatantId(1), fixed(0, AttackForm::Double, 0));
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        battle.combatants[0].take_sw(5, 6, "Kenji").expect("alive");
        arm(&mut battle, 1, &[1]);
        battle.phase = 1;
        let mut dice = ScriptedDice::new(&DOUBLE_HIT, 1);
        assert_eq!(battle.take_action(CombatantId(1), &mut dice), Ok(true));
        assert_eq!(dice.draws(), 5);
        assert!(!battle.combatants[0].is_fighting());
        assert_eq!(battle.combatants[1].tally().damage_rolls, 0);
        assert_eq!(battle.terminal(), Some(super::super::CombatEnd::Victory(Side::Test)));
    }

    fn defender(name: &str, parry: ParryPolicy) -> CharacterBuild {
        duelist(name, 3, 3, 2).with_strategies(StrategyBindings {
            parry,
            light_wounds: LightWoundsPolicy::AlwaysKeep,
            wound_check: WoundCheckPolicy::Stingy,
            ..StrategyBindings::default()
        })
    }

    // Attack 6k3 of [9, 9, 9, 1, 1, 1] is 27, then parry 5k3 of [9, 9, 9, 1, 1]
    // is 27: an exact match.
    const PARRY_CLASH: [u32; 11] = [9, 9, 9, 1, 1, 1, 9, 9, 9, 1, 1];

    fn plain_attack_on_kenji(control: Vec<CharacterBuild>) -> Roster {
        let mut roster = roster(control, vec![duelist("Aiko", 3, 3, 2)]);
        let aiko = CombatantId(roster.ids().count() - 1);
        roster.set_strategies(aiko, fixed(0, AttackForm::Plain, 0));
        roster
    }

    #[test]
    fn matching_parry_negates_the_hit() {
        let roster = plain_attack_on_kenji(vec![defender("Kenji", ParryPolicy::Always)]);
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 0, &[1]);
        arm(&mut battle, 1, &[1]);
        battle.phase = 1;
        let mut dice = ScriptedDice::new(&PARRY_CLASH, 1);
        assert_eq!(battle.take_action(CombatantId(1), &mut dice), Ok(true));
        assert_eq!(dice.draws(), 6 + 5);
        let kenji = &battle.combatants[0];
        assert_eq!(kenji.lw(), 0);
        assert!(kenji.actions().is_empty());
        assert_eq!(kenji.tally().parries_taken, 1);
        assert_eq!(battle.combatants[1].tally().damage_rolls, 0);
    }

    #[test]
    fn interrupt_parry_spends_the_two_highest_dice() {
        let roster = plain_attack_on_kenji(vec![defender("Kenji", ParryPolicy::Always)]);
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 0, &[6, 8, 9]);
        arm(&mut battle, 1, &[2]);
        battle.phase = 2;
        let mut dice = ScriptedDice::new(&PARRY_CLASH, 1);
        assert_eq!(battle.take_action(CombatantId(1), &mut dice), Ok(true));
        assert_eq!(dice.draws(), 6 + 5);
        let kenji = &battle.combatants[0];
        assert_eq!(kenji.actions(), &[6]);
        assert_eq!(kenji.lw(), 0);
        assert_eq!(kenji.tally().parries_taken, 1);
    }

    #[test]
    fn a_single_late_die_cannot_interrupt() {
        let roster = plain_attack_on_kenji(vec![defender("Kenji", ParryPolicy::Always)]);
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 0, &[9]);
        arm(&mut battle, 1, &[2]);
        battle.phase = 2;
        // No parry: damage 7k2 of ones is 2, wound check 4k3 of ones passes.
        let mut dice = ScriptedDice::new(&PARRY_CLASH[..6], 1);
        assert_eq!(battle.take_action(CombatantId(1), &mut dice), Ok(true));
        assert_eq!(dice.draws(), 6 + 7 + 4);
        let kenji = &battle.combatants[0];
        assert_eq!(kenji.actions(), &[9]);
        assert_eq!(kenji.lw(), 2);
        assert_eq!(kenji.tally().parries_taken, 0);
    }

    #[test]
    fn parrying_for_an_ally_takes_ten_off_the_roll() {
        let roster = plain_attack_on_kenji(vec![
            passive("Kenji", ParryPolicy::Never),
            defender("Hiro", ParryPolicy::Always),
        ]);
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 0, &[1]);
        arm(&mut battle, 1, &[1]);
        arm(&mut battle, 2, &[1]);
        battle.phase = 1;
        // Hiro's 27 would match the attack; less 10 it fails. The failed parry
        // cancels the raises, so damage is 7k2 of ones.
        let mut dice = ScriptedDice::new(&PARRY_CLASH, 1);
        assert_eq!(battle.take_action(CombatantId(2), &mut dice), Ok(true));
        assert_eq!(dice.draws(), 6 + 5 + 7 + 4);
        assert_eq!(battle.combatants[1].tally().parries_taken, 1);
        assert!(battle.combatants[1].actions().is_empty());
        assert_eq!(battle.combatants[0].tally().parries_taken, 0);
        assert_eq!(battle.combatants[0].lw(), 2);
    }

    #[test]
    fn lunge_adds_a_damage_die_and_lowers_the_lungers_tn() {
        let lunger = duelist("Aiko", 3, 3, 2).with_skill(Skill::Lunge, 2);
        let mut roster = roster(vec![passive("Kenji", ParryPolicy::Never)], vec![lunger]);
        roster.set_strategies(CombatantId(1), fixed(0, AttackForm::Lunge, 0));
        let odds = RollOdds::build(50, 1).expect("odds");
        let hooks = SchoolHooks::standard();
        let mut battle = Battle::new(&roster, &odds, &hooks, CombatRules::default(), Side::Control);
        arm(&mut battle, 1, &[1]);
        battle.phase = 1;
        assert_eq!(battle.fighter(CombatantId(1)).tn_to_hit(), 25);
        // Lunge 5k3 of 5s = 15 against TN 5: two raises plus one, damage 10k2 = 10.
        let mut dice = ScriptedDice::constant(5);
        assert_eq!(battle.take_action(CombatantId(1), &mut dice), Ok(true));
        assert_eq!(dice.draws(), 5 + 10 + 4);
        assert_eq!(battle.combatants[0].lw(), 10);
        assert_eq!(battle.fighter(CombatantId(1)).tn_to_hit(), 20);
        battle.combatants[1].modifiers_mut().sweep(Expiry::EndOfRound);
        assert_eq!(battle.fighter(CombatantId(1)).tn_to_hit(), 25);
    }
}
