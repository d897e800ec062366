use super::{AttackForm, DecisionContext, IncomingAttack, ParryStrategy};
use crate::character::combat::wound_check_sw;
use crate::constants::{DOUBLE_ATTACK_DIRECT_SW, PARRY_SW_THRESHOLD};
use crate::error::StrategyError;
use crate::numbers::floor_f64_to_i32;

/// Parry only when the hit is dangerous and nobody better placed is left to do it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReluctantParry;

impl ParryStrategy for ReluctantParry {
    fn decide(
        &self,
        ctx: &DecisionContext<'_>,
        attack: &IncomingAttack,
    ) -> Result<bool, StrategyError> {
        let Some(defender) = ctx.fighter(attack.target) else {
            return Ok(false);
        };
        if defender.side() != ctx.me.side() || attack.parry_attempts > 0 {
            return Ok(false);
        }
        let someone_else = ctx
            .allies
            .iter()
            .any(|ally| !attack.declined.contains(&ally.id()) && ctx.can_react(ally));
        if someone_else {
            return Ok(false);
        }

        let damage = floor_f64_to_i32(ctx.odds.mean_params(attack.damage));
        let check = floor_f64_to_i32(ctx.odds.mean_params(defender.wound_check_params(0)));
        let mut expected_sw = wound_check_sw(check, defender.state.lw() + damage);
        if attack.form == AttackForm::Double {
            expected_sw += DOUBLE_ATTACK_DIRECT_SW;
        }
        Ok(expected_sw >= defender.sw_remaining() || expected_sw >= PARRY_SW_THRESHOLD)
    }
}

/// Parry every hit on my side.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysParry;

impl ParryStrategy for AlwaysParry {
    fn decide(
        &self,
        ctx: &DecisionContext<'_>,
        attack: &IncomingAttack,
    ) -> Result<bool, StrategyError> {
        Ok(ctx
            .fighter(attack.target)
            .is_some_and(|defender| defender.side() == ctx.me.side()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverParry;

impl ParryStrategy for NeverParry {
    fn decide(
        &self,
        _ctx: &DecisionContext<'_>,
        _attack: &IncomingAttack,
    ) -> Result<bool, StrategyError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{ActionDice, Fighter};
    use crate::dice::RollParams;
    use crate::group::{CombatantId, Side};
    use crate::strategy::testing::{duelist, fresh, odds};

    fn incoming(form: AttackForm, damage: RollParams) -> IncomingAttack {
        IncomingAttack {
            attacker: CombatantId(1),
            target: CombatantId(0),
            form,
            total: 30,
            tn: 25,
            damage,
            parry_attempts: 0,
            declined: Vec::new(),
        }
    }

    #[test]
    fn shrugs_off_small_hits_and_parries_big_ones() {
        let odds = odds();
        let me = duelist("Kenji", 3, 3, 3);
        let state = fresh(0, Side::Control, &me);
        let enemy = duelist("Aiko", 3, 3, 3);
        let enemy_state = fresh(1, Side::Test, &enemy);
        let ctx = DecisionContext {
            me: Fighter::new(&me, &state),
            allies: Vec::new(),
            enemies: vec![Fighter::new(&enemy, &enemy_state)],
            phase: 4,
            interrupt_cost: 2,
            odds: &odds,
        };
        let small = incoming(AttackForm::Plain, RollParams::new(2, 1));
        assert_eq!(ReluctantParry.decide(&ctx, &small), Ok(false));
        let big = incoming(AttackForm::Plain, RollParams::new(10, 6));
        assert_eq!(ReluctantParry.decide(&ctx, &big), Ok(true));
        assert_eq!(NeverParry.decide(&ctx, &big), Ok(false));
        assert_eq!(AlwaysParry.decide(&ctx, &small), Ok(true));
    }

    #[test]
    fn double_attacks_count_their_direct_wound() {
        let odds = odds();
        let me = duelist("Kenji", 3, 3, 3);
        let state = fresh(0, Side::Control, &me);
        let ctx = DecisionContext {
            me: Fighter::new(&me, &state),
            allies: Vec::new(),
            enemies: Vec::new(),
            phase: 4,
            interrupt_cost: 2,
            odds: &odds,
        };
        // 7k3 against a 4k3 wound check averages one serious wound.
        let plain = incoming(AttackForm::Plain, RollParams::new(7, 3));
        let double = incoming(AttackForm::Double, RollParams::new(7, 3));
        assert_eq!(ReluctantParry.decide(&ctx, &plain), Ok(false));
        assert_eq!(ReluctantParry.decide(&ctx, &double), Ok(true));
    }

    #[test]
    fn leaves_the_parry_to_a_ready_friend() {
        let odds = odds();
        let me = duelist("Kenji", 3, 3, 3);
        let state = fresh(0, Side::Control, &me);
        let friend = duelist("Hiro", 3, 3, 3);
        let mut friend_state = fresh(2, Side::Control, &friend);
        friend_state
            .set_actions(ActionDice::from_slice(&[3]), "Hiro")
            .expect("dice");
        let ctx = DecisionContext {
            me: Fighter::new(&me, &state),
            allies: vec![Fighter::new(&friend, &friend_state)],
            enemies: Vec::new(),
            phase: 4,
            interrupt_cost: 2,
            odds: &odds,
        };
        let mut big = incoming(AttackForm::Plain, RollParams::new(10, 6));
        assert_eq!(ReluctantParry.decide(&ctx, &big), Ok(false));
        big.declined.push(CombatantId(2));
        assert_eq!(ReluctantParry.decide(&ctx, &big), Ok(true));
        big.parry_attempts = 1;
        assert_eq!(ReluctantParry.decide(&ctx, &big), Ok(false));
    }

    #[test]
    fn never_parries_for_the_other_side() {
        let odds = odds();
        let me = duelist("Kenji", 3, 3, 3);
        let state = fresh(1, Side::Test, &me);
        let victim = duelist("Aiko", 3, 3, 3);
        let victim_state = fresh(0, Side::Control, &victim);
        let ctx = DecisionContext {
            me: Fighter::new(&me, &state),
            allies: Vec::new(),
            enemies: vec![Fighter::new(&victim, &victim_state)],
            phase: 4,
            interrupt_cost: 2,
            odds: &odds,
        };
        let big = incoming(AttackForm::Plain, RollParams::new(10, 6));
        assert_eq!(ReluctantParry.decide(&ctx, &big), Ok(false));
        assert_eq!(AlwaysParry.decide(&ctx, &big), Ok(false));
    }
}
