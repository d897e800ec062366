use super::{DecisionContext, LightWoundsStrategy, WoundCheckStrategy};
use crate::character::combat::{wound_check_needed, wound_check_sw};
use crate::constants::{
    FALLBACK_DAMAGE_KEPT, FALLBACK_DAMAGE_ROLLED, KEEP_LW_SW_LIMIT, WOUND_CHECK_THRESHOLD_P,
};
use crate::error::StrategyError;
use crate::numbers::{floor_f64_to_i32, i64_to_f64, usize_to_f64};

/// Keep light wounds unless the next expected hit would make the wound
/// check cost more than two serious wounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepLightWounds;

impl LightWoundsStrategy for KeepLightWounds {
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<bool, StrategyError> {
        let me = &ctx.me;
        if me.sw_remaining() == 1 {
            return Ok(true);
        }
        let history = me.state.lw_history();
        let expected_damage = if history.is_empty() {
            ctx.odds
                .mean(FALLBACK_DAMAGE_ROLLED, FALLBACK_DAMAGE_KEPT, true)
        } else {
            let sum: i64 = history.iter().map(|damage| i64::from(*damage)).sum();
            i64_to_f64(sum) / usize_to_f64(history.len())
        };
        let check = floor_f64_to_i32(ctx.odds.mean_params(me.wound_check_params(0)));
        let future_lw = me.state.lw() + floor_f64_to_i32(expected_damage);
        Ok(wound_check_sw(check, future_lw) <= KEEP_LW_SW_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysKeep;

impl LightWoundsStrategy for AlwaysKeep {
    fn decide(&self, _ctx: &DecisionContext<'_>) -> Result<bool, StrategyError> {
        Ok(true)
    }
}

/// Trade light wounds for a serious wound after every passed check.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverKeep;

impl LightWoundsStrategy for NeverKeep {
    fn decide(&self, _ctx: &DecisionContext<'_>) -> Result<bool, StrategyError> {
        Ok(false)
    }
}

/// Fewest VP giving a 60% chance to take at most one serious wound
/// (none when a single wound would be fatal).
#[derive(Debug, Clone, Copy, Default)]
pub struct WoundCheckSpend;

impl WoundCheckStrategy for WoundCheckSpend {
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<u32, StrategyError> {
        let me = &ctx.me;
        let max_sw = (me.sw_remaining() - 1).min(1);
        let needed = wound_check_needed(me.state.lw(), max_sw);
        let spend = (0..=me.spendable_vp()).find(|vp| {
            ctx.odds.p_params(needed, me.wound_check_params(*vp)) >= WOUND_CHECK_THRESHOLD_P
        });
        Ok(spend.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StingyWoundCheck;

impl WoundCheckStrategy for StingyWoundCheck {
    fn decide(&self, _ctx: &DecisionContext<'_>) -> Result<u32, StrategyError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Combatant, Fighter};
    use crate::group::Side;
    use crate::odds::RollOdds;
    use crate::strategy::testing::{duelist, fresh, odds};

    fn context<'a>(
        character: &'a crate::character::Character,
        state: &'a Combatant,
        odds: &'a RollOdds,
    ) -> DecisionContext<'a> {
        DecisionContext {
            me: Fighter::new(character, state),
            allies: Vec::new(),
            enemies: Vec::new(),
            phase: 5,
            interrupt_cost: 2,
            odds,
        }
    }

    #[test]
    fn keeps_small_wounds_and_trades_big_ones() {
        let odds = odds();
        let kenji = duelist("Kenji", 3, 3, 2);
        let mut light = fresh(0, Side::Control, &kenji);
        light.take_lw(5, "Kenji").expect("damage");
        assert_eq!(KeepLightWounds.decide(&context(&kenji, &light, &odds)), Ok(true));

        let mut heavy = fresh(0, Side::Control, &kenji);
        heavy.take_lw(40, "Kenji").expect("damage");
        assert_eq!(KeepLightWounds.decide(&context(&kenji, &heavy, &odds)), Ok(false));
        assert_eq!(AlwaysKeep.decide(&context(&kenji, &heavy, &odds)), Ok(true));
        assert_eq!(NeverKeep.decide(&context(&kenji, &light, &odds)), Ok(false));
    }

    #[test]
    fn never_trades_the_last_serious_wound() {
        let odds = odds();
        let kenji = duelist("Kenji", 3, 3, 2);
        let mut state = fresh(0, Side::Control, &kenji);
        state.take_sw(5, kenji.max_sw(), "Kenji").expect("alive");
        state.take_lw(40, "Kenji").expect("damage");
        assert_eq!(KeepLightWounds.decide(&context(&kenji, &state, &odds)), Ok(true));
    }

    #[test]
    fn spends_void_only_when_it_matters() {
        let odds = odds();
        let kenji = duelist("Kenji", 3, 3, 2);
        let mut easy = fresh(0, Side::Control, &kenji);
        easy.take_lw(15, "Kenji").expect("damage");
        assert_eq!(WoundCheckSpend.decide(&context(&kenji, &easy, &odds)), Ok(0));

        let mut hard = fresh(0, Side::Control, &kenji);
        hard.take_lw(40, "Kenji").expect("damage");
        let vp = WoundCheckSpend
            .decide(&context(&kenji, &hard, &odds))
            .expect("decision");
        assert!((2..=3).contains(&vp), "spent {vp}");
        assert_eq!(StingyWoundCheck.decide(&context(&kenji, &hard, &odds)), Ok(0));

        let mut hopeless = fresh(0, Side::Control, &kenji);
        hopeless.take_lw(90, "Kenji").expect("damage");
        assert_eq!(WoundCheckSpend.decide(&context(&kenji, &hopeless, &odds)), Ok(0));
    }
}
