use super::{AttackForm, AttackPlan, AttackStrategy, DecisionContext};
use crate::character::{Fighter, Skill};
use crate::constants::{
    ATTACK_THRESHOLD, DAMAGE_KEPT_CEILING, DESPERATE_ATTACK_THRESHOLD, DOUBLE_ATTACK_THRESHOLD,
    DOUBLE_ATTACK_TN_OFFSET, FEINT_THRESHOLD, RAISE,
};
use crate::error::StrategyError;
use crate::numbers::floor_f64_to_i32;

/// Easiest target first: lowest TN to hit, then declaration order.
fn easiest_target<'a>(candidates: &[Fighter<'a>]) -> Option<Fighter<'a>> {
    candidates
        .iter()
        .filter(|fighter| fighter.is_fighting())
        .min_by_key(|fighter| (fighter.tn_to_hit(), fighter.id()))
        .copied()
}

/// Cheapest VP spend that reaches `threshold` odds of hitting `tn`, raised
/// only while each extra VP buys another kept damage die.
///
/// Returns `None` when no affordable spend reaches the threshold.
#[must_use]
pub fn damage_optimizer(
    ctx: &DecisionContext<'_>,
    form: AttackForm,
    tn: i32,
    threshold: f64,
) -> Option<u32> {
    let me = &ctx.me;
    let kind = form.roll_kind();
    let mut recommendation = None;
    let mut best_kept = 0;
    for vp in 0..=me.spendable_vp() {
        let params = me.skill_params(kind, vp);
        if ctx.odds.p_params(tn, params) < threshold {
            continue;
        }
        let expected = floor_f64_to_i32(ctx.odds.mean_params(params));
        let extra_rolled = ((expected - tn) / RAISE).max(0);
        let kept = me.damage_params(extra_rolled).normalized().kept;
        if kept > best_kept {
            recommendation = Some(vp);
            best_kept = kept;
        }
        if kept >= DAMAGE_KEPT_CEILING {
            break;
        }
    }
    recommendation
}

fn plan(target: Fighter<'_>, form: AttackForm, vp: u32) -> AttackPlan {
    AttackPlan {
        target: target.id(),
        form,
        vp,
    }
}

/// Double attack when it is likely, feint for void when dry, otherwise attack.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalAttack;

impl AttackStrategy for UniversalAttack {
    fn decide(
        &self,
        ctx: &DecisionContext<'_>,
        candidates: &[Fighter<'_>],
    ) -> Result<Option<AttackPlan>, StrategyError> {
        let Some(target) = easiest_target(candidates) else {
            return Err(StrategyError::NoCandidates {
                actor: ctx.me.name().to_string(),
            });
        };
        let me = &ctx.me;
        let tn = target.tn_to_hit();

        if me.character.skill(Skill::DoubleAttack) > 0
            && let Some(vp) = damage_optimizer(
                ctx,
                AttackForm::Double,
                tn + DOUBLE_ATTACK_TN_OFFSET,
                DOUBLE_ATTACK_THRESHOLD,
            )
        {
            return Ok(Some(plan(target, AttackForm::Double, vp)));
        }

        if me.state.vp() == 0
            && me.available_actions(ctx.phase) > 1
            && me.character.skill(Skill::Feint) > 0
            && ctx
                .odds
                .p_params(tn, me.skill_params(AttackForm::Feint.roll_kind(), 0))
                >= FEINT_THRESHOLD
        {
            return Ok(Some(plan(target, AttackForm::Feint, 0)));
        }

        let vp = damage_optimizer(ctx, AttackForm::Plain, tn, ATTACK_THRESHOLD).or_else(|| {
            damage_optimizer(ctx, AttackForm::Plain, tn, DESPERATE_ATTACK_THRESHOLD)
        });
        Ok(vp.map(|vp| plan(target, AttackForm::Plain, vp)))
    }
}

/// Plain attack every time, spending VP only for extra damage dice.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAttack;

impl AttackStrategy for AlwaysAttack {
    fn decide(
        &self,
        ctx: &DecisionContext<'_>,
        candidates: &[Fighter<'_>],
    ) -> Result<Option<AttackPlan>, StrategyError> {
        let Some(target) = easiest_target(candidates) else {
            return Err(StrategyError::NoCandidates {
                actor: ctx.me.name().to_string(),
            });
        };
        let vp = damage_optimizer(ctx, AttackForm::Plain, target.tn_to_hit(), 0.0).unwrap_or(0);
        Ok(Some(plan(target, AttackForm::Plain, vp)))
    }
}

/// Plain attack every time, never spending VP.
#[derive(Debug, Clone, Copy, Default)]
pub struct StingyPlain;

impl AttackStrategy for StingyPlain {
    fn decide(
        &self,
        _ctx: &DecisionContext<'_>,
        candidates: &[Fighter<'_>],
    ) -> Result<Option<AttackPlan>, StrategyError> {
        Ok(easiest_target(candidates).map(|target| plan(target, AttackForm::Plain, 0)))
    }
}

/// Lunge at the easiest target when trained, otherwise fight like `UniversalAttack`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LungeAttack;

impl AttackStrategy for LungeAttack {
    fn decide(
        &self,
        ctx: &DecisionContext<'_>,
        candidates: &[Fighter<'_>],
    ) -> Result<Option<AttackPlan>, StrategyError> {
        if ctx.me.character.skill(Skill::Lunge) == 0 {
            return UniversalAttack.decide(ctx, candidates);
        }
        let Some(target) = easiest_target(candidates) else {
            return Err(StrategyError::NoCandidates {
                actor: ctx.me.name().to_string(),
            });
        };
        let tn = target.tn_to_hit();
        let vp = damage_optimizer(ctx, AttackForm::Lunge, tn, ATTACK_THRESHOLD)
            .or_else(|| damage_optimizer(ctx, AttackForm::Lunge, tn, DESPERATE_ATTACK_THRESHOLD));
        Ok(vp.map(|vp| plan(target, AttackForm::Lunge, vp)))
    }
}
