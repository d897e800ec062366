use super::{ActionStrategy, DecisionContext};
use crate::constants::LAST_PHASE;
use crate::error::StrategyError;

/// Keep one die in reserve for parries until the last phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldOne;

impl ActionStrategy for HoldOne {
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<bool, StrategyError> {
        let available = ctx.me.available_actions(ctx.phase);
        Ok(available > 1 || (available == 1 && ctx.phase >= LAST_PHASE))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAct;

impl ActionStrategy for AlwaysAct {
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<bool, StrategyError> {
        Ok(ctx.me.has_action(ctx.phase))
    }
}
