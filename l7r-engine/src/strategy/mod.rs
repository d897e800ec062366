//! Pluggable decision policies.
//!
//! Every choice a character makes in combat goes through one of five roles.
//! Each role is a small trait; characters bind one implementation per role by
//! name (`StrategyBindings`) or directly (`StrategySet::with_*`). Built-in
//! policies are stateless and read only the `DecisionContext` they are given.

mod action;
mod attack;
mod parry;
mod wounds;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::character::{Fighter, RollKind, Skill};
use crate::dice::RollParams;
use crate::error::StrategyError;
use crate::group::CombatantId;
use crate::odds::RollOdds;

pub use action::{AlwaysAct, HoldOne};
pub use attack::{AlwaysAttack, LungeAttack, StingyPlain, UniversalAttack, damage_optimizer};
pub use parry::{AlwaysParry, NeverParry, ReluctantParry};
pub use wounds::{
    AlwaysKeep, KeepLightWounds, NeverKeep, StingyWoundCheck, WoundCheckSpend,
};

/// The attack forms a character may choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackForm {
    Plain,
    Double,
    Feint,
    /// One extra damage die, paid for with a lower TN to be hit this round.
    Lunge,
}

impl AttackForm {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Plain => "attack",
            Self::Double => "double attack",
            Self::Feint => "feint",
            Self::Lunge => "lunge",
        }
    }

    #[must_use]
    pub const fn roll_kind(self) -> RollKind {
        match self {
            Self::Plain => RollKind::Attack,
            Self::Double => RollKind::DoubleAttack,
            Self::Feint => RollKind::Feint,
            Self::Lunge => RollKind::Lunge,
        }
    }

    /// Knack a character must hold to use this form.
    #[must_use]
    pub const fn knack(self) -> Option<Skill> {
        match self {
            Self::Plain => None,
            Self::Double => Some(Skill::DoubleAttack),
            Self::Feint => Some(Skill::Feint),
            Self::Lunge => Some(Skill::Lunge),
        }
    }
}

impl fmt::Display for AttackForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An attack strategy's answer: who, how, and how many VP to commit before rolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackPlan {
    pub target: CombatantId,
    pub form: AttackForm,
    pub vp: u32,
}

/// A resolved hit awaiting parry decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingAttack {
    pub attacker: CombatantId,
    pub target: CombatantId,
    pub form: AttackForm,
    /// Attack roll total; also the TN of any parry.
    pub total: i32,
    pub tn: i32,
    /// Damage pool the target faces if nobody parries.
    pub damage: RollParams,
    pub parry_attempts: u32,
    /// Characters who were offered this parry and declined.
    pub declined: Vec<CombatantId>,
}

/// Everything a policy may look at when deciding.
#[derive(Debug, Clone)]
pub struct DecisionContext<'a> {
    pub me: Fighter<'a>,
    /// Living members of my side, excluding me.
    pub allies: Vec<Fighter<'a>>,
    /// Living members of the other side.
    pub enemies: Vec<Fighter<'a>>,
    pub phase: u8,
    pub interrupt_cost: usize,
    pub odds: &'a RollOdds,
}

impl<'a> DecisionContext<'a> {
    /// Look up any living character visible from this context.
    #[must_use]
    pub fn fighter(&self, id: CombatantId) -> Option<Fighter<'a>> {
        std::iter::once(&self.me)
            .chain(&self.allies)
            .chain(&self.enemies)
            .find(|fighter| fighter.id() == id)
            .copied()
    }

    /// Whether `fighter` could still react this phase, by action or interrupt.
    #[must_use]
    pub fn can_react(&self, fighter: &Fighter<'_>) -> bool {
        fighter.has_action(self.phase) || fighter.state.actions().len() >= self.interrupt_cost
    }
}

/// Act now, or hold action dice for later.
pub trait ActionStrategy: fmt::Debug + Send + Sync {
    /// # Errors
    ///
    /// Returns `StrategyError` when no decision can be made.
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<bool, StrategyError>;
}

/// Pick a target, a form, and a VP spend. `None` holds the action.
pub trait AttackStrategy: fmt::Debug + Send + Sync {
    /// # Errors
    ///
    /// Returns `StrategyError` when no decision can be made.
    fn decide(
        &self,
        ctx: &DecisionContext<'_>,
        candidates: &[Fighter<'_>],
    ) -> Result<Option<AttackPlan>, StrategyError>;
}

/// Parry a resolved hit against `ctx.me` or an ally.
pub trait ParryStrategy: fmt::Debug + Send + Sync {
    /// # Errors
    ///
    /// Returns `StrategyError` when no decision can be made.
    fn decide(&self, ctx: &DecisionContext<'_>, attack: &IncomingAttack)
    -> Result<bool, StrategyError>;
}

/// After a passed wound check: `true` keeps light wounds, `false` trades them for 1 SW.
pub trait LightWoundsStrategy: fmt::Debug + Send + Sync {
    /// # Errors
    ///
    /// Returns `StrategyError` when no decision can be made.
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<bool, StrategyError>;
}

/// VP to spend on the coming wound check.
pub trait WoundCheckStrategy: fmt::Debug + Send + Sync {
    /// # Errors
    ///
    /// Returns `StrategyError` when no decision can be made.
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<u32, StrategyError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPolicy {
    #[default]
    HoldOne,
    AlwaysAct,
}

impl ActionPolicy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HoldOne => "hold_one",
            Self::AlwaysAct => "always_act",
        }
    }

    #[must_use]
    pub fn create(self) -> Arc<dyn ActionStrategy> {
        match self {
            Self::HoldOne => Arc::new(HoldOne),
            Self::AlwaysAct => Arc::new(AlwaysAct),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackPolicy {
    #[default]
    Universal,
    AlwaysAttack,
    StingyPlain,
    Lunge,
}

impl AttackPolicy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Universal => "universal",
            Self::AlwaysAttack => "always_attack",
            Self::StingyPlain => "stingy_plain",
            Self::Lunge => "lunge",
        }
    }

    #[must_use]
    pub fn create(self) -> Arc<dyn AttackStrategy> {
        match self {
            Self::Universal => Arc::new(UniversalAttack),
            Self::AlwaysAttack => Arc::new(AlwaysAttack),
            Self::StingyPlain => Arc::new(StingyPlain),
            Self::Lunge => Arc::new(LungeAttack),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParryPolicy {
    #[default]
    Reluctant,
    Always,
    Never,
}

impl ParryPolicy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reluctant => "reluctant",
            Self::Always => "always",
            Self::Never => "never",
        }
    }

    #[must_use]
    pub fn create(self) -> Arc<dyn ParryStrategy> {
        match self {
            Self::Reluctant => Arc::new(ReluctantParry),
            Self::Always => Arc::new(AlwaysParry),
            Self::Never => Arc::new(NeverParry),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightWoundsPolicy {
    #[default]
    KeepLightWounds,
    AlwaysKeep,
    NeverKeep,
}

impl LightWoundsPolicy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::KeepLightWounds => "keep_light_wounds",
            Self::AlwaysKeep => "always_keep",
            Self::NeverKeep => "never_keep",
        }
    }

    #[must_use]
    pub fn create(self) -> Arc<dyn LightWoundsStrategy> {
        match self {
            Self::KeepLightWounds => Arc::new(KeepLightWounds),
            Self::AlwaysKeep => Arc::new(AlwaysKeep),
            Self::NeverKeep => Arc::new(NeverKeep),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WoundCheckPolicy {
    #[default]
    WoundCheck,
    Stingy,
}

impl WoundCheckPolicy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WoundCheck => "wound_check",
            Self::Stingy => "stingy",
        }
    }

    #[must_use]
    pub fn create(self) -> Arc<dyn WoundCheckStrategy> {
        match self {
            Self::WoundCheck => Arc::new(WoundCheckSpend),
            Self::Stingy => Arc::new(StingyWoundCheck),
        }
    }
}

/// Per-role policy names as they appear in character files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyBindings {
    pub action: ActionPolicy,
    pub attack: AttackPolicy,
    pub parry: ParryPolicy,
    pub light_wounds: LightWoundsPolicy,
    pub wound_check: WoundCheckPolicy,
}

/// The live policy objects a character decides with.
#[derive(Debug, Clone)]
pub struct StrategySet {
    pub action: Arc<dyn ActionStrategy>,
    pub attack: Arc<dyn AttackStrategy>,
    pub parry: Arc<dyn ParryStrategy>,
    pub light_wounds: Arc<dyn LightWoundsStrategy>,
    pub wound_check: Arc<dyn WoundCheckStrategy>,
}

impl Default for StrategySet {
    fn default() -> Self {
        Self::from_bindings(&StrategyBindings::default())
    }
}

impl StrategySet {
    #[must_use]
    pub fn from_bindings(bindings: &StrategyBindings) -> Self {
        Self {
            action: bindings.action.create(),
            attack: bindings.attack.create(),
            parry: bindings.parry.create(),
            light_wounds: bindings.light_wounds.create(),
            wound_check: bindings.wound_check.create(),
        }
    }

    #[must_use]
    pub fn with_action(mut self, strategy: Arc<dyn ActionStrategy>) -> Self {
        self.action = strategy;
        self
    }

    #[must_use]
    pub fn with_attack(mut self, strategy: Arc<dyn AttackStrategy>) -> Self {
        self.attack = strategy;
        self
    }

    #[must_use]
    pub fn with_parry(mut self, strategy: Arc<dyn ParryStrategy>) -> Self {
        self.parry = strategy;
        self
    }

    #[must_use]
    pub fn with_light_wounds(mut self, strategy: Arc<dyn LightWoundsStrategy>) -> Self {
        self.light_wounds = strategy;
        self
    }

    #[must_use]
    pub fn with_wound_check(mut self, strategy: Arc<dyn WoundCheckStrategy>) -> Self {
        self.wound_check = strategy;
        self
    }
}
