//! School data and the hook registry for school special abilities.
//!
//! Generic rank effects (1st dan extra dice, 2nd dan free raise, 4th dan ring
//! raise) are data and are folded into the character profile. Everything else
//! is a hook keyed by (school, hook point) that the resolver fires without
//! knowing what it does.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::character::{Character, Ring, RollKind, Skill};
use crate::constants::RAISE;
use crate::modifiers::{Expiry, Modifier, ModifierEffect, ModifierScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolId {
    AkodoBushi,
    BayushiBushi,
    KakitaBushi,
    MatsuBushi,
    MirumotoBushi,
    ShibaBushi,
}

/// Static rank data for one school.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchoolData {
    pub name: &'static str,
    pub ring: Ring,
    pub knacks: [Skill; 3],
    pub first_dan: [RollKind; 3],
    pub second_dan: RollKind,
}

impl SchoolId {
    #[must_use]
    pub const fn data(self) -> SchoolData {
        match self {
            Self::AkodoBushi => SchoolData {
                name: "Akodo Bushi School",
                ring: Ring::Water,
                knacks: [Skill::DoubleAttack, Skill::Feint, Skill::Iaijutsu],
                first_dan: [RollKind::DoubleAttack, RollKind::Feint, RollKind::WoundCheck],
                second_dan: RollKind::WoundCheck,
            },
            Self::BayushiBushi => SchoolData {
                name: "Bayushi Bushi School",
                ring: Ring::Fire,
                knacks: [Skill::DoubleAttack, Skill::Feint, Skill::Iaijutsu],
                first_dan: [RollKind::DoubleAttack, RollKind::Iaijutsu, RollKind::WoundCheck],
                second_dan: RollKind::DoubleAttack,
            },
            Self::KakitaBushi => SchoolData {
                name: "Kakita Bushi School",
                ring: Ring::Fire,
                knacks: [Skill::DoubleAttack, Skill::Iaijutsu, Skill::Lunge],
                first_dan: [RollKind::DoubleAttack, RollKind::Iaijutsu, RollKind::Initiative],
                second_dan: RollKind::Iaijutsu,
            },
            Self::MatsuBushi => SchoolData {
                name: "Matsu Bushi School",
                ring: Ring::Fire,
                knacks: [Skill::DoubleAttack, Skill::Iaijutsu, Skill::Lunge],
                first_dan: [RollKind::DoubleAttack, RollKind::Lunge, RollKind::WoundCheck],
                second_dan: RollKind::WoundCheck,
            },
            Self::MirumotoBushi => SchoolData {
                name: "Mirumoto Bushi School",
                ring: Ring::Void,
                knacks: [Skill::DoubleAttack, Skill::Iaijutsu, Skill::Lunge],
                first_dan: [RollKind::Attack, RollKind::DoubleAttack, RollKind::Parry],
                second_dan: RollKind::Parry,
            },
            Self::ShibaBushi => SchoolData {
                name: "Shiba Bushi School",
                ring: Ring::Air,
                knacks: [Skill::DoubleAttack, Skill::Iaijutsu, Skill::Lunge],
                first_dan: [RollKind::DoubleAttack, RollKind::Parry, RollKind::WoundCheck],
                second_dan: RollKind::Parry,
            },
        }
    }
}

/// A character's school and rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolMembership {
    #[serde(rename = "name")]
    pub school: SchoolId,
    pub dan: u8,
}

/// Fixed extension points inside the action resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    PreRoll,
    PostRoll,
    PostDamage,
    PostWoundCheck,
}

/// What happened at a hook point, from the hook owner's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// The owner is about to make a roll with `vp` committed.
    PreRoll { kind: RollKind, vp: u32 },
    /// The owner's roll resolved against `tn`.
    PostRoll { kind: RollKind, total: i32, tn: i32 },
    /// The owner just took `damage` light wounds.
    PostDamage { damage: i32, lw: i32 },
    /// The owner's wound check resolved against `lw`.
    PostWoundCheck { roll: i32, lw: i32 },
}

impl HookEvent {
    #[must_use]
    pub const fn point(&self) -> HookPoint {
        match self {
            Self::PreRoll { .. } => HookPoint::PreRoll,
            Self::PostRoll { .. } => HookPoint::PostRoll,
            Self::PostDamage { .. } => HookPoint::PostDamage,
            Self::PostWoundCheck { .. } => HookPoint::PostWoundCheck,
        }
    }
}

/// State changes a hook asks the resolver to apply to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEffect {
    GainTemporaryVoid(u32),
    AddModifier(Modifier),
}

pub type HookEffects = SmallVec<[HookEffect; 2]>;
pub type HookFn = fn(&Character, &HookEvent) -> HookEffects;

#[derive(Debug, Clone, Copy)]
struct RegisteredHook {
    min_dan: u8,
    run: HookFn,
}

/// Registry of school hooks keyed by (school, hook point).
#[derive(Debug, Clone, Default)]
pub struct SchoolHooks {
    hooks: HashMap<(SchoolId, HookPoint), Vec<RegisteredHook>>,
}

impl SchoolHooks {
    /// Registry with every built-in school ability.
    #[must_use]
    pub fn standard() -> Self {
        let mut hooks = Self::default();
        hooks.register(SchoolId::AkodoBushi, HookPoint::PostRoll, 1, akodo_feint_void);
        hooks.register(SchoolId::AkodoBushi, HookPoint::PostWoundCheck, 3, akodo_wound_check_bonus);
        hooks.register(SchoolId::BayushiBushi, HookPoint::PreRoll, 1, bayushi_void_damage);
        hooks
    }

    /// Add a hook that fires for members of `school` at `min_dan` or above.
    pub fn register(&mut self, school: SchoolId, point: HookPoint, min_dan: u8, run: HookFn) {
        self.hooks
            .entry((school, point))
            .or_default()
            .push(RegisteredHook { min_dan, run });
    }

    /// Run every hook `owner`'s school has for `event`.
    #[must_use]
    pub fn fire(&self, owner: &Character, event: &HookEvent) -> HookEffects {
        let Some(membership) = owner.school() else {
            return HookEffects::new();
        };
        let Some(hooks) = self.hooks.get(&(membership.school, event.point())) else {
            return HookEffects::new();
        };
        hooks
            .iter()
            .filter(|hook| membership.dan >= hook.min_dan)
            .flat_map(|hook| (hook.run)(owner, event))
            .collect()
    }
}

// Feints refund void: 4 temporary VP on a hit (the resolver grants the first), 1 on a miss.
fn akodo_feint_void(_owner: &Character, event: &HookEvent) -> HookEffects {
    let mut effects = HookEffects::new();
    if let HookEvent::PostRoll {
        kind: RollKind::Feint,
        total,
        tn,
    } = *event
    {
        let amount = if total >= tn { 3 } else { 1 };
        effects.push(HookEffect::GainTemporaryVoid(amount));
    }
    effects
}

fn akodo_wound_check_bonus(owner: &Character, event: &HookEvent) -> HookEffects {
    let mut effects = HookEffects::new();
    if let HookEvent::PostWoundCheck { roll, lw } = *event
        && roll >= lw
    {
        let bonus = ((roll - lw) / RAISE) * i32::from(owner.skill(Skill::Attack));
        if bonus > 0 {
            effects.push(HookEffect::AddModifier(Modifier::new(
                ModifierScope::AnyAttack,
                ModifierEffect::Flat(bonus),
                Expiry::EndOfRoll,
                "akodo third dan",
            )));
        }
    }
    effects
}

fn bayushi_void_damage(_owner: &Character, event: &HookEvent) -> HookEffects {
    let mut effects = HookEffects::new();
    if let HookEvent::PreRoll { kind, vp } = *event
        && kind.is_attack()
        && vp > 0
    {
        let dice = i32::try_from(vp).unwrap_or(0);
        effects.push(HookEffect::AddModifier(Modifier::new(
            ModifierScope::Roll(RollKind::Damage),
            ModifierEffect::ExtraDice {
                rolled: dice,
                kept: dice,
            },
            Expiry::EndOfRoll,
            "bayushi special ability",
        )));
    }
    effects
}
