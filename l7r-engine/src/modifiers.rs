//! Transient roll modifiers with explicit expiry.
//!
//! Every situational bonus (free raises, TN shifts, extra dice) lives in a
//! character's `ModifierList` tagged with when it expires. End-of-roll entries
//! are consumed by the first roll they apply to; the scheduler sweeps the rest
//! at round and combat boundaries.

use serde::{Deserialize, Serialize};

use crate::character::RollKind;
use crate::constants::RAISE;

/// When a modifier stops applying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    EndOfRoll,
    EndOfRound,
    EndOfCombat,
}

/// Which rolls or values a modifier touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierScope {
    /// Any attack-form roll (attack, double attack, feint, lunge, counterattack).
    AnyAttack,
    Roll(RollKind),
    /// The TN others must meet to hit the bearer.
    TnToHit,
}

impl ModifierScope {
    #[must_use]
    pub fn applies_to(self, kind: RollKind) -> bool {
        match self {
            Self::AnyAttack => kind.is_attack(),
            Self::Roll(scoped) => scoped == kind,
            Self::TnToHit => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierEffect {
    Flat(i32),
    FreeRaises(i32),
    ExtraDice { rolled: i32, kept: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifier {
    pub scope: ModifierScope,
    pub effect: ModifierEffect,
    pub expiry: Expiry,
    pub source: &'static str,
}

impl Modifier {
    #[must_use]
    pub const fn new(
        scope: ModifierScope,
        effect: ModifierEffect,
        expiry: Expiry,
        source: &'static str,
    ) -> Self {
        Self {
            scope,
            effect,
            expiry,
            source,
        }
    }

    const fn bonus(&self) -> i32 {
        match self.effect {
            ModifierEffect::Flat(value) => value,
            ModifierEffect::FreeRaises(raises) => raises * RAISE,
            ModifierEffect::ExtraDice { .. } => 0,
        }
    }

    const fn dice(&self) -> (i32, i32) {
        match self.effect {
            ModifierEffect::ExtraDice { rolled, kept } => (rolled, kept),
            ModifierEffect::Flat(_) | ModifierEffect::FreeRaises(_) => (0, 0),
        }
    }
}

/// Aggregate effect of every modifier that applies to one roll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollAdjustment {
    pub bonus: i32,
    pub extra_rolled: i32,
    pub extra_kept: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierList {
    entries: Vec<Modifier>,
}

impl ModifierList {
    pub fn add(&mut self, modifier: Modifier) {
        self.entries.push(modifier);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the modifiers that would apply to a roll of `kind`.
    #[must_use]
    pub fn adjustment(&self, kind: RollKind) -> RollAdjustment {
        self.entries
            .iter()
            .filter(|modifier| modifier.scope.applies_to(kind))
            .fold(RollAdjustment::default(), |mut acc, modifier| {
                let (rolled, kept) = modifier.dice();
                acc.bonus += modifier.bonus();
                acc.extra_rolled += rolled;
                acc.extra_kept += kept;
                acc
            })
    }

    /// Net shift to the TN others need to hit the bearer.
    #[must_use]
    pub fn tn_to_hit(&self) -> i32 {
        self.entries
            .iter()
            .filter(|modifier| modifier.scope == ModifierScope::TnToHit)
            .map(Modifier::bonus)
            .sum()
    }

    /// Drop end-of-roll entries spent by a roll of `kind`.
    pub fn consume_roll(&mut self, kind: RollKind) {
        self.entries.retain(|modifier| {
            !(modifier.expiry == Expiry::EndOfRoll && modifier.scope.applies_to(kind))
        });
    }

    /// Drop entries whose expiry is reached at `boundary`.
    ///
    /// End-of-roll entries wait for the roll they apply to and survive round
    /// boundaries; ending the combat clears everything.
    pub fn sweep(&mut self, boundary: Expiry) {
        match boundary {
            Expiry::EndOfRoll | Expiry::EndOfRound => {
                self.entries.retain(|m| m.expiry != boundary);
            }
            Expiry::EndOfCombat => self.entries.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attack_bonus(value: i32, expiry: Expiry) -> Modifier {
        Modifier::new(ModifierScope::AnyAttack, ModifierEffect::Flat(value), expiry, "test")
    }

    #[test]
    fn adjustments_only_count_matching_scopes() {
        let mut list = ModifierList::default();
        list.add(attack_bonus(7, Expiry::EndOfRoll));
        list.add(Modifier::new(
            ModifierScope::Roll(RollKind::WoundCheck),
            ModifierEffect::FreeRaises(2),
            Expiry::EndOfCombat,
            "test",
        ));
        list.add(Modifier::new(
            ModifierScope::Roll(RollKind::Damage),
            ModifierEffect::ExtraDice { rolled: 1, kept: 1 },
            Expiry::EndOfRoll,
            "test",
        ));
        assert_eq!(list.adjustment(RollKind::DoubleAttack).bonus, 7);
        assert_eq!(list.adjustment(RollKind::WoundCheck).bonus, 10);
        assert_eq!(list.adjustment(RollKind::Parry), RollAdjustment::default());
        let damage = list.adjustment(RollKind::Damage);
        assert_eq!((damage.extra_rolled, damage.extra_kept), (1, 1));
    }

    #[test]
    fn consuming_a_roll_removes_only_spent_end_of_roll_entries() {
        let mut list = ModifierList::default();
        list.add(attack_bonus(5, Expiry::EndOfRoll));
        list.add(attack_bonus(3, Expiry::EndOfRound));
        list.consume_roll(RollKind::Parry);
        assert_eq!(list.len(), 2);
        list.consume_roll(RollKind::Attack);
        assert_eq!(list.len(), 1);
        assert_eq!(list.adjustment(RollKind::Attack).bonus, 3);
    }

    #[test]
    fn sweeps_follow_expiry_boundaries() {
        let mut list = ModifierList::default();
        list.add(attack_bonus(1, Expiry::EndOfRoll));
        list.add(attack_bonus(2, Expiry::EndOfRound));
        list.add(Modifier::new(
            ModifierScope::TnToHit,
            ModifierEffect::FreeRaises(1),
            Expiry::EndOfCombat,
            "test",
        ));
        list.sweep(Expiry::EndOfRound);
        assert_eq!(list.len(), 2);
        assert_eq!(list.tn_to_hit(), 5);
        assert_eq!(list.adjustment(RollKind::Attack).bonus, 1);
        list.sweep(Expiry::EndOfRoll);
        assert_eq!(list.len(), 1);
        list.sweep(Expiry::EndOfCombat);
        assert!(list.is_empty());
    }
}
