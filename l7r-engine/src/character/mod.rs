//! Character builds and the immutable combat profile derived from them.
//!
//! A `CharacterBuild` is the serde-facing record an external loader produces.
//! `Character::from_build` validates it once and folds school rank effects
//! into a profile that every trial reuses; per-trial mutable state lives in
//! [`combat::Combatant`].

pub mod combat;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::SW_PER_EARTH;
use crate::error::ConfigurationError;
use crate::schools::{SchoolId, SchoolMembership};
use crate::strategy::{StrategyBindings, StrategySet};

pub use combat::{ActionDice, CombatTally, Combatant, Fighter};

const MIN_RING: u8 = 2;
const MAX_RING: u8 = 5;
const MAX_SCHOOL_RING: u8 = 6;
const MAX_SKILL: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ring {
    Air,
    Earth,
    Fire,
    Water,
    Void,
}

impl Ring {
    pub const ALL: [Self; 5] = [Self::Air, Self::Earth, Self::Fire, Self::Water, Self::Void];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Earth => "earth",
            Self::Fire => "fire",
            Self::Water => "water",
            Self::Void => "void",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rings {
    pub air: u8,
    pub earth: u8,
    pub fire: u8,
    pub water: u8,
    pub void: u8,
}

impl Default for Rings {
    fn default() -> Self {
        Self::uniform(MIN_RING)
    }
}

impl Rings {
    #[must_use]
    pub const fn uniform(value: u8) -> Self {
        Self {
            air: value,
            earth: value,
            fire: value,
            water: value,
            void: value,
        }
    }

    #[must_use]
    pub const fn get(&self, ring: Ring) -> u8 {
        match ring {
            Ring::Air => self.air,
            Ring::Earth => self.earth,
            Ring::Fire => self.fire,
            Ring::Water => self.water,
            Ring::Void => self.void,
        }
    }

    pub const fn set(&mut self, ring: Ring, value: u8) {
        match ring {
            Ring::Air => self.air = value,
            Ring::Earth => self.earth = value,
            Ring::Fire => self.fire = value,
            Ring::Water => self.water = value,
            Ring::Void => self.void = value,
        }
    }

    #[must_use]
    pub fn lowest(&self) -> u8 {
        Ring::ALL
            .iter()
            .map(|ring| self.get(*ring))
            .min()
            .unwrap_or(MIN_RING)
    }
}

/// Purchasable skills with a mechanical combat effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Attack,
    Parry,
    /// Accepted in builds and school data; no combat action rolls it yet.
    Counterattack,
    DoubleAttack,
    Feint,
    Iaijutsu,
    Lunge,
    Worldliness,
}

impl Skill {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Parry => "parry",
            Self::Counterattack => "counterattack",
            Self::DoubleAttack => "double attack",
            Self::Feint => "feint",
            Self::Iaijutsu => "iaijutsu",
            Self::Lunge => "lunge",
            Self::Worldliness => "worldliness",
        }
    }

    /// Advanced skills take a -10 penalty when used untrained.
    #[must_use]
    pub const fn is_advanced(self) -> bool {
        !matches!(self, Self::Worldliness)
    }
}

/// Every kind of roll a character makes during combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollKind {
    Attack,
    DoubleAttack,
    Feint,
    Lunge,
    /// Never rolled: school bonuses to it are carried as data only.
    Counterattack,
    Iaijutsu,
    Parry,
    Damage,
    WoundCheck,
    Initiative,
}

impl RollKind {
    #[must_use]
    pub const fn ring(self) -> Ring {
        match self {
            Self::Attack
            | Self::DoubleAttack
            | Self::Feint
            | Self::Lunge
            | Self::Counterattack
            | Self::Iaijutsu
            | Self::Damage => Ring::Fire,
            Self::Parry => Ring::Air,
            Self::WoundCheck => Ring::Water,
            Self::Initiative => Ring::Void,
        }
    }

    #[must_use]
    pub const fn skill(self) -> Option<Skill> {
        match self {
            Self::Attack => Some(Skill::Attack),
            Self::DoubleAttack => Some(Skill::DoubleAttack),
            Self::Feint => Some(Skill::Feint),
            Self::Lunge => Some(Skill::Lunge),
            Self::Counterattack => Some(Skill::Counterattack),
            Self::Iaijutsu => Some(Skill::Iaijutsu),
            Self::Parry => Some(Skill::Parry),
            Self::Damage | Self::WoundCheck | Self::Initiative => None,
        }
    }

    #[must_use]
    pub const fn is_attack(self) -> bool {
        matches!(
            self,
            Self::Attack | Self::DoubleAttack | Self::Feint | Self::Lunge | Self::Counterattack
        )
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.skill() {
            Some(skill) => skill.name(),
            None => match self {
                Self::Damage => "damage",
                Self::WoundCheck => "wound check",
                _ => "initiative",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advantage {
    GreatDestiny,
    StrengthOfTheEarth,
    /// Any trait without a mechanical combat effect.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disadvantage {
    PermanentWound,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub rolled: i32,
    pub kept: i32,
}

impl Weapon {
    pub const KATANA: Self = Self { rolled: 4, kept: 2 };
}

impl Default for Weapon {
    fn default() -> Self {
        Self::KATANA
    }
}

/// Validated-on-load character definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterBuild {
    #[serde(default)]
    pub name: Option<String>,
    pub rings: Rings,
    #[serde(default)]
    pub skills: BTreeMap<Skill, u8>,
    #[serde(default)]
    pub school: Option<SchoolMembership>,
    #[serde(default)]
    pub advantages: Vec<Advantage>,
    #[serde(default)]
    pub disadvantages: Vec<Disadvantage>,
    #[serde(default)]
    pub weapon: Weapon,
    #[serde(default)]
    pub strategies: StrategyBindings,
}

impl CharacterBuild {
    #[must_use]
    pub fn new(name: impl Into<String>, rings: Rings) -> Self {
        Self {
            name: Some(name.into()),
            rings,
            skills: BTreeMap::new(),
            school: None,
            advantages: Vec::new(),
            disadvantages: Vec::new(),
            weapon: Weapon::default(),
            strategies: StrategyBindings::default(),
        }
    }

    #[must_use]
    pub fn with_skill(mut self, skill: Skill, rank: u8) -> Self {
        self.skills.insert(skill, rank);
        self
    }

    #[must_use]
    pub const fn with_school(mut self, school: SchoolId, dan: u8) -> Self {
        self.school = Some(SchoolMembership { school, dan });
        self
    }

    #[must_use]
    pub fn with_advantage(mut self, advantage: Advantage) -> Self {
        self.advantages.push(advantage);
        self
    }

    #[must_use]
    pub fn with_disadvantage(mut self, disadvantage: Disadvantage) -> Self {
        self.disadvantages.push(disadvantage);
        self
    }

    #[must_use]
    pub const fn with_strategies(mut self, strategies: StrategyBindings) -> Self {
        self.strategies = strategies;
        self
    }

    /// Check ring, skill, dan, and weapon ranges.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigurationError` found.
    pub fn validate(&self, name: &str) -> Result<(), ConfigurationError> {
        let school_ring = self.school.map(|membership| membership.school.data().ring);
        for ring in Ring::ALL {
            let value = self.rings.get(ring);
            let max = if school_ring == Some(ring) {
                MAX_SCHOOL_RING
            } else {
                MAX_RING
            };
            if !(MIN_RING..=max).contains(&value) {
                return Err(ConfigurationError::RingOutOfRange {
                    character: name.to_string(),
                    ring: ring.name(),
                    min: MIN_RING,
                    max,
                    value,
                });
            }
        }
        for (skill, rank) in &self.skills {
            if *rank > MAX_SKILL {
                return Err(ConfigurationError::SkillOutOfRange {
                    character: name.to_string(),
                    skill: skill.name(),
                    rank: *rank,
                    max: MAX_SKILL,
                });
            }
        }
        if let Some(membership) = self.school
            && !(1..=5).contains(&membership.dan)
        {
            return Err(ConfigurationError::DanOutOfRange {
                character: name.to_string(),
                dan: membership.dan,
            });
        }
        if self.weapon.rolled < 1 || self.weapon.kept < 1 || self.weapon.kept > self.weapon.rolled {
            return Err(ConfigurationError::InvalidWeapon {
                character: name.to_string(),
                rolled: self.weapon.rolled,
                kept: self.weapon.kept,
            });
        }
        Ok(())
    }
}

/// Immutable combat profile: build data with school rank effects applied.
#[derive(Debug, Clone)]
pub struct Character {
    name: String,
    rings: Rings,
    skills: BTreeMap<Skill, u8>,
    school: Option<SchoolMembership>,
    extra_rolled: BTreeMap<RollKind, i32>,
    free_raises: BTreeMap<RollKind, i32>,
    advantages: Vec<Advantage>,
    disadvantages: Vec<Disadvantage>,
    weapon: Weapon,
    strategies: StrategySet,
}

impl Character {
    /// Validate `build` and derive its combat profile.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when the build is out of range.
    pub fn from_build(build: &CharacterBuild, name: String) -> Result<Self, ConfigurationError> {
        build.validate(&name)?;
        let mut rings = build.rings;
        let mut extra_rolled = BTreeMap::new();
        let mut free_raises = BTreeMap::new();
        if let Some(membership) = build.school {
            let data = membership.school.data();
            if membership.dan >= 1 {
                for kind in data.first_dan {
                    *extra_rolled.entry(kind).or_insert(0) += 1;
                }
            }
            if membership.dan >= 2 {
                *free_raises.entry(data.second_dan).or_insert(0) += 1;
            }
            if membership.dan >= 4 {
                let raised = rings.get(data.ring).saturating_add(1).min(MAX_SCHOOL_RING);
                rings.set(data.ring, raised);
            }
        }
        if build.advantages.contains(&Advantage::StrengthOfTheEarth) {
            *free_raises.entry(RollKind::WoundCheck).or_insert(0) += 1;
        }
        Ok(Self {
            name,
            rings,
            skills: build.skills.clone(),
            school: build.school,
            extra_rolled,
            free_raises,
            advantages: build.advantages.clone(),
            disadvantages: build.disadvantages.clone(),
            weapon: build.weapon,
            strategies: StrategySet::from_bindings(&build.strategies),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn rings(&self) -> &Rings {
        &self.rings
    }

    #[must_use]
    pub const fn ring(&self, ring: Ring) -> u8 {
        self.rings.get(ring)
    }

    /// Rank in `skill`; untrained skills are rank 0.
    #[must_use]
    pub fn skill(&self, skill: Skill) -> u8 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    #[must_use]
    pub const fn school(&self) -> Option<SchoolMembership> {
        self.school
    }

    #[must_use]
    pub fn extra_rolled(&self, kind: RollKind) -> i32 {
        self.extra_rolled.get(&kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn free_raises(&self, kind: RollKind) -> i32 {
        self.free_raises.get(&kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_advantage(&self, advantage: Advantage) -> bool {
        self.advantages.contains(&advantage)
    }

    #[must_use]
    pub fn has_disadvantage(&self, disadvantage: Disadvantage) -> bool {
        self.disadvantages.contains(&disadvantage)
    }

    #[must_use]
    pub const fn weapon(&self) -> Weapon {
        self.weapon
    }

    #[must_use]
    pub const fn strategies(&self) -> &StrategySet {
        &self.strategies
    }

    /// Swap in hand-built policies, e.g. a custom implementation of one role.
    #[must_use]
    pub fn with_strategy_set(mut self, strategies: StrategySet) -> Self {
        self.strategies = strategies;
        self
    }

    /// Serious wounds that take this character out of the fight.
    #[must_use]
    pub fn max_sw(&self) -> i32 {
        let mut max = SW_PER_EARTH * i32::from(self.rings.earth);
        if self.has_advantage(Advantage::GreatDestiny) {
            max += 1;
        }
        if self.has_disadvantage(Disadvantage::PermanentWound) {
            max -= 1;
        }
        max.max(1)
    }

    /// Void points available at the start of combat.
    #[must_use]
    pub fn max_vp(&self) -> u32 {
        u32::from(self.rings.lowest()) + u32::from(self.skill(Skill::Worldliness))
    }

    #[must_use]
    pub fn max_vp_per_roll(&self) -> u32 {
        u32::from(self.rings.lowest())
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
