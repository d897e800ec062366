//! Control and test groups, and the validated roster a simulation runs on.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::character::{Character, CharacterBuild};
use crate::error::ConfigurationError;
use crate::strategy::StrategySet;

/// Which group a character fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Control,
    Test,
}

impl Side {
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Control => Self::Test,
            Self::Test => Self::Control,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Index of a character in declaration order (control group first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(pub usize);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub side: Side,
    pub characters: Vec<CharacterBuild>,
}

impl Group {
    #[must_use]
    pub fn new(name: impl Into<String>, side: Side, characters: Vec<CharacterBuild>) -> Self {
        Self {
            name: name.into(),
            side,
            characters,
        }
    }
}

/// Validated characters of both groups, shared read-only by every trial.
#[derive(Debug, Clone)]
pub struct Roster {
    characters: Vec<Character>,
    sides: Vec<Side>,
    group_names: [String; 2],
}

impl Roster {
    /// Build a roster from exactly one control and one test group.
    ///
    /// Unnamed characters receive a generated `character-N` name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for wrong group roles, empty groups,
    /// duplicate names, or invalid builds.
    pub fn from_groups(groups: Vec<Group>) -> Result<Self, ConfigurationError> {
        let control = groups.iter().filter(|g| g.side == Side::Control).count();
        let test = groups.len() - control;
        if control != 1 || test != 1 {
            return Err(ConfigurationError::GroupRoles { control, test });
        }
        let mut ordered = groups;
        ordered.sort_by_key(|group| group.side);

        let mut characters = Vec::new();
        let mut sides = Vec::new();
        let mut names = BTreeSet::new();
        for group in &ordered {
            if group.characters.is_empty() {
                return Err(ConfigurationError::EmptyGroup {
                    group: group.name.clone(),
                });
            }
            for build in &group.characters {
                let name = build
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("character-{}", characters.len() + 1));
                if !names.insert(name.clone()) {
                    return Err(ConfigurationError::DuplicateName { name });
                }
                characters.push(Character::from_build(build, name)?);
                sides.push(group.side);
            }
        }
        let group_names = [ordered[0].name.clone(), ordered[1].name.clone()];
        Ok(Self {
            characters,
            sides,
            group_names,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    #[must_use]
    pub fn character(&self, id: CombatantId) -> &Character {
        &self.characters[id.0]
    }

    /// Replace one character's policies with hand-built ones.
    pub fn set_strategies(&mut self, id: CombatantId, strategies: StrategySet) {
        if let Some(slot) = self.characters.get_mut(id.0) {
            *slot = slot.clone().with_strategy_set(strategies);
        }
    }

    #[must_use]
    pub fn side(&self, id: CombatantId) -> Side {
        self.sides[id.0]
    }

    #[must_use]
    pub fn group_name(&self, side: Side) -> &str {
        match side {
            Side::Control => &self.group_names[0],
            Side::Test => &self.group_names[1],
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = CombatantId> + '_ {
        (0..self.characters.len()).map(CombatantId)
    }

    /// Names of the characters on `side`, in declaration order.
    #[must_use]
    pub fn names(&self, side: Side) -> Vec<&str> {
        self.ids()
            .filter(|id| self.side(*id) == side)
            .map(|id| self.character(id).name())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Rings;

    fn build(name: Option<&str>) -> CharacterBuild {
        let mut build = CharacterBuild::new("x", Rings::uniform(3));
        build.name = name.map(str::to_string);
        build
    }

    #[test]
    fn control_characters_come_first() {
        let roster = Roster::from_groups(vec![
            Group::new("challengers", Side::Test, vec![build(Some("Aiko"))]),
            Group::new("defenders", Side::Control, vec![build(Some("Kenji"))]),
        ])
        .expect("valid roster");
        assert_eq!(roster.character(CombatantId(0)).name(), "Kenji");
        assert_eq!(roster.side(CombatantId(1)), Side::Test);
        assert_eq!(roster.group_name(Side::Test), "challengers");
        assert_eq!(roster.names(Side::Control), vec!["Kenji"]);
    }

    #[test]
    fn unnamed_characters_get_generated_names() {
        let roster = Roster::from_groups(vec![
            Group::new("a", Side::Control, vec![build(None), build(None)]),
            Group::new("b", Side::Test, vec![build(None)]),
        ])
        .expect("valid roster");
        assert_eq!(roster.names(Side::Control), vec!["character-1", "character-2"]);
        assert_eq!(roster.names(Side::Test), vec!["character-3"]);
    }

    #[test]
    fn rejects_duplicate_names_and_bad_roles() {
        let duplicate = Roster::from_groups(vec![
            Group::new("a", Side::Control, vec![build(Some("Kenji"))]),
            Group::new("b", Side::Test, vec![build(Some("Kenji"))]),
        ]);
        assert!(matches!(
            duplicate,
            Err(ConfigurationError::DuplicateName { .. })
        ));
        let two_controls = Roster::from_groups(vec![
            Group::new("a", Side::Control, vec![build(Some("A"))]),
            Group::new("b", Side::Control, vec![build(Some("B"))]),
        ]);
        assert_eq!(
            two_controls.unwrap_err(),
            ConfigurationError::GroupRoles {
                control: 2,
                test: 0
            }
        );
        let empty = Roster::from_groups(vec![
            Group::new("a", Side::Control, vec![]),
            Group::new("b", Side::Test, vec![build(Some("B"))]),
        ]);
        assert!(matches!(empty, Err(ConfigurationError::EmptyGroup { .. })));
    }
}
