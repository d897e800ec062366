//! Scenario loading: built-in match-ups and JSON scenario files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use l7r_engine::character::{CharacterBuild, Ring, Rings, Skill};
use l7r_engine::group::{Group, Side};
use l7r_engine::schools::SchoolId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("unknown scenario {name:?}: not a built-in ({known}) and no such file")]
    Unknown { name: String, known: String },
}

/// A named pair of groups ready to become a roster.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    control: GroupFile,
    test: GroupFile,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupFile {
    name: String,
    characters: Vec<CharacterEntry>,
}

/// A character given inline, or a path to a character file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CharacterEntry {
    Path(PathBuf),
    Inline(Box<CharacterBuild>),
}

struct Builtin {
    key: &'static str,
    description: &'static str,
    build: fn() -> Vec<Group>,
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        key: "mirror",
        description: "Two identical duelists (attack 3, parry 2, rings 3)",
        build: mirror,
    },
    Builtin {
        key: "mismatch",
        description: "Attack 2/parry 2 novice against an attack 4/parry 5 veteran",
        build: mismatch,
    },
    Builtin {
        key: "akodo",
        description: "Akodo Bushi 2nd dan against a plain duelist",
        build: akodo,
    },
];

pub fn list_scenarios() -> impl Iterator<Item = (&'static str, &'static str)> {
    BUILTINS
        .iter()
        .map(|builtin| (builtin.key, builtin.description))
}

/// Resolve `arg` as a built-in scenario key, or else as a scenario file path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a referenced
/// character file cannot be loaded.
pub fn load_scenario(arg: &str) -> Result<Scenario> {
    if let Some(builtin) = BUILTINS.iter().find(|builtin| builtin.key == arg) {
        info!("Loaded built-in scenario {}", builtin.key);
        return Ok(Scenario {
            name: builtin.key.to_string(),
            groups: (builtin.build)(),
        });
    }
    let path = Path::new(arg);
    if !path.exists() {
        let known: Vec<&str> = BUILTINS.iter().map(|builtin| builtin.key).collect();
        return Err(ScenarioError::Unknown {
            name: arg.to_string(),
            known: known.join(", "),
        }
        .into());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    let file: ScenarioFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse scenario {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let control = resolve_group(file.control, Side::Control, base)?;
    let test = resolve_group(file.test, Side::Test, base)?;
    let name = path
        .file_stem()
        .map_or_else(|| arg.to_string(), |stem| stem.to_string_lossy().into_owned());
    info!(
        "Loaded scenario {name} from {} ({} vs {})",
        path.display(),
        control.characters.len(),
        test.characters.len()
    );
    Ok(Scenario {
        name,
        groups: vec![control, test],
    })
}

fn resolve_group(group: GroupFile, side: Side, base: &Path) -> Result<Group> {
    let characters = group
        .characters
        .into_iter()
        .map(|entry| match entry {
            CharacterEntry::Inline(build) => Ok(*build),
            CharacterEntry::Path(relative) => load_character(&base.join(relative)),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Group::new(group.name, side, characters))
}

/// Read one character definition file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid character.
pub fn load_character(path: &Path) -> Result<CharacterBuild> {
    debug!("Reading character {}", path.display());
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read character {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse character {}", path.display()))
}

fn duelist(name: &str, rings: Rings, attack: u8, parry: u8) -> CharacterBuild {
    CharacterBuild::new(name, rings)
        .with_skill(Skill::Attack, attack)
        .with_skill(Skill::Parry, parry)
}

fn duel(control: CharacterBuild, test: CharacterBuild) -> Vec<Group> {
    vec![
        Group::new("control", Side::Control, vec![control]),
        Group::new("test", Side::Test, vec![test]),
    ]
}

fn mirror() -> Vec<Group> {
    duel(
        duelist("Kenji", Rings::uniform(3), 3, 2),
        duelist("Aiko", Rings::uniform(3), 3, 2),
    )
}

fn mismatch() -> Vec<Group> {
    let mut veteran = Rings::uniform(3);
    veteran.set(Ring::Fire, 4);
    duel(
        duelist("Hiro", Rings::uniform(2), 2, 2),
        duelist("Matsu", veteran, 4, 5),
    )
}

fn akodo() -> Vec<Group> {
    let akodo = duelist("Akodo Toturi", Rings::uniform(3), 3, 3)
        .with_skill(Skill::DoubleAttack, 2)
        .with_skill(Skill::Feint, 2)
        .with_school(SchoolId::AkodoBushi, 2);
    duel(duelist("Kenji", Rings::uniform(3), 3, 3), akodo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use l7r_engine::group::Roster;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "l7r-sim-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    #[test]
    fn builtins_form_valid_rosters() {
        for (key, _) in list_scenarios() {
            let scenario = load_scenario(key).expect("builtin");
            assert_eq!(scenario.name, key);
            Roster::from_groups(scenario.groups).expect("valid roster");
        }
    }

    #[test]
    fn loads_inline_and_referenced_characters() {
        let dir = temp_dir("scenario");
        fs::write(
            dir.join("aiko.json"),
            r#"{
                "name": "Aiko",
                "rings": {"air": 3, "earth": 3, "fire": 4, "water": 3, "void": 3},
                "skills": {"attack": 3, "parry": 2, "double_attack": 1},
                "school": {"name": "bayushi_bushi", "dan": 1},
                "strategies": {"parry": "never"}
            }"#,
        )
        .expect("write character");
        let scenario_path = dir.join("duel.json");
        fs::write(
            &scenario_path,
            r#"{
                "control": {"name": "crane", "characters": [
                    {"rings": {"air": 3, "earth": 3, "fire": 3, "water": 3, "void": 3},
                     "skills": {"attack": 2}}
                ]},
                "test": {"name": "scorpion", "characters": ["aiko.json"]}
            }"#,
        )
        .expect("write scenario");

        let scenario = load_scenario(scenario_path.to_str().expect("utf-8 path")).expect("load");
        assert_eq!(scenario.name, "duel");
        assert_eq!(scenario.groups[0].name, "crane");
        assert_eq!(scenario.groups[0].characters[0].name, None);
        let aiko = &scenario.groups[1].characters[0];
        assert_eq!(aiko.name.as_deref(), Some("Aiko"));
        assert_eq!(aiko.rings.fire, 4);
        assert_eq!(aiko.skills.get(&Skill::DoubleAttack), Some(&1));
        assert_eq!(aiko.school.map(|school| school.school), Some(SchoolId::BayushiBushi));

        let roster = Roster::from_groups(scenario.groups).expect("valid roster");
        assert_eq!(roster.names(Side::Control), vec!["character-1"]);
    }

    #[test]
    fn unknown_skills_are_rejected() {
        let dir = temp_dir("bad-skill");
        let path = dir.join("bad.json");
        fs::write(
            &path,
            r#"{"rings": {"air": 3, "earth": 3, "fire": 3, "water": 3, "void": 3},
                "skills": {"juggling": 2}}"#,
        )
        .expect("write character");
        assert!(load_character(&path).is_err());
    }

    #[test]
    fn missing_scenarios_report_the_path() {
        let err = load_scenario("no/such/scenario.json").expect_err("missing file");
        assert!(format!("{err:#}").contains("no/such/scenario.json"));
    }

    #[test]
    fn unknown_scenarios_list_the_builtins() {
        let err = load_scenario("mirrorr").expect_err("typo");
        assert_eq!(
            err.downcast_ref::<ScenarioError>(),
            Some(&ScenarioError::Unknown {
                name: "mirrorr".to_string(),
                known: "mirror, mismatch, akodo".to_string(),
            })
        );
        assert!(err.to_string().contains("mirror, mismatch, akodo"));
    }
}
