//! Error taxonomy for the combat engine.

use thiserror::Error;

/// Malformed or out-of-range build data, surfaced before any trial runs.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigurationError {
    #[error("{character}: ring {ring} must be between {min} and {max} (got {value})")]
    RingOutOfRange {
        character: String,
        ring: &'static str,
        min: u8,
        max: u8,
        value: u8,
    },
    #[error("{character}: skill {skill} rank {rank} exceeds {max}")]
    SkillOutOfRange {
        character: String,
        skill: &'static str,
        rank: u8,
        max: u8,
    },
    #[error("{character}: school dan {dan} must be between 1 and 5")]
    DanOutOfRange { character: String, dan: u8 },
    #[error("{character}: weapon {rolled}k{kept} is not a valid dice pool")]
    InvalidWeapon {
        character: String,
        rolled: i32,
        kept: i32,
    },
    #[error("character name {name:?} is used more than once")]
    DuplicateName { name: String },
    #[error("need exactly one control and one test group (got {control} control, {test} test)")]
    GroupRoles { control: usize, test: usize },
    #[error("group {group:?} has no characters")]
    EmptyGroup { group: String },
    #[error("trial count must be between 1 and {max} (got {value})")]
    TrialCount { value: u32, max: u32 },
    #[error("round cap must be at least 1")]
    RoundCap,
    #[error("interrupt cost must be at least 1")]
    InterruptCost,
    #[error("roll odds need at least one sample per pool")]
    OddsSamples,
}

/// A decision policy returned something the resolver cannot act on.
///
/// Never escapes the resolver: the offending decision is replaced by its
/// "no action" default and the trial continues.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StrategyError {
    #[error("{actor} chose target #{target} which is not a living enemy")]
    InvalidTarget { actor: String, target: usize },
    #[error("{actor} chose {form} without the skill to use it")]
    UnusableForm { actor: String, form: &'static str },
    #[error("{actor} wants to spend {requested} VP but may spend at most {available}")]
    VoidOverspend {
        actor: String,
        requested: u32,
        available: u32,
    },
    #[error("{actor} has no action dice to spend")]
    NoActionDice { actor: String },
    #[error("{actor} was offered no candidate targets")]
    NoCandidates { actor: String },
}

/// Engine bug detected at runtime; always fatal to the run.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum InvariantViolation {
    #[error("{character} would have negative light wounds ({value})")]
    NegativeLightWounds { character: String, value: i32 },
    #[error("{character} was killed twice")]
    DoubleDeath { character: String },
    #[error("{character} spent {requested} VP with only {available} available")]
    VoidOverspent {
        character: String,
        requested: u32,
        available: u32,
    },
    #[error("{character} holds action die {value} outside 1..=10")]
    ActionDieOutOfRange { character: String, value: u8 },
    #[error("{character} acted while out of the fight")]
    ActedWhileDown { character: String },
}

/// Errors that abort a simulation run.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
