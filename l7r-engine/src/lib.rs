//! L7R Combat Engine
//!
//! Platform-agnostic combat resolution for the L7R roll-and-keep ruleset.
//! This crate provides dice arithmetic, character state, the pluggable
//! decision policies, the phase scheduler and action resolver, and a Monte
//! Carlo trial runner, without any I/O or presentation concerns.

pub mod character;
pub mod combat;
pub mod constants;
pub mod dice;
pub mod error;
pub mod group;
pub mod modifiers;
pub mod numbers;
pub mod odds;
pub mod rng;
pub mod schools;
pub mod simulation;
pub mod strategy;
pub mod summary;
pub mod trial;

// Re-export commonly used types
pub use character::{
    Advantage, Character, CharacterBuild, CombatTally, Combatant, Disadvantage, Fighter, Ring,
    Rings, RollKind, Skill, Weapon,
};
pub use combat::{Battle, CombatEnd, CombatRules};
pub use dice::{Roll, RollParams, roll, roll_die, roll_initiative, roll_with};
pub use error::{ConfigurationError, EngineError, InvariantViolation, StrategyError};
pub use group::{CombatantId, Group, Roster, Side};
pub use modifiers::{Expiry, Modifier, ModifierEffect, ModifierList, ModifierScope};
pub use odds::RollOdds;
pub use rng::{CountingRng, DieSource, ScriptedDice, TrialRng, derive_stream_seed, trial_stream};
pub use schools::{
    HookEffect, HookEffects, HookEvent, HookFn, HookPoint, SchoolHooks, SchoolId, SchoolMembership,
};
pub use simulation::{SimulationConfig, SimulationReport, run_simulation, run_simulation_with};
pub use strategy::{
    ActionPolicy, ActionStrategy, AttackForm, AttackPlan, AttackPolicy, AttackStrategy,
    DecisionContext, IncomingAttack, LightWoundsPolicy, LightWoundsStrategy, ParryPolicy,
    ParryStrategy, StrategyBindings, StrategySet, WoundCheckPolicy, WoundCheckStrategy,
};
pub use summary::{FeatureSummary, RunningStats, SimulationSummary, summarize};
pub use trial::{CharacterRecord, SideFeatures, TrialOutcome, precedence_for, run_trial};
