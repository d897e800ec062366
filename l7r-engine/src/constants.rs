//! Centralized ruleset and tuning constants for the L7R combat engine.
//!
//! These values define the deterministic math of roll resolution and the
//! thresholds the default decision policies use. Keeping them together makes
//! every ruleset adjustment a reviewed code change.

// Dice ---------------------------------------------------------------------
pub(crate) const DIE_FACES: u32 = 10;
pub(crate) const MAX_DICE: i32 = 10;
/// Re-rolls allowed after a first 10. A real d10 ends the chain long before
/// this (p = 10^-64); the cap keeps a source that only yields 10s, such as a
/// scripted test source, from looping forever.
pub(crate) const EXPLOSION_CHAIN_LIMIT: u32 = 64;
pub(crate) const RAISE: i32 = 5;
pub(crate) const UNSKILLED_ADVANCED_PENALTY: i32 = 10;

// Target numbers -----------------------------------------------------------
pub(crate) const TN_BASE: i32 = 5;
pub(crate) const TN_PER_PARRY_RANK: i32 = 10;
pub(crate) const DOUBLE_ATTACK_TN_OFFSET: i32 = 20;
pub(crate) const PARRY_FOR_ALLY_PENALTY: i32 = 10;
/// Drop in the lunger's own TN to be hit, until the round ends.
pub(crate) const LUNGE_TN_PENALTY: i32 = 5;

// Damage -------------------------------------------------------------------
pub(crate) const DOUBLE_ATTACK_DIRECT_SW: i32 = 1;
pub(crate) const DICE_PER_FAILED_PARRY: i32 = 2;
pub(crate) const MAX_COUNTED_FAILED_PARRIES: i32 = 2;
pub(crate) const LUNGE_EXTRA_DAMAGE_DICE: i32 = 1;
pub(crate) const WOUND_CHECK_STEP: i32 = 10;
pub(crate) const WOUND_CHECK_THRESHOLD: i32 = 0;

// Wounds and void ----------------------------------------------------------
pub(crate) const SW_PER_EARTH: i32 = 2;
pub(crate) const FEINT_TEMPORARY_VOID: u32 = 1;

// Scheduler ----------------------------------------------------------------
pub(crate) const FIRST_PHASE: u8 = 1;
pub(crate) const LAST_PHASE: u8 = 10;
/// Rounds simulated before a trial is declared a tie.
pub const DEFAULT_MAX_ROUNDS: u32 = 100;
/// Action dice spent to parry outside of the current phase.
pub const DEFAULT_INTERRUPT_COST: usize = 2;
pub const MAX_TRIALS: u32 = 1_000_000;

// Roll odds ----------------------------------------------------------------
/// Samples drawn per dice pool when estimating roll odds.
pub const DEFAULT_ODDS_SAMPLES: usize = 2_000;
pub(crate) const ODDS_STREAM_TAG: &[u8] = b"odds";

// Policy thresholds --------------------------------------------------------
pub(crate) const DOUBLE_ATTACK_THRESHOLD: f64 = 0.6;
pub(crate) const FEINT_THRESHOLD: f64 = 0.7;
pub(crate) const ATTACK_THRESHOLD: f64 = 0.7;
pub(crate) const DESPERATE_ATTACK_THRESHOLD: f64 = 0.01;
pub(crate) const DAMAGE_KEPT_CEILING: i32 = 6;
pub(crate) const PARRY_SW_THRESHOLD: i32 = 2;
pub(crate) const KEEP_LW_SW_LIMIT: i32 = 2;
pub(crate) const WOUND_CHECK_THRESHOLD_P: f64 = 0.6;
pub(crate) const FALLBACK_DAMAGE_ROLLED: i32 = 7;
pub(crate) const FALLBACK_DAMAGE_KEPT: i32 = 2;
