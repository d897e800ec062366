//! Monte Carlo runs: many independent trials over one roster.

use std::ops::Range;
use std::thread;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::combat::CombatRules;
use crate::constants::{
    DEFAULT_INTERRUPT_COST, DEFAULT_MAX_ROUNDS, DEFAULT_ODDS_SAMPLES, MAX_TRIALS,
};
use crate::error::{ConfigurationError, EngineError};
use crate::group::{Roster, Side};
use crate::odds::RollOdds;
use crate::rng::{DieSource, trial_stream};
use crate::schools::SchoolHooks;
use crate::summary::{SimulationSummary, summarize};
use crate::trial::{TrialOutcome, run_trial};

/// Configuration for a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub trials: u32,
    pub seed: u64,
    pub max_rounds: u32,
    pub interrupt_cost: usize,
    pub odds_samples: usize,
    pub workers: usize,
}

impl SimulationConfig {
    #[must_use]
    pub const fn new(trials: u32, seed: u64) -> Self {
        Self {
            trials,
            seed,
            max_rounds: DEFAULT_MAX_ROUNDS,
            interrupt_cost: DEFAULT_INTERRUPT_COST,
            odds_samples: DEFAULT_ODDS_SAMPLES,
            workers: 1,
        }
    }

    #[must_use]
    pub const fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    #[must_use]
    pub const fn with_interrupt_cost(mut self, interrupt_cost: usize) -> Self {
        self.interrupt_cost = interrupt_cost;
        self
    }

    #[must_use]
    pub const fn with_odds_samples(mut self, odds_samples: usize) -> Self {
        self.odds_samples = odds_samples;
        self
    }

    /// Spread trials over `workers` threads. Outcomes do not depend on it.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// # Errors
    ///
    /// Returns `ConfigurationError` for out-of-range knobs.
    pub const fn validate(&self) -> Result<(), ConfigurationError> {
        if self.trials == 0 || self.trials > MAX_TRIALS {
            return Err(ConfigurationError::TrialCount {
                value: self.trials,
                max: MAX_TRIALS,
            });
        }
        if self.max_rounds == 0 {
            return Err(ConfigurationError::RoundCap);
        }
        if self.interrupt_cost == 0 {
            return Err(ConfigurationError::InterruptCost);
        }
        if self.odds_samples == 0 {
            return Err(ConfigurationError::OddsSamples);
        }
        Ok(())
    }

    #[must_use]
    pub const fn rules(&self) -> CombatRules {
        CombatRules {
            max_rounds: self.max_rounds,
            interrupt_cost: self.interrupt_cost,
        }
    }
}

/// Every outcome of a run, in trial order, plus its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub config: SimulationConfig,
    pub outcomes: Vec<TrialOutcome>,
    pub summary: SimulationSummary,
}

/// Run `config.trials` trials with the standard school hooks, trial `i`
/// drawing from `trial_stream(config.seed, i)`.
///
/// # Errors
///
/// Returns `EngineError` for invalid configuration or an engine invariant violation.
pub fn run_simulation(
    roster: &Roster,
    config: &SimulationConfig,
) -> Result<SimulationReport, EngineError> {
    let hooks = SchoolHooks::standard();
    let seed = config.seed;
    run_simulation_with(roster, config, &hooks, |index| trial_stream(seed, index))
}

/// Run a simulation with custom hooks and a per-trial random source factory.
///
/// `streams(i)` must return the source for trial `i`; distinct indices must
/// yield independent sources for trials to stay uncorrelated.
///
/// # Errors
///
/// Returns `EngineError` for invalid configuration or an engine invariant violation.
pub fn run_simulation_with<S, F>(
    roster: &Roster,
    config: &SimulationConfig,
    hooks: &SchoolHooks,
    streams: F,
) -> Result<SimulationReport, EngineError>
where
    S: DieSource,
    F: Fn(u32) -> S + Sync,
{
    config.validate()?;
    let odds = RollOdds::build(config.odds_samples, config.seed)?;
    info!(
        "running {} trials ({} vs {}) on {} worker(s)",
        config.trials,
        roster.group_name(Side::Control),
        roster.group_name(Side::Test),
        config.workers.max(1)
    );

    let run_range = |range: Range<u32>| -> Result<Vec<TrialOutcome>, EngineError> {
        range
            .map(|index| {
                let mut source = streams(index);
                run_trial(roster, &odds, hooks, config.rules(), index, &mut source)
            })
            .collect()
    };

    let mut outcomes = if config.workers <= 1 {
        run_range(0..config.trials)?
    } else {
        let ranges = split_trials(config.trials, config.workers);
        debug!("trial ranges per worker: {ranges:?}");
        let results: Vec<Result<Vec<TrialOutcome>, EngineError>> = thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .into_iter()
                .map(|range| scope.spawn(|| run_range(range)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });
        let mut outcomes = Vec::new();
        for result in results {
            outcomes.extend(result?);
        }
        outcomes
    };
    outcomes.sort_by_key(|outcome| outcome.index);

    let summary = summarize(&outcomes);
    info!(
        "test win rate {:.3} (control {:.3}, ties {:.3})",
        summary.test_win_rate, summary.control_win_rate, summary.tie_rate
    );
    Ok(SimulationReport {
        config: *config,
        outcomes,
        summary,
    })
}

/// Contiguous, near-equal trial index ranges, one per worker.
fn split_trials(trials: u32, workers: usize) -> Vec<Range<u32>> {
    let workers = u32::try_from(workers).unwrap_or(u32::MAX).clamp(1, trials.max(1));
    let chunk = trials / workers;
    let extra = trials % workers;
    let mut start = 0;
    (0..workers)
        .map(|worker| {
            let len = chunk + u32::from(worker < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}
