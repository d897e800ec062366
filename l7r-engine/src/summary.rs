//! Aggregation of trial outcomes into win rates and conditional feature means.

use serde::{Deserialize, Serialize};

use crate::group::Side;
use crate::numbers::count_ratio;
use crate::trial::TrialOutcome;

/// Streaming mean and variance (Welford).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let count = f64::from(self.count);
        let delta = value - self.mean;
        self.mean += delta / count;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / f64::from(self.count - 1)
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// One feature's statistics under the three conditioning regimes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub name: String,
    pub overall: RunningStats,
    pub given_test_victory: RunningStats,
    pub given_control_victory: RunningStats,
}

impl FeatureSummary {
    fn new(name: String) -> Self {
        Self {
            name,
            overall: RunningStats::default(),
            given_test_victory: RunningStats::default(),
            given_control_victory: RunningStats::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub trials: u32,
    pub control_wins: u32,
    pub test_wins: u32,
    pub ties: u32,
    pub control_win_rate: f64,
    pub test_win_rate: f64,
    pub tie_rate: f64,
    /// Features in trial-outcome order.
    pub features: Vec<FeatureSummary>,
}

impl SimulationSummary {
    #[must_use]
    pub const fn wins(&self, side: Side) -> u32 {
        match side {
            Side::Control => self.control_wins,
            Side::Test => self.test_wins,
        }
    }

    #[must_use]
    pub const fn win_rate(&self, side: Side) -> f64 {
        match side {
            Side::Control => self.control_win_rate,
            Side::Test => self.test_win_rate,
        }
    }

    /// Test win rate among trials that did not end in a tie.
    #[must_use]
    pub fn decisive_test_win_rate(&self) -> f64 {
        count_ratio(self.test_wins, self.test_wins + self.control_wins)
    }

    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&FeatureSummary> {
        self.features.iter().find(|feature| feature.name == name)
    }
}

#[derive(Debug, Default)]
struct AggregateBuilder {
    trials: u32,
    control_wins: u32,
    test_wins: u32,
    ties: u32,
    features: Vec<FeatureSummary>,
}

impl AggregateBuilder {
    fn ingest(&mut self, outcome: &TrialOutcome) {
        self.trials += 1;
        let winner = outcome.winner();
        match winner {
            Some(Side::Control) => self.control_wins += 1,
            Some(Side::Test) => self.test_wins += 1,
            None => self.ties += 1,
        }
        for (slot, (name, value)) in outcome.features().into_iter().enumerate() {
            if slot == self.features.len() {
                self.features.push(FeatureSummary::new(name));
            }
            let feature = &mut self.features[slot];
            feature.overall.add(value);
            match winner {
                Some(Side::Test) => feature.given_test_victory.add(value),
                Some(Side::Control) => feature.given_control_victory.add(value),
                None => {}
            }
        }
    }

    fn finish(self) -> SimulationSummary {
        SimulationSummary {
            trials: self.trials,
            control_wins: self.control_wins,
            test_wins: self.test_wins,
            ties: self.ties,
            control_win_rate: count_ratio(self.control_wins, self.trials),
            test_win_rate: count_ratio(self.test_wins, self.trials),
            tie_rate: count_ratio(self.ties, self.trials),
            features: self.features,
        }
    }
}

/// Pure reduction over completed outcomes.
#[must_use]
pub fn summarize(outcomes: &[TrialOutcome]) -> SimulationSummary {
    let mut builder = AggregateBuilder::default();
    for outcome in outcomes {
        builder.ingest(outcome);
    }
    builder.finish()
}
