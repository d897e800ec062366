//! Estimated roll odds consulted by the decision policies.
//!
//! Every normalized pool (up to 10k10, exploding or not) is sampled once from a
//! dedicated stream when the table is built. Lookups then answer "chance to
//! meet a TN" and "mean total" without touching any trial's random stream.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::constants::{MAX_DICE, ODDS_STREAM_TAG};
use crate::dice::{RollParams, roll_with};
use crate::error::ConfigurationError;
use crate::numbers::{i64_to_f64, ratio, usize_to_f64};
use crate::rng::{CountingRng, derive_stream_seed};

type PoolKey = (i32, i32, bool);

/// Sorted sample totals per dice pool.
#[derive(Debug, Clone)]
pub struct RollOdds {
    samples: HashMap<PoolKey, Vec<i32>>,
    per_pool: usize,
}

impl RollOdds {
    /// Sample every pool `per_pool` times from a stream derived from `seed`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::OddsSamples` when `per_pool` is zero.
    pub fn build(per_pool: usize, seed: u64) -> Result<Self, ConfigurationError> {
        if per_pool == 0 {
            return Err(ConfigurationError::OddsSamples);
        }
        let mut rng =
            CountingRng::wrap(ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, ODDS_STREAM_TAG)));
        let mut samples = HashMap::new();
        for explode in [true, false] {
            for rolled in 1..=MAX_DICE {
                for kept in 1..=rolled {
                    let params = RollParams::new(rolled, kept).with_explosion(explode);
                    let mut totals: Vec<i32> = (0..per_pool)
                        .map(|_| roll_with(params, &mut rng).total)
                        .collect();
                    totals.sort_unstable();
                    samples.insert((rolled, kept, explode), totals);
                }
            }
        }
        log::debug!(
            "sampled {} dice pools ({per_pool} each, {} draws)",
            samples.len(),
            rng.draws()
        );
        Ok(Self { samples, per_pool })
    }

    #[must_use]
    pub const fn samples_per_pool(&self) -> usize {
        self.per_pool
    }

    /// Probability that a `rolled`k`kept` roll totals at least `tn`.
    #[must_use]
    pub fn p(&self, tn: i32, rolled: i32, kept: i32, explode: bool) -> f64 {
        self.p_params(tn, RollParams::new(rolled, kept).with_explosion(explode))
    }

    /// Probability that a roll of `params` (modifier included) meets `tn`.
    #[must_use]
    pub fn p_params(&self, tn: i32, params: RollParams) -> f64 {
        let params = params.normalized();
        let needed = tn - params.modifier;
        let Some(totals) = self.pool(params) else {
            return if needed <= 0 { 1.0 } else { 0.0 };
        };
        let below = totals.partition_point(|total| *total < needed);
        ratio(totals.len() - below, totals.len())
    }

    /// Mean total of a `rolled`k`kept` roll.
    #[must_use]
    pub fn mean(&self, rolled: i32, kept: i32, explode: bool) -> f64 {
        self.mean_params(RollParams::new(rolled, kept).with_explosion(explode))
    }

    /// Mean total of a roll of `params`, modifier included.
    #[must_use]
    pub fn mean_params(&self, params: RollParams) -> f64 {
        let params = params.normalized();
        let modifier = f64::from(params.modifier);
        let Some(totals) = self.pool(params) else {
            return modifier;
        };
        let sum: i64 = totals.iter().map(|total| i64::from(*total)).sum();
        i64_to_f64(sum) / usize_to_f64(totals.len()) + modifier
    }

    fn pool(&self, params: RollParams) -> Option<&Vec<i32>> {
        if params.kept == 0 {
            return None;
        }
        self.samples
            .get(&(params.rolled, params.kept, params.explode))
            .filter(|totals| !totals.is_empty())
    }
}
