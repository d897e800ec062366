//! Seeded random streams and the die-source seam used by every roll.
//!
//! Each trial owns one stream derived from the run's base seed and its trial
//! index, so trials never share randomness and a run can be replayed (or split
//! across workers) without changing any outcome.

use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sha2::Sha256;
use std::collections::VecDeque;

use crate::constants::DIE_FACES;

/// Uniform source of ten-sided die faces.
pub trait DieSource {
    /// Draw one face in `1..=10`.
    fn roll_die(&mut self) -> u32;
}

/// Random stream wrapper that counts how many draws were taken from it.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

/// The stream type handed to every trial.
pub type TrialRng = CountingRng<SmallRng>;

impl CountingRng<SmallRng> {
    #[must_use]
    pub fn from_seed_u64(seed: u64) -> Self {
        Self::wrap(SmallRng::seed_from_u64(seed))
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    #[must_use]
    pub const fn wrap(rng: R) -> Self {
        Self { rng, draws: 0 }
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

impl<R: rand::RngCore> DieSource for CountingRng<R> {
    fn roll_die(&mut self) -> u32 {
        self.gen_range(1..=DIE_FACES)
    }
}

/// Die source replaying a fixed script of faces, then a fallback face forever.
///
/// Used to force exact outcomes such as explosion chains or failed checks.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    faces: VecDeque<u32>,
    fallback: u32,
    draws: usize,
}

impl ScriptedDice {
    #[must_use]
    pub fn new(faces: &[u32], fallback: u32) -> Self {
        Self {
            faces: faces.iter().map(|face| (*face).clamp(1, DIE_FACES)).collect(),
            fallback: fallback.clamp(1, DIE_FACES),
            draws: 0,
        }
    }

    #[must_use]
    pub fn constant(face: u32) -> Self {
        Self::new(&[], face)
    }

    #[must_use]
    pub const fn draws(&self) -> usize {
        self.draws
    }
}

impl DieSource for ScriptedDice {
    fn roll_die(&mut self) -> u32 {
        self.draws += 1;
        self.faces.pop_front().unwrap_or(self.fallback)
    }
}

/// Derive an independent 64-bit seed for a named stream.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Stream for trial `index` of a run seeded with `base_seed`.
#[must_use]
pub fn trial_stream(base_seed: u64, index: u32) -> TrialRng {
    let tag = format!("trial:{index}");
    CountingRng::from_seed_u64(derive_stream_seed(base_seed, tag.as_bytes()))
}
