//! Randomness seam for the simulator.
//!
//! Everything random in a consensus round (roster attributes, weighted draws, fault
//! injection) goes through [`RandomSource`], so a seeded or scripted source makes a
//! run reproducible.

use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

pub trait RandomSource {
    /// Uniform in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform in `low..=high`. `low <= high` is the caller's job.
    fn range_inclusive(&mut self, low: u64, high: u64) -> u64 {
        let span = (high - low) as f64 + 1.0;
        let offset = (self.next_f64() * span) as u64;
        low + offset.min(high - low)
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

impl<R: RngCore> RandomSource for R {
    fn next_f64(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn range_inclusive(&mut self, low: u64, high: u64) -> u64 {
        self.gen_range(low..=high)
    }
}

pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn from_entropy() -> StdRng {
    StdRng::from_entropy()
}

/// Replays a fixed list of draws, cycling when it runs out. An empty script always
/// draws `0.0`.
#[derive(Clone, Debug)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(draws: impl Into<Vec<f64>>) -> Self {
        Self {
            draws: draws.into(),
            cursor: 0,
        }
    }
}

impl RandomSource for ScriptedSource {
    fn next_f64(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }
}
