//! # Random Sources
//!
//! Every roll in the economy goes through [`RandomSource`], so outcomes are
//! reproducible: [`SeededRandom`] for play and simulation, [`ScriptedRandom`]
//! for tests that need exact draws.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// Source of the two kinds of draws the resolvers make.
pub trait RandomSource {
    /// Uniform integer in `[min, max]`, both ends inclusive.
    fn uniform_int(&mut self, min: u32, max: u32) -> u32;

    /// Uniform real in the closed interval `[0, 100]`.
    fn uniform_percent(&mut self) -> f32;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn uniform_int(&mut self, min: u32, max: u32) -> u32 {
        (**self).uniform_int(min, max)
    }

    fn uniform_percent(&mut self) -> f32 {
        (**self).uniform_percent()
    }
}

/// ChaCha8-backed source. Same seed, same sequence, on every platform.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Creates a source from a 64-bit seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform_int(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    fn uniform_percent(&mut self) -> f32 {
        self.rng.gen_range(0.0f32..=100.0)
    }
}

/// Replays queued values in order.
///
/// Integers are clamped into the requested range. An exhausted integer queue
/// yields `min`; an exhausted percent queue yields `100.0`, which only passes
/// a gate configured at 100%.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRandom {
    ints: VecDeque<u32>,
    percents: VecDeque<f32>,
}

impl ScriptedRandom {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends integer draws.
    #[must_use]
    pub fn with_ints(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        self.ints.extend(values);
        self
    }

    /// Appends percent draws.
    #[must_use]
    pub fn with_percents(mut self, values: impl IntoIterator<Item = f32>) -> Self {
        self.percents.extend(values);
        self
    }

    /// Queues one integer draw.
    pub fn push_int(&mut self, value: u32) {
        self.ints.push_back(value);
    }

    /// Queues one percent draw.
    pub fn push_percent(&mut self, value: f32) {
        self.percents.push_back(value);
    }

    /// Number of unconsumed `(int, percent)` draws.
    #[must_use]
    pub fn remaining(&self) -> (usize, usize) {
        (self.ints.len(), self.percents.len())
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform_int(&mut self, min: u32, max: u32) -> u32 {
        self.ints.pop_front().map_or(min, |v| v.clamp(min, max.max(min)))
    }

    fn uniform_percent(&mut self) -> f32 {
        self.percents
            .pop_front()
            .map_or(100.0, |v| v.clamp(0.0, 100.0))
    }
}
