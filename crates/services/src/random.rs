//! Injectable randomness for deck shuffling and choice sampling.

use rand::rngs::{StdRng, ThreadRng};
use rand::{RngCore, SeedableRng};

/// Hands out the generator a session draws from.
pub trait RandomSource {
    fn rng(&mut self) -> &mut dyn RngCore;
}

/// Thread-local entropy, for real sessions.
#[derive(Debug, Clone)]
pub struct ThreadRandom(ThreadRng);

impl ThreadRandom {
    #[must_use]
    pub fn new() -> Self {
        Self(rand::rng())
    }
}

impl Default for ThreadRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ThreadRandom {
    fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.0
    }
}

/// Reproducible sequence from a seed.
#[derive(Debug, Clone)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn draw(source: &mut dyn RandomSource) -> Vec<u32> {
        let mut items: Vec<u32> = (0..20).collect();
        items.shuffle(source.rng());
        items
    }

    #[test]
    fn same_seed_same_order() {
        assert_eq!(
            draw(&mut SeededRandom::new(9)),
            draw(&mut SeededRandom::new(9))
        );
    }

    #[test]
    fn thread_source_shuffles_a_permutation() {
        let mut items = draw(&mut ThreadRandom::new());
        items.sort_unstable();
        assert_eq!(items, (0..20).collect::<Vec<_>>());
    }
}
