//! Unified RNG abstraction shared by every stochastic operator (creator,
//! mutation, crossover, selection, …).
//!
//! Operators take `&mut impl RandomGenerator` rather than a concrete `rand`
//! type so the production `StdRng`-backed generator and a panicking test
//! stub can both satisfy the trait.

use rand::prelude::IndexedRandom;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};

pub trait RandomGenerator {
    type R: RngCore + Rng;

    fn gen_range_usize(&mut self, min: usize, max: usize) -> usize {
        self.rng().random_range(min..max)
    }

    fn gen_range_f64(&mut self, min: f64, max: f64) -> f64 {
        self.rng().random_range(min..max)
    }

    fn gen_usize(&mut self) -> usize {
        self.rng().random_range(usize::MIN..usize::MAX)
    }

    fn gen_bool(&mut self, p: f64) -> bool {
        self.rng().random_bool(p)
    }

    fn gen_probability(&mut self) -> f64 {
        self.rng().random::<f64>()
    }

    fn shuffle_usize(&mut self, vector: &mut [usize]) {
        vector.shuffle(self.rng())
    }

    fn shuffle_f64(&mut self, vector: &mut [f64]) {
        vector.shuffle(self.rng())
    }

    fn choose_usize<'a>(&mut self, vector: &'a [usize]) -> Option<&'a usize> {
        vector.choose(self.rng())
    }

    /// Mutable handle to the underlying RNG, for operators that need it
    /// directly (e.g. `rand_distr` samplers).
    fn rng(&mut self) -> &mut Self::R;
}

/// Production RNG: `StdRng`, reproducible from a seed.
#[derive(Debug, Clone)]
pub struct EngineRandomGenerator {
    rng: StdRng,
}

impl EngineRandomGenerator {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn new_from_seed(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(|| StdRng::from_rng(&mut rand::rng()), StdRng::seed_from_u64);
        Self { rng }
    }

    /// Derive an independent child generator, for seeding per-worker RNGs
    /// from one top-level generator deterministically.
    pub fn spawn_child(&mut self) -> EngineRandomGenerator {
        let seed = self.rng.random::<u64>();
        EngineRandomGenerator::new_from_seed(Some(seed))
    }
}

impl RandomGenerator for EngineRandomGenerator {
    type R = StdRng;

    fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

/// A stub `RngCore` that panics if ever dereferenced — used by
/// `NoopRandomGenerator` so operator code that never touches randomness can
/// be exercised in tests without seeding a real RNG.
pub struct StubRng;

impl RngCore for StubRng {
    fn next_u32(&mut self) -> u32 {
        unimplemented!("stub RNG should never be dereferenced in this test")
    }

    fn next_u64(&mut self) -> u64 {
        unimplemented!("stub RNG should never be dereferenced in this test")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        unimplemented!("stub RNG should never be dereferenced in this test")
    }
}

#[derive(Default)]
pub struct NoopRandomGenerator {
    stub: StubRng,
}

impl NoopRandomGenerator {
    pub fn new() -> Self {
        Self { stub: StubRng }
    }
}

impl RandomGenerator for NoopRandomGenerator {
    type R = StubRng;

    fn rng(&mut self) -> &mut StubRng {
        &mut self.stub
    }
}
