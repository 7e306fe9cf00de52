use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Injected randomness for a battle.
///
/// Every random draw in the engine goes through here with a short reason,
/// so a seeded run is reproducible and a scripted run can pin exact values
/// in tests.
#[derive(Debug, Clone)]
pub enum BattleRng {
    Seeded(StdRng),
    /// Replays `values` in order, cycling when exhausted. Each value is
    /// reduced modulo the requested bound.
    Scripted { values: Vec<u32>, index: usize },
}

impl BattleRng {
    pub fn from_seed(seed: u64) -> Self {
        BattleRng::Seeded(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        BattleRng::Seeded(StdRng::from_os_rng())
    }

    pub fn new_for_test(values: Vec<u32>) -> Self {
        BattleRng::Scripted { values, index: 0 }
    }

    /// A value in `[0, bound)`. A bound of 0 always yields 0.
    pub fn below(&mut self, bound: u32, reason: &str) -> u32 {
        if bound == 0 {
            return 0;
        }
        let value = match self {
            BattleRng::Seeded(rng) => rng.random_range(0..bound),
            BattleRng::Scripted { values, index } => {
                if values.is_empty() {
                    0
                } else {
                    let raw = values[*index % values.len()];
                    *index += 1;
                    raw % bound
                }
            }
        };
        tracing::trace!(value, bound, reason, "rng consumed");
        value
    }

    /// A random index into a slice of `len` items.
    pub fn pick_index(&mut self, len: usize, reason: &str) -> usize {
        self.below(len.min(u32::MAX as usize) as u32, reason) as usize
    }
}

impl Default for BattleRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
