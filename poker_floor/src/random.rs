//! Pluggable randomness for seat draws and shuffles.

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{collections::VecDeque, sync::Mutex};

/// Source of uniform indices
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..bound`. `bound` is never zero.
    fn index(&self, bound: usize) -> usize;
}

/// Fisher-Yates shuffle driven by `rng`
pub fn shuffle<T>(rng: &dyn RandomSource, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.index(i + 1);
        items.swap(i, j);
    }
}

/// Pick one element uniformly, `None` on an empty slice
pub fn pick<'a, T>(rng: &dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.index(items.len()))
}

/// Thread-local OS-seeded generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index(&self, bound: usize) -> usize {
        rand::rng().random_range(0..bound)
    }
}

/// Reproducible generator for replays and benchmarks
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index(&self, bound: usize) -> usize {
        match self.rng.lock() {
            Ok(mut rng) => rng.random_range(0..bound),
            Err(poisoned) => poisoned.into_inner().random_range(0..bound),
        }
    }
}

/// Replays a fixed list of draws, then counts upward.
///
/// Values are reduced modulo `bound`. The trailing counter keeps rejection
/// sampling loops terminating once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    state: Mutex<(VecDeque<usize>, usize)>,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = usize>) -> Self {
        Self {
            state: Mutex::new((draws.into_iter().collect(), 0)),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn index(&self, bound: usize) -> usize {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (script, counter) = &mut *guard;
        match script.pop_front() {
            Some(value) => value % bound,
            None => {
                let value = *counter % bound;
                *counter += 1;
                value
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuffle_is_permutation() {
        let rng = ThreadRandom;
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&rng, &mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let xs: Vec<usize> = (0..20).map(|_| a.index(1000)).collect();
        let ys: Vec<usize> = (0..20).map(|_| b.index(1000)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_scripted_replays_then_counts() {
        let rng = ScriptedRandom::new([7, 1]);
        assert_eq!(rng.index(5), 2);
        assert_eq!(rng.index(5), 1);
        assert_eq!(rng.index(3), 0);
        assert_eq!(rng.index(3), 1);
        assert_eq!(rng.index(3), 2);
        assert_eq!(rng.index(3), 0);
    }

    #[test]
    fn test_pick_empty() {
        let rng = ThreadRandom;
        let empty: [u8; 0] = [];
        assert!(pick(&rng, &empty).is_none());
        assert_eq!(pick(&rng, &[9]), Some(&9));
    }

    #[test]
    fn test_scripted_shuffle_identity() {
        // Draw i at step i keeps every element in place
        let rng = ScriptedRandom::new([3, 2, 1]);
        let mut items = vec!['a', 'b', 'c', 'd'];
        shuffle(&rng, &mut items);
        assert_eq!(items, vec!['a', 'b', 'c', 'd']);
    }
}
