// Randomness for producers: a seeded RNG plus weighted choice.
//
// The whole engine draws from one `Rand`, threaded mutably through every
// producer call, so a run is reproducible from its seed. Weighted choice
// over `(item, weight)` tables is the sampling primitive probability tables
// are written for; weights are relative, not normalized.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct Rand {
    rng: StdRng,
}

impl Rand {
    /// Deterministic generator from a seed.
    pub fn seeded(seed: u64) -> Self {
        Rand { rng: StdRng::seed_from_u64(seed) }
    }

    /// OS-entropy generator for non-reproducible runs.
    pub fn from_entropy() -> Self {
        Rand { rng: StdRng::from_os_rng() }
    }

    /// Uniform float in [0, 1).
    pub fn f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Uniform integer in [0, n).
    pub fn below(&mut self, n: usize) -> usize {
        self.rng.random_range(0..n)
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform choice from a slice. Panics on an empty slice, like indexing.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len())]
    }

    /// Weighted choice from `(item, weight)` pairs. Zero-total tables fall
    /// back to the first entry. Returns `None` only for an empty table.
    pub fn weighted<'a, T>(&mut self, table: &'a [(T, f64)]) -> Option<&'a T> {
        if table.is_empty() {
            return None;
        }
        let total: f64 = table.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Some(&table[0].0);
        }
        let target = self.f64() * total;
        let mut cumulative = 0.0;
        for (item, weight) in table {
            cumulative += weight;
            if cumulative > target {
                return Some(item);
            }
        }
        table.last().map(|(item, _)| item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = Rand::seeded(7);
        let mut b = Rand::seeded(7);
        for _ in 0..16 {
            assert_eq!(a.below(1000), b.below(1000));
        }
    }

    #[test]
    fn test_weighted_respects_zero_weights() {
        let mut r = Rand::seeded(1);
        let table = [("never", 0.0), ("always", 1.0)];
        for _ in 0..64 {
            assert_eq!(*r.weighted(&table).unwrap(), "always");
        }
    }

    #[test]
    fn test_weighted_empty_table() {
        let mut r = Rand::seeded(1);
        let table: [(u8, f64); 0] = [];
        assert!(r.weighted(&table).is_none());
    }
}
