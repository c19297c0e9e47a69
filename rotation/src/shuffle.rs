//! Seeded Fisher-Yates shuffle.
//!
//! The same `(items, seed)` pair always yields the same order, on every
//! host and every run. The generator is not cryptographic; the seeds fed to
//! it are already derived from a secret.

/// Folds a seed string into a 32-bit accumulator (`h = h * 31 + c`).
pub fn seed_hash(seed: &str) -> u32 {
    seed.chars().fold(0u32, |h, c| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as u32)
    })
}

/// Linear congruential generator producing fractions in `[0, 1)`.
struct Lcg {
    state: u32,
}

impl Lcg {
    const MULTIPLIER: u32 = 1_103_515_245;
    const INCREMENT: u32 = 12_345;

    fn new(seed: &str) -> Self {
        Lcg {
            state: seed_hash(seed),
        }
    }

    fn next_fraction(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        // The low bits of a power-of-two LCG are weak, keep the top 31.
        f64::from(self.state >> 1) / f64::from(1u32 << 31)
    }

    /// Uniform index in `[0, upper]`.
    fn next_index(&mut self, upper: usize) -> usize {
        let index = (self.next_fraction() * (upper + 1) as f64) as usize;
        index.min(upper)
    }
}

/// Returns a new vector holding `items` in a seed-determined order.
/// The input slice is left untouched.
pub fn shuffle<T: Clone>(items: &[T], seed: &str) -> Vec<T> {
    let mut out = items.to_vec();
    if out.len() < 2 {
        return out;
    }

    let mut rng = Lcg::new(seed);
    for i in (1..out.len()).rev() {
        let j = rng.next_index(i);
        out.swap(i, j);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted<T: Ord + Clone>(items: &[T]) -> Vec<T> {
        let mut v = items.to_vec();
        v.sort();
        v
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let items: Vec<u32> = (0..50).collect();
        for seed in ["", "a", "stable", "c0ffee", "campaign-42:2026-10-16"] {
            let out = shuffle(&items, seed);
            assert_eq!(out.len(), items.len());
            assert_eq!(sorted(&out), items);
        }

        // Duplicates keep their multiplicity.
        let items = vec!["a", "a", "b", "c", "c", "c"];
        assert_eq!(sorted(&shuffle(&items, "seed")), sorted(&items));
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        let items: Vec<&str> = vec!["A", "B", "C", "D", "E", "F", "G"];
        let first = shuffle(&items, "deadbeef");
        for _ in 0..10 {
            assert_eq!(shuffle(&items, "deadbeef"), first);
        }
    }

    #[test]
    fn test_distinct_seeds_give_distinct_orders() {
        let items: Vec<u32> = (0..10).collect();
        let pairs = [
            ("seed-1", "seed-2"),
            ("abc", "abd"),
            ("stable", "Stable"),
            ("2026-10-16", "2026-10-17"),
        ];
        for (a, b) in pairs {
            assert_ne!(shuffle(&items, a), shuffle(&items, b), "{a} vs {b}");
        }
    }

    #[test]
    fn test_short_inputs_are_copied() {
        let empty: Vec<u8> = vec![];
        assert!(shuffle(&empty, "x").is_empty());
        assert_eq!(shuffle(&[7], "x"), vec![7]);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let items = vec![1, 2, 3, 4, 5, 6];
        let _ = shuffle(&items, "anything");
        assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_seed_hash_folds_every_character() {
        assert_eq!(seed_hash(""), 0);
        assert_eq!(seed_hash("a"), 97);
        assert_eq!(seed_hash("ab"), 97 * 31 + 98);
        assert_ne!(seed_hash("ab"), seed_hash("ba"));
    }
}
