//! Reservoir sampling with Algorithm L.
//!
//! Draws a uniform, unordered sample of `min(k, N)` elements from a sequence
//! whose length N is not known up front, in O(k) memory and O(N) time.
//! Instead of one random decision per element, the sampler draws the gap to
//! the next replaced index from the exact skip distribution, which needs
//! O(k · log(N/k)) random numbers.

use crate::sequence::Sequence;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Fixed-capacity reservoir fed one element at a time.
#[derive(Debug, Clone)]
pub struct Reservoir<T> {
    slots: Vec<T>,
    capacity: usize,
    seen: usize,
    /// 0-based index of the next element that replaces a slot.
    next_index: usize,
    weight: f64,
}

/// `ln(U)` for `U` uniform in the open interval (0, 1).
#[inline]
fn ln_uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.gen();
        if u > 0.0 {
            return u.ln();
        }
    }
}

impl<T> Reservoir<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            seen: 0,
            next_index: 0,
            weight: 0.0,
        }
    }

    /// Number of elements offered so far.
    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Observe one element.
    pub fn offer<R: Rng + ?Sized>(&mut self, item: T, rng: &mut R) {
        let index = self.seen;
        self.seen += 1;
        if self.capacity == 0 {
            return;
        }

        if self.slots.len() < self.capacity {
            self.slots.push(item);
            if self.slots.len() == self.capacity {
                self.weight = (ln_uniform(rng) / self.capacity as f64).exp();
                self.schedule(index, rng);
            }
            return;
        }

        if index == self.next_index {
            let slot = rng.gen_range(0..self.capacity);
            self.slots[slot] = item;
            self.weight *= (ln_uniform(rng) / self.capacity as f64).exp();
            self.schedule(index, rng);
        }
    }

    /// Pick the next replaced index after `from`.
    fn schedule<R: Rng + ?Sized>(&mut self, from: usize, rng: &mut R) {
        // Once the weight underflows nothing else is replaced.
        let denominator = (1.0 - self.weight).ln();
        let skip = if denominator < 0.0 {
            (ln_uniform(rng) / denominator).floor() as usize
        } else {
            usize::MAX
        };
        self.next_index = from.saturating_add(skip).saturating_add(1);
    }

    /// Finish sampling. The element order is unspecified.
    pub fn into_sample(self) -> Vec<T> {
        self.slots
    }
}

impl<T: Send + 'static> Sequence<T> {
    /// Uniform random sample of `min(k, N)` elements, drained from this
    /// sequence with an entropy-seeded RNG.
    pub fn sample(self, k: usize) -> Vec<T> {
        let mut rng = SmallRng::from_entropy();
        self.sample_with_rng(k, &mut rng)
    }

    /// Uniform random sample using the supplied RNG. A seeded RNG makes the
    /// sample reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use pullseq::Sequence;
    /// use rand::{rngs::SmallRng, SeedableRng};
    ///
    /// let mut rng = SmallRng::seed_from_u64(7);
    /// let picked = Sequence::from_iter(0..10_000).sample_with_rng(5, &mut rng);
    /// assert_eq!(picked.len(), 5);
    /// ```
    pub fn sample_with_rng<R: Rng + ?Sized>(self, k: usize, rng: &mut R) -> Vec<T> {
        let mut reservoir = Reservoir::new(k);
        for item in self {
            reservoir.offer(item, rng);
        }
        reservoir.into_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sample_size_is_min_k_n() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(Sequence::from_iter(0..1000).sample_with_rng(5, &mut rng).len(), 5);
        assert_eq!(Sequence::from_iter(0..3).sample_with_rng(5, &mut rng).len(), 3);
        assert!(Sequence::from_iter(0..3).sample_with_rng(0, &mut rng).is_empty());
        assert!(Sequence::<u32>::empty().sample_with_rng(4, &mut rng).is_empty());
    }

    #[test]
    fn test_sample_elements_are_distinct_members() {
        let mut rng = SmallRng::seed_from_u64(2);
        let picked = Sequence::from_iter(0..500u32).sample_with_rng(20, &mut rng);
        let unique: HashSet<u32> = picked.iter().copied().collect();
        assert_eq!(unique.len(), 20);
        assert!(picked.iter().all(|x| *x < 500));
    }

    #[test]
    fn test_short_input_returns_everything() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut picked = Sequence::from_vec(vec![4, 1, 9]).sample_with_rng(10, &mut rng);
        picked.sort();
        assert_eq!(picked, vec![1, 4, 9]);
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let a = Sequence::from_iter(0..10_000)
            .sample_with_rng(8, &mut SmallRng::seed_from_u64(9));
        let b = Sequence::from_iter(0..10_000)
            .sample_with_rng(8, &mut SmallRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_inclusion_frequency_is_uniform() {
        const K: usize = 5;
        const N: usize = 1000;
        const TRIALS: usize = 10_000;

        let mut rng = SmallRng::seed_from_u64(42);
        let mut hits = vec![0usize; N];
        for _ in 0..TRIALS {
            for x in Sequence::from_iter(0..N).sample_with_rng(K, &mut rng) {
                hits[x] += 1;
            }
        }

        // expected hits per element: TRIALS * K / N = 50
        let expected = (TRIALS * K / N) as f64;
        for (element, &count) in hits.iter().enumerate() {
            let ratio = count as f64 / expected;
            assert!(
                (0.3..=1.9).contains(&ratio),
                "element {} sampled {} times, expected about {}",
                element,
                count,
                expected
            );
        }

        // early and late elements get the same share
        let first_half: usize = hits[..N / 2].iter().sum();
        let second_half: usize = hits[N / 2..].iter().sum();
        let total = (TRIALS * K) as f64;
        assert!((first_half as f64 / total - 0.5).abs() < 0.02);
        assert!((second_half as f64 / total - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_reservoir_counts() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut reservoir = Reservoir::new(2);
        assert!(reservoir.is_empty());
        for x in 0..10 {
            reservoir.offer(x, &mut rng);
        }
        assert_eq!(reservoir.seen(), 10);
        assert_eq!(reservoir.len(), 2);
    }
}
