//! Cryptographically secure random generation.
//!
//! `RandomGenerator` owns an OS-seeded ChaCha generator (`StdRng`).  The
//! handle has an explicit lifecycle: after `release` every call fails with
//! `VaultError::RandomReleased` instead of silently falling back to some
//! other source.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, RngCore, SeedableRng};

use crate::errors::{Result, VaultError};

/// A releasable handle to a cryptographically secure random source.
pub struct RandomGenerator {
    rng: Mutex<Option<StdRng>>,
}

impl RandomGenerator {
    /// Create a generator seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(Some(StdRng::from_os_rng())),
        }
    }

    /// Uniform double in `[0, 1)`.
    pub fn next_double(&self) -> Result<f64> {
        self.with_rng(|rng| rng.random::<f64>())
    }

    /// Uniform integer in `[min, max_exclusive)`.
    pub fn next_int(&self, min: i64, max_exclusive: i64) -> Result<i64> {
        if min >= max_exclusive {
            return Err(VaultError::InvalidArgument(format!(
                "empty range: min {min} must be less than max {max_exclusive}"
            )));
        }
        self.with_rng(|rng| rng.random_range(min..max_exclusive))
    }

    /// A fresh vector of `len` uniformly random bytes.
    pub fn next_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        self.fill(&mut bytes)?;
        Ok(bytes)
    }

    /// Overwrite `dest` with uniformly random bytes.
    pub fn fill(&self, dest: &mut [u8]) -> Result<()> {
        self.with_rng(|rng| rng.fill_bytes(dest))
    }

    /// Pick one element uniformly from `items`.
    pub fn pick<T: Clone>(&self, items: &[T]) -> Result<T> {
        self.with_rng(|rng| items.choose(rng).cloned())?
            .ok_or_else(|| VaultError::InvalidArgument("cannot pick from an empty slice".into()))
    }

    /// Build a string of `len` characters drawn only from `alphabet`.
    pub fn next_string(&self, alphabet: &str, len: usize) -> Result<String> {
        let chars: Vec<char> = alphabet.chars().collect();
        if chars.is_empty() {
            return Err(VaultError::InvalidArgument("alphabet cannot be empty".into()));
        }
        self.with_rng(|rng| {
            (0..len)
                .map(|_| chars[rng.random_range(0..chars.len())])
                .collect()
        })
    }

    /// Return a shuffled copy of `items`; the input is left untouched.
    ///
    /// For more than one element the copy never keeps every element in
    /// its original position.
    pub fn shuffle<T: Clone>(&self, items: &[T]) -> Result<Vec<T>> {
        let mut order: Vec<usize> = (0..items.len()).collect();
        self.with_rng(|rng| loop {
            order.shuffle(rng);
            if items.len() < 2 || order.iter().enumerate().any(|(i, &j)| i != j) {
                break;
            }
        })?;
        Ok(order.into_iter().map(|i| items[i].clone()).collect())
    }

    /// Release the underlying random source.  Idempotent.
    pub fn release(&self) {
        self.lock().take();
    }

    /// Returns `true` once `release` has been called.
    pub fn is_released(&self) -> bool {
        self.lock().is_none()
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> Result<T> {
        let mut guard = self.lock();
        let rng = guard.as_mut().ok_or(VaultError::RandomReleased)?;
        Ok(f(rng))
    }

    // A panic while holding the lock cannot leave StdRng in a torn state.
    fn lock(&self) -> MutexGuard<'_, Option<StdRng>> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RandomGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomGenerator")
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_double_is_in_unit_interval() {
        let rng = RandomGenerator::new();
        for _ in 0..1_000 {
            let d = rng.next_double().unwrap();
            assert!((0.0..1.0).contains(&d));
        }
    }

    #[test]
    fn next_int_respects_bounds() {
        let rng = RandomGenerator::new();
        for _ in 0..1_000 {
            let n = rng.next_int(-5, 5).unwrap();
            assert!((-5..5).contains(&n));
        }
    }

    #[test]
    fn next_int_rejects_empty_range() {
        let rng = RandomGenerator::new();
        assert!(matches!(
            rng.next_int(3, 3),
            Err(VaultError::InvalidArgument(_))
        ));
    }

    #[test]
    fn next_bytes_has_requested_length() {
        let rng = RandomGenerator::new();
        assert_eq!(rng.next_bytes(0).unwrap().len(), 0);
        assert_eq!(rng.next_bytes(37).unwrap().len(), 37);
        assert_ne!(rng.next_bytes(32).unwrap(), rng.next_bytes(32).unwrap());
    }

    #[test]
    fn pick_returns_member() {
        let rng = RandomGenerator::new();
        let items = ["a", "b", "c"];
        for _ in 0..100 {
            assert!(items.contains(&rng.pick(&items).unwrap()));
        }
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_err());
    }

    #[test]
    fn next_string_uses_only_alphabet() {
        let rng = RandomGenerator::new();
        let s = rng.next_string("xyz", 200).unwrap();
        assert_eq!(s.chars().count(), 200);
        assert!(s.chars().all(|c| "xyz".contains(c)));
        assert!(rng.next_string("", 4).is_err());
    }

    #[test]
    fn shuffle_preserves_elements_and_input() {
        let rng = RandomGenerator::new();
        let input: Vec<u32> = (0..100).collect();
        let shuffled = rng.shuffle(&input).unwrap();

        assert_eq!(input, (0..100).collect::<Vec<_>>());
        assert_ne!(shuffled, input);

        let mut sorted = shuffled.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, input);
    }

    #[test]
    fn shuffle_of_two_always_swaps() {
        let rng = RandomGenerator::new();
        for _ in 0..200 {
            assert_eq!(rng.shuffle(&[1, 2]).unwrap(), vec![2, 1]);
        }
    }

    #[test]
    fn shuffle_of_three_never_returns_input_order() {
        let rng = RandomGenerator::new();
        let input = ['a', 'b', 'c'];
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let shuffled = rng.shuffle(&input).unwrap();
            assert_ne!(shuffled, input);
            seen.insert(shuffled);
        }
        // Every other ordering of three elements shows up.
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn shuffle_handles_short_and_repeated_inputs() {
        let rng = RandomGenerator::new();
        assert!(rng.shuffle::<u8>(&[]).unwrap().is_empty());
        assert_eq!(rng.shuffle(&[9]).unwrap(), vec![9]);
        assert_eq!(rng.shuffle(&[7, 7]).unwrap(), vec![7, 7]);
    }

    #[test]
    fn released_generator_fails_every_call() {
        let rng = RandomGenerator::new();
        rng.release();
        assert!(rng.is_released());

        assert!(matches!(rng.next_double(), Err(VaultError::RandomReleased)));
        assert!(matches!(rng.next_int(0, 2), Err(VaultError::RandomReleased)));
        assert!(matches!(rng.next_bytes(4), Err(VaultError::RandomReleased)));
        assert!(matches!(rng.pick(&[1, 2]), Err(VaultError::RandomReleased)));
        assert!(matches!(rng.shuffle(&[1, 2]), Err(VaultError::RandomReleased)));

        // Releasing twice is harmless.
        rng.release();
    }
}
