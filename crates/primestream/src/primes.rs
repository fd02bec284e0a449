use crate::{Error, Result};
use core::iter::FusedIterator;

/// The smallest prime count a search accepts.
///
/// The search is seeded with the three constants `2, 3, 5`, so fewer than
/// three primes are rejected rather than truncated.
pub const MIN_COUNT: usize = 3;

const SEED: [u64; MIN_COUNT] = [2, 3, 5];
const FIRST_CANDIDATE: u64 = 7;

/// An unbounded iterator over the primes in increasing order.
///
/// Each candidate is trial-divided by the primes discovered so far while
/// `p * p <= candidate`. Every prime below the square root of a candidate is
/// already in the discovered set, since the set grows in order. Only odd
/// candidates from 7 upward are considered and multiples of 5 are skipped
/// without running the division loop.
///
/// The iterator owns its discovered set; nothing else reads or mutates it.
///
/// ```
/// use primestream::FirstPrimes;
///
/// let primes: Vec<u64> = FirstPrimes::new().take(10).collect();
/// assert_eq!(primes, [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
/// ```
#[derive(Clone, Debug)]
pub struct FirstPrimes {
    discovered: Vec<u64>,
    candidate: u64,
}

impl FirstPrimes {
    pub const fn new() -> Self {
        Self {
            discovered: Vec::new(),
            candidate: FIRST_CANDIDATE,
        }
    }

    /// Creates a search that expects to discover about `count` primes.
    pub fn with_capacity(count: usize) -> Self {
        Self {
            discovered: Vec::with_capacity(count),
            candidate: FIRST_CANDIDATE,
        }
    }

    /// Primes found so far, in increasing order.
    pub fn discovered(&self) -> &[u64] {
        &self.discovered
    }

    fn is_prime(&self, candidate: u64) -> bool {
        self.discovered
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
    }
}

impl Default for FirstPrimes {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for FirstPrimes {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if let Some(&seed) = SEED.get(self.discovered.len()) {
            self.discovered.push(seed);
            return Some(seed);
        }

        loop {
            let candidate = self.candidate;
            self.candidate += 2;

            if candidate % 5 == 0 {
                continue;
            }

            if self.is_prime(candidate) {
                self.discovered.push(candidate);
                return Some(candidate);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl FusedIterator for FirstPrimes {}

/// Collects the first `count` primes.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when `count` is below [`MIN_COUNT`].
pub fn first_primes(count: usize) -> Result<Vec<u64>> {
    if count < MIN_COUNT {
        return Err(Error::InvalidArgument(count as u64));
    }
    Ok(FirstPrimes::with_capacity(count).take(count).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_primes(limit: u64) -> Vec<u64> {
        (2..limit)
            .filter(|&n| (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0))
            .collect()
    }

    #[test]
    fn first_ten() {
        assert_eq!(
            first_primes(10).unwrap(),
            [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]
        );
    }

    #[test]
    fn seeds_come_first() {
        assert_eq!(first_primes(3).unwrap(), SEED);
        assert_eq!(first_primes(4).unwrap(), [2, 3, 5, 7]);
    }

    #[test]
    fn rejects_counts_below_three() {
        for count in 0..MIN_COUNT {
            assert_eq!(
                first_primes(count),
                Err(Error::InvalidArgument(count as u64))
            );
        }
    }

    #[test]
    fn matches_naive_sieve() {
        let expected = naive_primes(20_000);
        let actual: Vec<u64> = FirstPrimes::new().take(expected.len()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn ten_thousandth_prime() {
        let primes = first_primes(10_000).unwrap();
        assert_eq!(primes.len(), 10_000);
        assert_eq!(primes.last(), Some(&104_729));
        assert!(primes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn tracks_discovered_set() {
        let mut primes = FirstPrimes::new();
        assert!(primes.discovered().is_empty());
        primes.by_ref().take(5).for_each(drop);
        assert_eq!(primes.discovered(), [2, 3, 5, 7, 11]);
    }

    #[test]
    fn preallocated_search_yields_same_sequence() {
        let mut primes = FirstPrimes::with_capacity(64);
        assert!(primes.discovered().is_empty());
        assert!(primes.by_ref().take(64).eq(FirstPrimes::new().take(64)));
        assert_eq!(primes.discovered().len(), 64);
    }
}
