use crate::{Error, Result};
use core::fmt;

/// A prime power `base^exponent` appearing in the factorization of a number.
///
/// Within a factorization every `base` is prime, `exponent` is at least 1,
/// and factors are ordered strictly by `base`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Factor {
    pub base: u64,
    pub exponent: u32,
}

impl Factor {
    pub const fn new(base: u64, exponent: u32) -> Self {
        Self { base, exponent }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}^{}", self.base, self.exponent)
    }
}

/// Returns the prime factorization of `n` as an ordered list of [`Factor`]s.
///
/// Uses trial division: first by 2, then by every odd divisor `d` while
/// `d * d <= n`. Whatever remains above 1 afterwards is the single prime
/// factor larger than the square root of the input.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when `n < 2`.
///
/// # Example
///
/// ```
/// use primestream::{Factor, factorize};
///
/// let factors = factorize(360).unwrap();
/// assert_eq!(factors, [Factor::new(2, 3), Factor::new(3, 2), Factor::new(5, 1)]);
/// ```
pub fn factorize(mut n: u64) -> Result<Vec<Factor>> {
    if n < 2 {
        return Err(Error::InvalidArgument(n));
    }

    let mut factors = Vec::new();

    let exponent = divide_out(&mut n, 2);
    if exponent > 0 {
        factors.push(Factor::new(2, exponent));
    }

    // `d <= n / d` is `d * d <= n` without overflowing near `u64::MAX`.
    let mut d = 3_u64;
    while d <= n / d {
        let exponent = divide_out(&mut n, d);
        if exponent > 0 {
            factors.push(Factor::new(d, exponent));
        }
        d += 2;
    }

    if n > 1 {
        factors.push(Factor::new(n, 1));
    }

    Ok(factors)
}

fn divide_out(n: &mut u64, d: u64) -> u32 {
    let mut exponent = 0;
    while *n % d == 0 {
        *n /= d;
        exponent += 1;
    }
    exponent
}

/// A number together with its prime factors.
///
/// Displays as `Prime Factors of 360 = 2^3 * 3^2 * 5^1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Factorization {
    number: u64,
    factors: Vec<Factor>,
}

impl Factorization {
    /// Factorizes `number`.
    ///
    /// # Errors
    ///
    /// See [`factorize`].
    pub fn new(number: u64) -> Result<Self> {
        Ok(Self {
            number,
            factors: factorize(number)?,
        })
    }

    pub const fn number(&self) -> u64 {
        self.number
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// Multiplies the factors back together.
    ///
    /// Returns `None` if the product does not fit in a `u64`, which cannot
    /// happen for a factorization produced by [`factorize`].
    pub fn product(&self) -> Option<u64> {
        self.factors.iter().try_fold(1_u64, |acc, factor| {
            factor
                .base
                .checked_pow(factor.exponent)
                .and_then(|power| acc.checked_mul(power))
        })
    }
}

impl fmt::Display for Factorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prime Factors of {} = ", self.number)?;
        for (i, factor) in self.factors.iter().enumerate() {
            if i > 0 {
                f.write_str(" * ")?;
            }
            write!(f, "{factor}")?;
        }
        Ok(())
    }
}
