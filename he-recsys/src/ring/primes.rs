//! Prime generation for the coefficient-modulus chain and for the NTT.

use crate::errors::HeRecError;

use primality_test::is_prime;

/// Smallest accepted bit size of a coefficient-modulus prime.
pub const MIN_PRIME_BITS: u32 = 20;
/// Largest accepted bit size of a coefficient-modulus prime.
pub const MAX_PRIME_BITS: u32 = 60;

/// Generates one distinct prime per entry of `bit_sizes`, each having exactly
/// that many bits.
///
/// Primes are searched downward from `2^bits - 1`, so equal bit sizes yield
/// consecutive primes just below the power of two (as close to `2^bits` as
/// possible, which keeps rescaling factors close to the nominal scale).
pub fn generate_primes(bit_sizes: &[u32]) -> Result<Vec<u64>, HeRecError> {
    let mut primes: Vec<u64> = Vec::with_capacity(bit_sizes.len());

    for &bits in bit_sizes {
        if !(MIN_PRIME_BITS..=MAX_PRIME_BITS).contains(&bits) {
            return Err(HeRecError::InvalidParameters(format!(
                "Prime bit size must be in [{}, {}], got {}",
                MIN_PRIME_BITS, MAX_PRIME_BITS, bits
            )));
        }

        let lower = 1u64 << (bits - 1);
        let mut candidate = (1u64 << bits) - 1;
        let prime = loop {
            if candidate <= lower {
                return Err(HeRecError::InvalidParameters(format!(
                    "Ran out of {}-bit primes",
                    bits
                )));
            }
            if !primes.contains(&candidate) && is_prime(candidate) {
                break candidate;
            }
            candidate -= 2;
        };

        primes.push(prime);
    }

    Ok(primes)
}

/// Generates `count` distinct primes `p ≡ 1 (mod 2n)` in `(2^61, 2^62)`,
/// largest first. Every such prime supports a negacyclic NTT of size `n`.
pub fn ntt_primes(n: usize, count: usize) -> Result<Vec<u64>, HeRecError> {
    let step = 2 * n as u64;
    let upper = 1u64 << 62;
    let lower = 1u64 << 61;

    let mut primes = Vec::with_capacity(count);
    // Largest value below 2^62 congruent to 1 mod 2n.
    let mut candidate = (upper - 1) / step * step + 1;
    if candidate >= upper {
        candidate -= step;
    }

    while primes.len() < count {
        if candidate <= lower {
            return Err(HeRecError::InternalError(format!(
                "Not enough NTT primes for degree {}",
                n
            )));
        }
        if is_prime(candidate) {
            primes.push(candidate);
        }
        candidate -= step;
    }

    Ok(primes)
}
