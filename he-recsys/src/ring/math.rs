//! Implementation of prime-field ops using modular arithmetic.

use crate::errors::HeRecError;

use primality_test::is_prime;

use serde::{Deserialize, Serialize};

/// Represents the prime field Z_p using modular arithmetic.
///
/// Used for the exact scheme's plaintext modulus and for the NTT primes.
/// Elements are kept as canonical representatives in `[0, modulus)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub modulus: u64,
}

impl Ring {
    /// Create a new Ring with the given modulus.
    ///
    /// The modulus must be a prime below 2^63.
    pub fn try_with(modulus: u64) -> Result<Self, HeRecError> {
        if modulus < 2 || modulus >= 1 << 63 {
            return Err(HeRecError::InvalidParameters(format!(
                "Modulus must be a prime in [2, 2^63), got {}",
                modulus
            )));
        }

        if !is_prime(modulus) {
            return Err(HeRecError::InvalidParameters(format!(
                "Modulus must be prime, got {}",
                modulus
            )));
        }

        Ok(Ring { modulus })
    }

    /// Returns the modulus of the ring.
    ///
    /// # Example
    ///
    /// ```
    /// # use he_recsys::ring::Ring;
    /// let ring = Ring::try_with(13).unwrap();
    /// assert_eq!(ring.modulus(), 13);
    /// ```
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Normalizes a signed value to be within the range `[0, modulus - 1]`.
    ///
    /// # Example
    ///
    /// ```
    /// # use he_recsys::ring::Ring;
    /// let ring = Ring::try_with(11).unwrap();
    /// assert_eq!(ring.normalize(15), 4);
    /// assert_eq!(ring.normalize(-3), 8);
    /// assert_eq!(ring.normalize(11), 0);
    /// ```
    pub fn normalize(&self, value: i64) -> u64 {
        (value as i128).rem_euclid(self.modulus as i128) as u64
    }

    /// Maps a canonical representative to the symmetric range `(-modulus/2, modulus/2]`.
    ///
    /// # Example
    ///
    /// ```
    /// # use he_recsys::ring::Ring;
    /// let ring = Ring::try_with(11).unwrap();
    /// assert_eq!(ring.centered(3), 3);
    /// assert_eq!(ring.centered(10), -1);
    /// ```
    pub fn centered(&self, value: u64) -> i64 {
        let value = value % self.modulus;
        if value > self.modulus / 2 {
            (value as i128 - self.modulus as i128) as i64
        } else {
            value as i64
        }
    }

    /// Computes `(a + b) mod modulus`.
    pub fn add(&self, a: u64, b: u64) -> u64 {
        ((a as u128 + b as u128) % self.modulus as u128) as u64
    }

    /// Computes `(a - b) mod modulus`.
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        let m = self.modulus as u128;
        ((a as u128 % m + m - b as u128 % m) % m) as u64
    }

    /// Computes `(a * b) mod modulus`.
    ///
    /// Uses `u128` internally to prevent overflow before the modulo operation.
    ///
    /// # Example
    ///
    /// ```
    /// # use he_recsys::ring::Ring;
    /// let ring = Ring::try_with(13).unwrap();
    /// assert_eq!(ring.mul(7, 5), 9); // 35 mod 13
    /// ```
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        ((a as u128 * b as u128) % self.modulus as u128) as u64
    }

    /// Computes `base^exp mod modulus` by square-and-multiply.
    pub fn pow(&self, base: u64, mut exp: u64) -> u64 {
        let mut result = 1 % self.modulus;
        let mut base = base % self.modulus;
        while exp > 0 {
            if exp & 1 == 1 {
                result = self.mul(result, base);
            }
            base = self.mul(base, base);
            exp >>= 1;
        }
        result
    }

    /// Computes the modular multiplicative inverse `a^-1 mod modulus`.
    ///
    /// The modulus is prime, so every nonzero element is invertible and
    /// Fermat's little theorem gives the inverse as `a^(modulus - 2)`.
    ///
    /// # Errors
    ///
    /// Returns `HeRecError::NoInverse` if `a` is a multiple of the modulus.
    ///
    /// # Example
    ///
    /// ```
    /// # use he_recsys::ring::Ring;
    /// let ring = Ring::try_with(13).unwrap();
    /// assert_eq!(ring.inv(5).unwrap(), 8); // 5 * 8 = 40 = 1 mod 13
    /// assert!(ring.inv(26).is_err());
    /// ```
    pub fn inv(&self, a: u64) -> Result<u64, HeRecError> {
        let a_norm = a % self.modulus;
        if a_norm == 0 {
            return Err(HeRecError::NoInverse(format!(
                "{} is divisible by the modulus {}",
                a, self.modulus
            )));
        }

        Ok(self.pow(a_norm, self.modulus - 2))
    }

    /// Finds a primitive `order`-th root of unity, `order` being a power of two
    /// that divides `modulus - 1`.
    pub fn primitive_root(&self, order: u64) -> Result<u64, HeRecError> {
        if order < 2 || !order.is_power_of_two() || (self.modulus - 1) % order != 0 {
            return Err(HeRecError::InvalidParameters(format!(
                "No root of unity of order {} modulo {}",
                order, self.modulus
            )));
        }

        let cofactor = (self.modulus - 1) / order;
        for candidate in 2..self.modulus {
            let root = self.pow(candidate, cofactor);
            // Power-of-two order: primitive iff root^(order/2) == -1.
            if self.pow(root, order / 2) == self.modulus - 1 {
                return Ok(root);
            }
        }

        Err(HeRecError::InternalError(format!(
            "Root of unity of order {} not found modulo {}",
            order, self.modulus
        )))
    }
}
