//! Elements of the negacyclic ring `Z[X]/(X^N + 1)` with arbitrary-precision
//! coefficients.
//!
//! Arithmetic here is over the integers; callers reduce modulo the
//! ciphertext modulus of the level they work at. Keeping the exact integer
//! product available is what the exact scheme's tensoring needs.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};

use super::ntt;

/// Degrees at or below this use the quadratic convolution.
pub const SCHOOLBOOK_MAX_DEGREE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    pub coeffs: Vec<BigInt>,
}

impl Poly {
    pub fn zero(n: usize) -> Self {
        Poly {
            coeffs: vec![BigInt::zero(); n],
        }
    }

    pub fn from_i64(coeffs: &[i64]) -> Self {
        Poly {
            coeffs: coeffs.iter().map(|&c| BigInt::from(c)).collect(),
        }
    }

    /// Ring degree `N`.
    pub fn degree(&self) -> usize {
        self.coeffs.len()
    }

    pub fn add(&self, other: &Poly) -> Poly {
        debug_assert_eq!(self.degree(), other.degree());
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .zip(other.coeffs.iter())
                .map(|(a, b)| a + b)
                .collect(),
        }
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        debug_assert_eq!(self.degree(), other.degree());
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .zip(other.coeffs.iter())
                .map(|(a, b)| a - b)
                .collect(),
        }
    }

    pub fn neg(&self) -> Poly {
        Poly {
            coeffs: self.coeffs.iter().map(|c| -c).collect(),
        }
    }

    pub fn mul_scalar(&self, scalar: &BigInt) -> Poly {
        Poly {
            coeffs: self.coeffs.iter().map(|c| c * scalar).collect(),
        }
    }

    /// Exact product in `Z[X]/(X^N + 1)`.
    pub fn mul(&self, other: &Poly) -> Poly {
        debug_assert_eq!(self.degree(), other.degree());
        if self.degree() > SCHOOLBOOK_MAX_DEGREE {
            if let Some(product) = ntt::negacyclic_product(self, other) {
                return product;
            }
        }
        self.mul_schoolbook(other)
    }

    /// Quadratic negacyclic convolution: `X^N = -1` folds the upper half back
    /// with a sign flip.
    pub fn mul_schoolbook(&self, other: &Poly) -> Poly {
        let n = self.degree();
        let mut result = vec![BigInt::zero(); n];

        for (i, a) in self.coeffs.iter().enumerate() {
            if a.is_zero() {
                continue;
            }
            for (j, b) in other.coeffs.iter().enumerate() {
                if b.is_zero() {
                    continue;
                }
                let term = a * b;
                let k = i + j;
                if k < n {
                    result[k] += term;
                } else {
                    result[k - n] -= term;
                }
            }
        }

        Poly { coeffs: result }
    }

    /// Product reduced into `[0, modulus)`.
    pub fn mul_mod(&self, other: &Poly, modulus: &BigInt) -> Poly {
        self.mul(other).reduce(modulus)
    }

    /// Reduces every coefficient into `[0, modulus)`.
    pub fn reduce(&self, modulus: &BigInt) -> Poly {
        Poly {
            coeffs: self.coeffs.iter().map(|c| c.mod_floor(modulus)).collect(),
        }
    }

    /// Reduces every coefficient into the symmetric range `(-modulus/2, modulus/2]`.
    pub fn centered(&self, modulus: &BigInt) -> Poly {
        let half: BigInt = modulus >> 1u32;
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .map(|c| {
                    let r = c.mod_floor(modulus);
                    if r > half { r - modulus } else { r }
                })
                .collect(),
        }
    }

    /// Rounded division `floor((2c + d) / 2d)` of every coefficient by a
    /// positive divisor `d` (halves round up).
    pub fn div_round(&self, divisor: &BigInt) -> Poly {
        let two_d: BigInt = divisor << 1u32;
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .map(|c| ((c << 1u32) + divisor).div_floor(&two_d))
                .collect(),
        }
    }

    /// `round(c * numerator / denominator)` for every coefficient.
    pub fn scale_round(&self, numerator: &BigInt, denominator: &BigInt) -> Poly {
        self.mul_scalar(numerator).div_round(denominator)
    }

    /// Applies the ring automorphism `X -> X^galois_elt` (`galois_elt` odd).
    pub fn automorphism(&self, galois_elt: usize) -> Poly {
        let n = self.degree();
        let two_n = 2 * n;
        let mut result = vec![BigInt::zero(); n];

        for (i, c) in self.coeffs.iter().enumerate() {
            let e = (i * galois_elt) % two_n;
            if e < n {
                result[e] = c.clone();
            } else {
                result[e - n] = -c;
            }
        }

        Poly { coeffs: result }
    }

    /// Largest absolute coefficient.
    pub fn max_abs(&self) -> BigInt {
        self.coeffs
            .iter()
            .map(|c| c.abs())
            .max()
            .unwrap_or_else(BigInt::zero)
    }
}
