//! Random ring elements for key generation and encryption.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};

use crate::errors::HeRecError;

use super::poly::Poly;

/// Standard deviation of the rounded Gaussian error distribution.
pub const ERROR_STD_DEV: f64 = 3.2;

/// Uniform coefficients in `{-1, 0, 1}`.
pub fn sample_ternary(n: usize) -> Poly {
    let mut rng = rand::rng();
    let coeffs: Vec<i64> = (0..n).map(|_| rng.random_range(-1i64..=1)).collect();
    Poly::from_i64(&coeffs)
}

/// Rounded Gaussian coefficients with standard deviation [`ERROR_STD_DEV`].
pub fn sample_error(n: usize) -> Result<Poly, HeRecError> {
    let normal = Normal::new(0.0, ERROR_STD_DEV)
        .map_err(|e| HeRecError::InternalError(format!("Error distribution: {}", e)))?;
    let mut rng = rand::rng();
    let coeffs: Vec<i64> = (0..n)
        .map(|_| normal.sample(&mut rng).round() as i64)
        .collect();
    Ok(Poly::from_i64(&coeffs))
}

/// Coefficients uniform in `[0, modulus)`.
///
/// Draws 128 bits beyond the modulus size before reducing, so the bias of
/// the reduction is negligible.
pub fn sample_uniform(n: usize, modulus: &BigInt) -> Poly {
    let mut rng = rand::rng();
    let byte_len = (modulus.bits() as usize).div_ceil(8) + 16;
    let mut buf = vec![0u8; byte_len];

    let coeffs = (0..n)
        .map(|_| {
            rng.fill_bytes(&mut buf);
            BigInt::from(BigUint::from_bytes_le(&buf)).mod_floor(modulus)
        })
        .collect();

    Poly { coeffs }
}
