//! Approximate arithmetic over the reals with per-level rescaling.

use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive};

use crate::errors::HeRecError;
use crate::params::{EncryptionParams, Scheme};
use crate::ring::Poly;
use crate::rlwe::keyswitch::relinearize;
use crate::rlwe::{Ciphertext, EvaluationKeys};

use super::{HomomorphicScheme, Scalar, check_fits};

/// Relative tolerance when comparing operand scales.
const SCALE_TOLERANCE: f64 = 1e-9;
/// Bits a rescaled product keeps free below the next level's modulus.
const SCALE_HEADROOM_BITS: f64 = 4.0;

#[derive(Debug)]
pub struct ApproxRealScheme {
    params: Arc<EncryptionParams>,
    scale: f64,
}

impl ApproxRealScheme {
    pub fn new(params: Arc<EncryptionParams>) -> Result<Self, HeRecError> {
        if params.scheme != Scheme::ApproxReal {
            return Err(HeRecError::InvalidParameters(format!(
                "{} parameters given to the APPROX_REAL backend",
                params.scheme
            )));
        }
        let scale = params.scale.ok_or_else(|| {
            HeRecError::InvalidParameters("APPROX_REAL requires globalScale".to_string())
        })?;

        Ok(ApproxRealScheme { params, scale })
    }

    /// Brings both operands to their common (lower) level.
    fn align(
        &self,
        a: &Ciphertext,
        b: &Ciphertext,
    ) -> Result<(Ciphertext, Ciphertext), HeRecError> {
        let level = a.level.min(b.level);
        Ok((
            a.mod_switch_to(&self.params, level)?,
            b.mod_switch_to(&self.params, level)?,
        ))
    }
}

impl HomomorphicScheme for ApproxRealScheme {
    fn scheme(&self) -> Scheme {
        Scheme::ApproxReal
    }

    fn params(&self) -> &EncryptionParams {
        &self.params
    }

    fn fresh_scale(&self) -> f64 {
        self.scale
    }

    fn encode(&self, values: &[f64]) -> Result<Poly, HeRecError> {
        check_fits(&self.params, values.len())?;
        let half: BigInt = self.params.data_modulus() >> 1u32;

        let mut plain = Poly::zero(self.params.degree);
        for (slot, &v) in plain.coeffs.iter_mut().zip(values.iter()) {
            let scaled = BigInt::from_f64((v * self.scale).round())
                .filter(|c| c.abs() < half)
                .ok_or_else(|| {
                    HeRecError::ValueOutOfRange(format!(
                        "{} cannot be encoded at scale {}",
                        v, self.scale
                    ))
                })?;
            *slot = scaled;
        }

        Ok(plain)
    }

    fn decode(&self, noisy: &Poly, ct: &Ciphertext, len: usize) -> Result<Vec<f64>, HeRecError> {
        let q = self.params.modulus_at(ct.level)?;
        let centered = noisy.centered(q);

        centered.coeffs[..len.min(centered.degree())]
            .iter()
            .map(|c| {
                c.to_f64()
                    .map(|x| x / ct.scale)
                    .ok_or_else(|| HeRecError::InternalError("coefficient overflow".to_string()))
            })
            .collect()
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext, HeRecError> {
        if (a.scale - b.scale).abs() > SCALE_TOLERANCE * a.scale.abs().max(b.scale.abs()) {
            return Err(HeRecError::ScaleMismatch(format!(
                "cannot add scales {} and {}",
                a.scale, b.scale
            )));
        }

        let (a, b) = self.align(a, b)?;
        let q = self.params.modulus_at(a.level)?;
        Ok(Ciphertext {
            c0: a.c0.add(&b.c0).reduce(q),
            c1: a.c1.add(&b.c1).reduce(q),
            level: a.level,
            scale: a.scale,
        })
    }

    /// Encodes `c` as `round(c * q_l)` and rescales by `q_l`, so the scale is
    /// unchanged and one level is consumed.
    fn multiply_scalar(&self, ct: &Ciphertext, scalar: Scalar) -> Result<Ciphertext, HeRecError> {
        let value = match scalar {
            Scalar::Real(v) if v.is_finite() => v,
            Scalar::Real(v) => {
                return Err(HeRecError::ValueOutOfRange(format!(
                    "scalar {} is not finite",
                    v
                )));
            }
            Scalar::Modular(_) => {
                return Err(HeRecError::InvalidParameters(
                    "APPROX_REAL takes real scalars".to_string(),
                ));
            }
        };
        if ct.level == 0 {
            return Err(HeRecError::ModulusChainExhausted(
                "scalar multiplication needs a level to rescale into".to_string(),
            ));
        }

        let prime = self.params.data_primes[ct.level];
        let q = self.params.modulus_at(ct.level)?;
        let encoded = BigInt::from_f64((value * prime as f64).round()).ok_or_else(|| {
            HeRecError::ValueOutOfRange(format!("scalar {} cannot be encoded", value))
        })?;

        let product = Ciphertext {
            c0: ct.c0.mul_scalar(&encoded).reduce(q),
            c1: ct.c1.mul_scalar(&encoded).reduce(q),
            level: ct.level,
            scale: ct.scale,
        };
        let rescaled = product.rescale(&self.params)?;

        Ok(Ciphertext {
            scale: ct.scale,
            ..rescaled
        })
    }

    fn multiply(
        &self,
        keys: &EvaluationKeys,
        a: &Ciphertext,
        b: &Ciphertext,
    ) -> Result<Ciphertext, HeRecError> {
        let (a, b) = self.align(a, b)?;
        if a.level == 0 {
            return Err(HeRecError::ModulusChainExhausted(
                "ciphertext product needs a level to rescale into".to_string(),
            ));
        }
        let scale = a.scale * b.scale / self.params.data_primes[a.level] as f64;
        let room = self.params.modulus_at(a.level - 1)?.bits() as f64;
        if scale.log2() + SCALE_HEADROOM_BITS >= room {
            return Err(HeRecError::ScaleMismatch(format!(
                "product scale 2^{:.1} out of bounds for the {}-bit modulus at level {}",
                scale.log2(),
                room,
                a.level - 1
            )));
        }
        let q = self.params.modulus_at(a.level)?;

        let d0 = a.c0.mul_mod(&b.c0, q);
        let d1 = a.c0.mul(&b.c1).add(&a.c1.mul(&b.c0)).reduce(q);
        let d2 = a.c1.mul_mod(&b.c1, q);

        relinearize(
            &self.params,
            keys,
            &d0,
            &d1,
            &d2,
            a.level,
            a.scale * b.scale,
        )?
        .rescale(&self.params)
    }

    fn reciprocal(&self, n: u64) -> Result<Scalar, HeRecError> {
        if n == 0 {
            return Err(HeRecError::NoInverse("0 has no reciprocal".to_string()));
        }
        Ok(Scalar::Real(1.0 / n as f64))
    }
}
