//! Exact arithmetic modulo a prime plaintext modulus `t`.
//!
//! Plaintexts are carried in the top bits of the ciphertext modulus as
//! `floor(Q/t) * m`; there is no rescaling and every ciphertext stays at the
//! top level.

use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::errors::HeRecError;
use crate::params::{EncryptionParams, Scheme};
use crate::ring::{Poly, Ring};
use crate::rlwe::keyswitch::relinearize;
use crate::rlwe::{Ciphertext, EvaluationKeys};

use super::{HomomorphicScheme, Scalar, check_fits};

#[derive(Debug)]
pub struct ExactIntegerScheme {
    params: Arc<EncryptionParams>,
    ring: Ring,
    delta: BigInt,
}

impl ExactIntegerScheme {
    pub fn new(params: Arc<EncryptionParams>) -> Result<Self, HeRecError> {
        if params.scheme != Scheme::ExactInteger {
            return Err(HeRecError::InvalidParameters(format!(
                "{} parameters given to the EXACT_INTEGER backend",
                params.scheme
            )));
        }
        let ring = params.plaintext_ring()?;
        let delta = params.data_modulus() / BigInt::from(ring.modulus());

        Ok(ExactIntegerScheme {
            params,
            ring,
            delta,
        })
    }

    pub fn plaintext_modulus(&self) -> u64 {
        self.ring.modulus()
    }

    fn check_level(&self, ct: &Ciphertext) -> Result<(), HeRecError> {
        if ct.level != self.params.max_level() {
            return Err(HeRecError::InternalError(format!(
                "EXACT_INTEGER ciphertext at level {}",
                ct.level
            )));
        }
        Ok(())
    }

    /// Residue of a scalar modulo `t`; real scalars must be integral.
    fn residue(&self, scalar: Scalar) -> Result<u64, HeRecError> {
        match scalar {
            Scalar::Modular(v) => Ok(v % self.ring.modulus()),
            Scalar::Real(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                Ok(self.ring.normalize(v as i64))
            }
            Scalar::Real(v) => Err(HeRecError::ValueOutOfRange(format!(
                "{} is not an integer scalar",
                v
            ))),
        }
    }
}

impl HomomorphicScheme for ExactIntegerScheme {
    fn scheme(&self) -> Scheme {
        Scheme::ExactInteger
    }

    fn params(&self) -> &EncryptionParams {
        &self.params
    }

    fn fresh_scale(&self) -> f64 {
        1.0
    }

    /// Entries must already be integers in `[0, t)`. Negative values are the
    /// caller's to wrap (see [`crate::codec::quantize`]).
    fn encode(&self, values: &[f64]) -> Result<Poly, HeRecError> {
        check_fits(&self.params, values.len())?;
        let t = self.ring.modulus();

        let mut plain = Poly::zero(self.params.degree);
        for (slot, &v) in plain.coeffs.iter_mut().zip(values.iter()) {
            if !v.is_finite() || v.fract() != 0.0 || v < 0.0 || v >= t as f64 {
                return Err(HeRecError::ValueOutOfRange(format!(
                    "{} is not an integer in [0, {})",
                    v, t
                )));
            }
            *slot = &self.delta * BigInt::from(v as u64);
        }

        Ok(plain)
    }

    fn decode(&self, noisy: &Poly, ct: &Ciphertext, len: usize) -> Result<Vec<f64>, HeRecError> {
        self.check_level(ct)?;
        let t = BigInt::from(self.ring.modulus());
        let scaled = noisy
            .reduce(self.params.data_modulus())
            .scale_round(&t, self.params.data_modulus())
            .reduce(&t);

        scaled.coeffs[..len.min(scaled.degree())]
            .iter()
            .map(|c| {
                c.to_u64()
                    .map(|x| x as f64)
                    .ok_or_else(|| HeRecError::InternalError("residue overflow".to_string()))
            })
            .collect()
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext, HeRecError> {
        self.check_level(a)?;
        self.check_level(b)?;
        let q = self.params.data_modulus();

        Ok(Ciphertext {
            c0: a.c0.add(&b.c0).reduce(q),
            c1: a.c1.add(&b.c1).reduce(q),
            level: a.level,
            scale: 1.0,
        })
    }

    /// Multiplies by the centred representative of the scalar, which keeps
    /// the noise growth at most `t/2`.
    fn multiply_scalar(&self, ct: &Ciphertext, scalar: Scalar) -> Result<Ciphertext, HeRecError> {
        self.check_level(ct)?;
        let factor = BigInt::from(self.ring.centered(self.residue(scalar)?));
        let q = self.params.data_modulus();

        Ok(Ciphertext {
            c0: ct.c0.mul_scalar(&factor).reduce(q),
            c1: ct.c1.mul_scalar(&factor).reduce(q),
            level: ct.level,
            scale: 1.0,
        })
    }

    /// Tensors the centred operands over the integers and scales every
    /// component by `t/Q` with rounding.
    fn multiply(
        &self,
        keys: &EvaluationKeys,
        a: &Ciphertext,
        b: &Ciphertext,
    ) -> Result<Ciphertext, HeRecError> {
        self.check_level(a)?;
        self.check_level(b)?;
        let q = self.params.data_modulus();
        let t = BigInt::from(self.ring.modulus());

        let (a0, a1) = (a.c0.centered(q), a.c1.centered(q));
        let (b0, b1) = (b.c0.centered(q), b.c1.centered(q));
        let tensor = |p: Poly| p.scale_round(&t, q).reduce(q);

        let d0 = tensor(a0.mul(&b0));
        let d1 = tensor(a0.mul(&b1).add(&a1.mul(&b0)));
        let d2 = tensor(a1.mul(&b1));

        relinearize(&self.params, keys, &d0, &d1, &d2, a.level, 1.0)
    }

    /// `n^(t-2) mod t`, the inverse of `n` in the plaintext field.
    fn reciprocal(&self, n: u64) -> Result<Scalar, HeRecError> {
        Ok(Scalar::Modular(self.ring.inv(n)?))
    }
}
