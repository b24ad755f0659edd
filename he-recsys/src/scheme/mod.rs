//! The two homomorphic backends behind one interface.
//!
//! Aggregation and scoring are written once against [`HomomorphicScheme`];
//! only encoding, scalar handling and the reciprocal differ per backend.

pub mod bfv;
pub mod ckks;

use std::fmt;
use std::sync::Arc;

use crate::errors::HeRecError;
use crate::params::{EncryptionParams, Scheme};
use crate::ring::Poly;
use crate::rlwe::{Ciphertext, EvaluationKeys};

pub use bfv::ExactIntegerScheme;
pub use ckks::ApproxRealScheme;

/// Plaintext multiplier for [`HomomorphicScheme::multiply_scalar`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Scalar {
    Real(f64),
    /// Residue modulo the plaintext modulus.
    Modular(u64),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Real(v) => write!(f, "{}", v),
            Scalar::Modular(v) => write!(f, "{} (mod t)", v),
        }
    }
}

pub trait HomomorphicScheme: fmt::Debug + Send + Sync {
    fn scheme(&self) -> Scheme;

    fn params(&self) -> &EncryptionParams;

    /// Scale carried by freshly encrypted plaintexts.
    fn fresh_scale(&self) -> f64;

    /// Packs `values` into the leading coefficients of a plaintext polynomial.
    fn encode(&self, values: &[f64]) -> Result<Poly, HeRecError>;

    /// Reads the first `len` slots back out of `noisy = c0 + c1*s mod Q_level`.
    fn decode(&self, noisy: &Poly, ct: &Ciphertext, len: usize) -> Result<Vec<f64>, HeRecError>;

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext, HeRecError>;

    fn multiply_scalar(&self, ct: &Ciphertext, scalar: Scalar) -> Result<Ciphertext, HeRecError>;

    /// Ciphertext product, relinearized back to two components.
    fn multiply(
        &self,
        keys: &EvaluationKeys,
        a: &Ciphertext,
        b: &Ciphertext,
    ) -> Result<Ciphertext, HeRecError>;

    /// Multiplier standing in for division by `n`.
    fn reciprocal(&self, n: u64) -> Result<Scalar, HeRecError>;
}

/// Backend for the scheme named in `params`.
pub fn scheme_for(params: Arc<EncryptionParams>) -> Result<Arc<dyn HomomorphicScheme>, HeRecError> {
    let scheme: Arc<dyn HomomorphicScheme> = match params.scheme {
        Scheme::ApproxReal => Arc::new(ApproxRealScheme::new(params)?),
        Scheme::ExactInteger => Arc::new(ExactIntegerScheme::new(params)?),
    };
    Ok(scheme)
}

pub(crate) fn check_fits(params: &EncryptionParams, len: usize) -> Result<(), HeRecError> {
    if len > params.degree {
        return Err(HeRecError::DimensionMismatch(format!(
            "vector of length {} does not fit a ring of degree {}",
            len, params.degree
        )));
    }
    Ok(())
}
