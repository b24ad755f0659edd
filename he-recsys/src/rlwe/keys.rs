//! Key material. The secret key stays with the context owner; everything in
//! [`EvaluationKeys`] is public and shared with evaluators.

use std::collections::HashMap;
use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::ToPrimitive;
use rayon::prelude::*;

use crate::errors::HeRecError;
use crate::params::EncryptionParams;
use crate::ring::Poly;
use crate::ring::Ring;
use crate::ring::sampling::{sample_error, sample_ternary, sample_uniform};

/// Galois element of the automorphism `X -> X^(2N-1) = X^-1`, which reverses
/// the coefficient order of a packed vector (up to sign).
pub fn reversal_galois_element(degree: usize) -> usize {
    2 * degree - 1
}

#[derive(Clone)]
pub struct SecretKey {
    pub(crate) poly: Poly,
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey").field("poly", &"<redacted>").finish()
    }
}

/// `(b, a) = (-a*s + e, a) mod Q`.
#[derive(Debug, Clone)]
pub struct PublicKey {
    pub b: Poly,
    pub a: Poly,
}

/// Hybrid key-switching key from some `s'` to `s`: one `(b_i, a_i)` per data
/// prime, with `b_i = -a_i*s + e_i + P*g_i*s' mod Q*P`.
#[derive(Debug, Clone)]
pub struct KeySwitchKey {
    pub components: Vec<(Poly, Poly)>,
}

#[derive(Debug, Clone, Default)]
pub struct GaloisKeys {
    keys: HashMap<usize, KeySwitchKey>,
}

impl GaloisKeys {
    pub fn get(&self, galois_elt: usize) -> Result<&KeySwitchKey, HeRecError> {
        self.keys.get(&galois_elt).ok_or_else(|| {
            HeRecError::InternalError(format!("No Galois key for element {}", galois_elt))
        })
    }

    pub fn elements(&self) -> Vec<usize> {
        let mut elts: Vec<usize> = self.keys.keys().copied().collect();
        elts.sort_unstable();
        elts
    }
}

#[derive(Debug, Clone)]
pub struct EvaluationKeys {
    pub public_key: PublicKey,
    pub relin_key: KeySwitchKey,
    pub galois_keys: GaloisKeys,
}

impl SecretKey {
    pub fn generate(params: &EncryptionParams) -> Self {
        SecretKey {
            poly: sample_ternary(params.degree),
        }
    }

    pub fn public_key(&self, params: &EncryptionParams) -> Result<PublicKey, HeRecError> {
        let q = params.data_modulus();
        let a = sample_uniform(params.degree, q);
        let e = sample_error(params.degree)?;
        let b = e.sub(&a.mul(&self.poly)).reduce(q);

        Ok(PublicKey { b, a })
    }

    /// Key switching `target -> self`.
    pub fn switch_key_for(
        &self,
        params: &EncryptionParams,
        target: &Poly,
    ) -> Result<KeySwitchKey, HeRecError> {
        let qp = params.key_modulus();
        let q = params.data_modulus();
        let special = params.special_modulus();

        let gadget = params
            .data_primes
            .iter()
            .map(|&prime| {
                let p = BigInt::from(prime);
                let cofactor = q / &p;
                let residue = cofactor.mod_floor(&p).to_u64().ok_or_else(|| {
                    HeRecError::InternalError("CRT cofactor residue overflow".to_string())
                })?;
                let inv = Ring::try_with(prime)?.inv(residue)?;
                Ok(cofactor * BigInt::from(inv))
            })
            .collect::<Result<Vec<BigInt>, HeRecError>>()?;

        let components = gadget
            .par_iter()
            .map(|g| {
                let a = sample_uniform(params.degree, qp);
                let e = sample_error(params.degree)?;
                let b = e
                    .sub(&a.mul(&self.poly))
                    .add(&target.mul_scalar(&(&special * g)))
                    .reduce(qp);
                Ok((b, a))
            })
            .collect::<Result<Vec<_>, HeRecError>>()?;

        Ok(KeySwitchKey { components })
    }

    /// Relinearization key, switching `s^2 -> s`.
    pub fn relin_key(&self, params: &EncryptionParams) -> Result<KeySwitchKey, HeRecError> {
        let squared = self.poly.mul(&self.poly);
        self.switch_key_for(params, &squared)
    }

    /// Galois keys for the requested automorphisms.
    pub fn galois_keys(
        &self,
        params: &EncryptionParams,
        galois_elts: &[usize],
    ) -> Result<GaloisKeys, HeRecError> {
        let mut keys = HashMap::with_capacity(galois_elts.len());
        for &elt in galois_elts {
            let rotated = self.poly.automorphism(elt);
            keys.insert(elt, self.switch_key_for(params, &rotated)?);
        }
        Ok(GaloisKeys { keys })
    }
}

/// Fresh secret key plus the full public evaluation key set. The reversal
/// Galois key is always generated: every dot product needs it.
pub fn generate_keys(params: &EncryptionParams) -> Result<(SecretKey, EvaluationKeys), HeRecError> {
    let secret_key = SecretKey::generate(params);
    let public_key = secret_key.public_key(params)?;
    let relin_key = secret_key.relin_key(params)?;
    let galois_keys =
        secret_key.galois_keys(params, &[reversal_galois_element(params.degree)])?;

    Ok((
        secret_key,
        EvaluationKeys {
            public_key,
            relin_key,
            galois_keys,
        },
    ))
}
